//! Mission-control link: SPI slave with a data-ready line.
//!
//! The host clocks a request frame in, waits for data-ready to go high, then
//! clocks the reply out. Data-ready stays low while the link is idle.

use embassy_executor::task;
use embassy_stm32::{gpio::Output, mode::Async, spi::SpiSlave};
use embassy_time::{with_timeout, Duration, Instant};

use crate::config::HOST_RESPONSE_TIMEOUT_MS;
use crate::ipc::{arm_snapshot, raise_alert, SystemAlert, ARM_PARAMS, SIGNALS};
use crate::protocol::{self, FrameError, FRAME_SIZE};

#[task]
pub async fn host_link_task(mut spi: SpiSlave<'static, Async>, mut dsr_pin: Output<'static>) {
    info!("Host link task started");

    let mut rx_buffer = [0u8; FRAME_SIZE];
    let mut tx_buffer = [0u8; FRAME_SIZE];

    dsr_pin.set_low();

    loop {
        // Phase 1: request
        if let Err(e) = spi.transfer_in_place(&mut rx_buffer).await {
            warn!("SPI receive error: {:?}", e);
            continue;
        }

        // Phase 2: build the reply
        let status = arm_snapshot(Instant::now());
        let res = ARM_PARAMS.lock(|p| {
            protocol::respond(&rx_buffer, &mut tx_buffer, &mut p.borrow_mut(), &status)
        });
        match res {
            Ok(Some(update)) => {
                debug!("ARM request: {:?}", update);
                SIGNALS.publish(&update);
            }
            Ok(None) => {}
            Err(FrameError::Idle) => {}
            Err(e) => info!("Bad request frame: {:?}", e),
        }

        // Phase 3: reply
        dsr_pin.set_high();
        let sent = with_timeout(
            Duration::from_millis(HOST_RESPONSE_TIMEOUT_MS),
            spi.transfer(&mut rx_buffer, &mut tx_buffer),
        )
        .await;
        dsr_pin.set_low();

        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("SPI reply error: {:?}", e),
            Err(_) => {
                warn!("Host did not collect reply within {} ms", HOST_RESPONSE_TIMEOUT_MS);
                raise_alert(SystemAlert::CommunicationTimeout);
            }
        }
    }
}
