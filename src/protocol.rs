//! Host link framing over the fixed-size SPI transfer.
//!
//! ```text
//! | 0xAA | 0x55 | len | seq | cmd | payload[len] | crc16 LE |  zero padding to FRAME_SIZE
//! ```
//!
//! CRC-16/CCITT-FALSE covers everything before it. Replies carry `seq + 1`;
//! error replies echo the request `seq` with cmd `0xFF` and a one-byte code.

use crc16::{State, CCITT_FALSE};

use crate::command::{ArmParams, ArmUpdate};
use crate::telemetry::ArmSnapshot;

pub const FRAME_SIZE: usize = 260;
pub const SYNC: [u8; 2] = [0xAA, 0x55];
pub const HEADER_LEN: usize = 5;
pub const CRC_LEN: usize = 2;
pub const MAX_PAYLOAD: usize = 252;

pub const CMD_HELLO: u8 = 0x00;
pub const CMD_ARM: u8 = 0x01;
pub const CMD_STATUS: u8 = 0x02;
pub const CMD_ERROR: u8 = 0xFF;

pub const HELLO_REPLY: &[u8] = b"hello!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Master clocked out zeros: nothing was sent.
    Idle,
    BadHeader([u8; 2]),
    BadLength(u8),
    Crc { calculated: u16, received: u16 },
    UnknownCommand(u8),
    /// ARM payload is not valid text.
    BadPayload,
}

impl FrameError {
    pub fn code(&self) -> u8 {
        match self {
            FrameError::Idle => 0xFF,
            FrameError::BadHeader(_) => 0x01,
            FrameError::BadLength(_) => 0x02,
            FrameError::Crc { .. } => 0x03,
            FrameError::UnknownCommand(_) => 0x04,
            FrameError::BadPayload => 0x05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub seq: u8,
    pub cmd: u8,
    pub payload: &'a [u8],
}

pub fn decode(buf: &[u8; FRAME_SIZE]) -> Result<Frame<'_>, FrameError> {
    if buf[..2] != SYNC {
        if buf[0] == 0 && buf[1] == 0 {
            return Err(FrameError::Idle);
        }
        return Err(FrameError::BadHeader([buf[0], buf[1]]));
    }

    let len = buf[2] as usize;
    if len > MAX_PAYLOAD {
        return Err(FrameError::BadLength(buf[2]));
    }

    let crc_pos = HEADER_LEN + len;
    let received = u16::from_le_bytes([buf[crc_pos], buf[crc_pos + 1]]);
    let calculated = State::<CCITT_FALSE>::calculate(&buf[..crc_pos]);
    if calculated != received {
        return Err(FrameError::Crc {
            calculated,
            received,
        });
    }

    Ok(Frame {
        seq: buf[3],
        cmd: buf[4],
        payload: &buf[HEADER_LEN..crc_pos],
    })
}

/// Write a frame into `buf`, zeroing the tail. Returns the encoded length.
/// Payloads longer than `MAX_PAYLOAD` are truncated.
pub fn encode(buf: &mut [u8; FRAME_SIZE], seq: u8, cmd: u8, payload: &[u8]) -> usize {
    let payload = &payload[..payload.len().min(MAX_PAYLOAD)];
    let crc_pos = HEADER_LEN + payload.len();

    buf[..2].copy_from_slice(&SYNC);
    buf[2] = payload.len() as u8;
    buf[3] = seq;
    buf[4] = cmd;
    buf[HEADER_LEN..crc_pos].copy_from_slice(payload);
    let crc = State::<CCITT_FALSE>::calculate(&buf[..crc_pos]);
    buf[crc_pos..crc_pos + CRC_LEN].copy_from_slice(&crc.to_le_bytes());
    buf[crc_pos + CRC_LEN..].fill(0);

    crc_pos + CRC_LEN
}

pub fn encode_error(buf: &mut [u8; FRAME_SIZE], seq: u8, err: FrameError) -> usize {
    encode(buf, seq, CMD_ERROR, &[err.code()])
}

/// Decode one request, build the reply into `tx`, and return the parameter
/// changes an ARM request produced.
pub fn respond(
    rx: &[u8; FRAME_SIZE],
    tx: &mut [u8; FRAME_SIZE],
    params: &mut ArmParams,
    status: &ArmSnapshot,
) -> Result<Option<ArmUpdate>, FrameError> {
    let res = decode(rx).and_then(|frame| {
        let seq = frame.seq.wrapping_add(1);
        match frame.cmd {
            CMD_HELLO => {
                encode(tx, seq, CMD_HELLO, HELLO_REPLY);
                Ok(None)
            }
            CMD_ARM => {
                let form =
                    core::str::from_utf8(frame.payload).map_err(|_| FrameError::BadPayload)?;
                let update = params.apply_args(form);
                encode(tx, seq, CMD_ARM, &[]);
                Ok(Some(update))
            }
            CMD_STATUS => {
                encode(tx, seq, CMD_STATUS, status.as_bytes());
                Ok(None)
            }
            other => Err(FrameError::UnknownCommand(other)),
        }
    });

    if let Err(e) = res {
        encode_error(tx, rx[3], e);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{JointStates, SensorReadings, SNAPSHOT_LEN};

    fn request(seq: u8, cmd: u8, payload: &[u8]) -> [u8; FRAME_SIZE] {
        let mut buf = [0u8; FRAME_SIZE];
        encode(&mut buf, seq, cmd, payload);
        buf
    }

    fn status() -> ArmSnapshot {
        ArmSnapshot::from_states(&JointStates::new(), &SensorReadings::default(), 7, 500)
    }

    #[test]
    fn test_hello() {
        let rx = request(9, CMD_HELLO, &[]);
        let mut tx = [0xEEu8; FRAME_SIZE];
        let mut params = ArmParams::new();
        assert_eq!(respond(&rx, &mut tx, &mut params, &status()), Ok(None));

        let reply = decode(&tx).unwrap();
        assert_eq!(reply.seq, 10);
        assert_eq!(reply.cmd, CMD_HELLO);
        assert_eq!(reply.payload, HELLO_REPLY);
        assert!(tx[HEADER_LEN + HELLO_REPLY.len() + CRC_LEN..]
            .iter()
            .all(|&b| b == 0));
    }

    #[test]
    fn test_arm_request_updates_params() {
        let rx = request(0xFF, CMD_ARM, b"RotundaTarget=900&speed=30&command=open");
        let mut tx = [0u8; FRAME_SIZE];
        let mut params = ArmParams::new();
        let update = respond(&rx, &mut tx, &mut params, &status())
            .unwrap()
            .unwrap();

        assert_eq!(update.rotunda, Some(900));
        assert_eq!(params.actuator_speed, 30);
        let reply = decode(&tx).unwrap();
        assert_eq!(reply.seq, 0);
        assert_eq!(reply.cmd, CMD_ARM);
        assert!(reply.payload.is_empty());
    }

    #[test]
    fn test_status_carries_snapshot() {
        let rx = request(1, CMD_STATUS, &[]);
        let mut tx = [0u8; FRAME_SIZE];
        respond(&rx, &mut tx, &mut ArmParams::new(), &status()).unwrap();

        let reply = decode(&tx).unwrap();
        assert_eq!(reply.payload.len(), SNAPSHOT_LEN);
        let snap: ArmSnapshot = bytemuck::pod_read_unaligned(reply.payload);
        assert_eq!(snap.boot_count, 7);
        assert_eq!(snap.uptime_ms, 500);
    }

    #[test]
    fn test_crc_error_reply_echoes_seq() {
        let mut rx = request(4, CMD_HELLO, &[]);
        rx[HEADER_LEN] ^= 0xFF;
        let mut tx = [0u8; FRAME_SIZE];
        let res = respond(&rx, &mut tx, &mut ArmParams::new(), &status());
        assert!(matches!(res, Err(FrameError::Crc { .. })));

        let reply = decode(&tx).unwrap();
        assert_eq!(reply.seq, 4);
        assert_eq!(reply.cmd, CMD_ERROR);
        assert_eq!(reply.payload, &[0x03]);
    }

    #[test]
    fn test_header_length_and_command_errors() {
        let mut zeros = [0u8; FRAME_SIZE];
        assert_eq!(decode(&zeros), Err(FrameError::Idle));
        zeros[0] = 0x12;
        assert_eq!(decode(&zeros), Err(FrameError::BadHeader([0x12, 0])));

        let mut rx = request(0, CMD_HELLO, &[]);
        rx[2] = 253;
        assert_eq!(decode(&rx), Err(FrameError::BadLength(253)));

        let rx = request(0, 0x42, &[]);
        let mut tx = [0u8; FRAME_SIZE];
        assert_eq!(
            respond(&rx, &mut tx, &mut ArmParams::new(), &status()),
            Err(FrameError::UnknownCommand(0x42))
        );
        assert_eq!(decode(&tx).unwrap().payload, &[0x04]);
    }

    #[test]
    fn test_non_utf8_arm_payload() {
        let rx = request(0, CMD_ARM, &[0xC3, 0x28]);
        let mut tx = [0u8; FRAME_SIZE];
        let mut params = ArmParams::new();
        assert_eq!(
            respond(&rx, &mut tx, &mut params, &status()),
            Err(FrameError::BadPayload)
        );
        assert_eq!(params, ArmParams::new());
    }

    #[test]
    fn test_max_payload_fits_frame() {
        let payload = [0x5Au8; MAX_PAYLOAD + 10];
        let mut buf = [0u8; FRAME_SIZE];
        assert_eq!(encode(&mut buf, 0, CMD_ARM, &payload), HEADER_LEN + MAX_PAYLOAD + CRC_LEN);
        assert_eq!(decode(&buf).unwrap().payload.len(), MAX_PAYLOAD);
    }
}
