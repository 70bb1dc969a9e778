pub mod claw;
pub mod count;
pub mod host_link;
pub mod imu;
pub mod servo;
pub mod shoulder;
pub mod telemetry;
pub mod wrist;

pub use claw::claw_task;
pub use count::count_task;
pub use host_link::host_link_task;
pub use imu::{imu_stats_task, mpu6050_task, shoulder_imu_task};
pub use servo::{elbow_task, rotunda_task};
pub use shoulder::shoulder_task;
pub use telemetry::telemetry_task;
pub use wrist::wrist_task;
