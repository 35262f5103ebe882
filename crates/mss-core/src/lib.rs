pub mod error;
pub mod id;
pub mod model;
pub mod time;

pub use error::{CoreError, Result};
pub use id::generate_id;
pub use model::{App, Device, DeviceSnapshot, InitClient, Version};
pub use time::{monotonic_after, now_utc};
