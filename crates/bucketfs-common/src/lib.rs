pub mod error;
pub mod time;
pub mod types;

pub use error::{FsError, Result};
pub use types::{ContainerInfo, ObjectInfo};
