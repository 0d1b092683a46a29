pub mod config;
pub mod context;
pub mod delete;
pub mod filesystem;
pub mod listing;
pub mod mkdirs;
pub mod path;
pub mod rename;
pub mod status;

pub use config::FsConfig;
pub use context::FsContext;
pub use filesystem::{BucketFileSystem, FsWriter};
pub use path::FsPath;
pub use status::FileStatus;
