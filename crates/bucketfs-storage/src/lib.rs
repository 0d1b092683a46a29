pub mod credentials;
pub mod disk;
pub mod listing;
pub mod memory;
pub mod traits;

pub use credentials::{AuthMethod, Connector, CredentialProvider, Credentials, StaticCredentialProvider};
pub use disk::{DiskConnector, DiskObjectStore};
pub use memory::{MemoryConnector, MemoryObjectStore};
pub use traits::{ListObjectsResult, ObjectStore};
