pub mod azure;
pub mod command;
pub mod config;
pub mod error;
pub mod key;
pub mod oci;
pub mod storage;
pub mod transfer;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use error::{Error, Result};
pub use storage::{ContainerStatus, ObjectStore, RemoteObject};
pub use transfer::{Transfer, TransferStats, TransferredFile, UploadEvent};
