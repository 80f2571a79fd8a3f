pub mod command;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod loader;
pub mod metrics;
pub mod sender;
pub mod server;
pub mod service;
pub mod service_manager;
pub mod shutdown;
mod validate;

pub use config::{SocketKind, WorkerConfig};
pub use error::{ErrorCode, ServiceError, WorkerError};
pub use handlers::{BatchSizePolicy, CommandHandlers};
pub use server::ModelServiceWorker;
pub use shutdown::Shutdown;
