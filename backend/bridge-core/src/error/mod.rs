pub mod bridge;
pub mod config;
pub mod ipc;
pub mod native;

pub use bridge::BridgeError;
pub use config::ConfigError;
pub use ipc::IpcError;
pub use native::NativeError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Native(#[from] native::NativeError),

    #[error(transparent)]
    Bridge(#[from] bridge::BridgeError),

    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
