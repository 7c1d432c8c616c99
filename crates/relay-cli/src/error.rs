use thiserror::Error;

use relay_core::{ConfigError, DispatchError, TransportError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The transport could not be set up.
    #[error("Cannot create download transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid action JSON: {0}")]
    InvalidAction(String),

    #[error("Cannot print result: {0}")]
    Output(String),
}
