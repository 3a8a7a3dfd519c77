//! Session error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("engine reported no usable move")]
    NoMoveFound,

    #[error("session is torn down")]
    SessionTornDown,

    #[error("channel error: {0}")]
    Channel(String),
}
