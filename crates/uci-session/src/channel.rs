//! Transport seam between the session and the engine

use async_trait::async_trait;

use crate::error::EngineError;

/// A bidirectional, line-oriented transport to the engine.
///
/// Lines arrive in the order the engine emitted them; the transport does no
/// request/response correlation of its own. Implemented by the process
/// transport in production and by scripted channels in tests.
#[async_trait]
pub trait MessageChannel: Send {
    /// Write one command line to the engine.
    async fn send(&mut self, command: &str) -> Result<(), EngineError>;

    /// Next line emitted by the engine, `None` once the channel is closed.
    async fn next_line(&mut self) -> Result<Option<String>, EngineError>;
}
