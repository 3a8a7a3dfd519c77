//! Session coordination for a UCI chess engine over a line-oriented channel.

pub mod aggregate;
pub mod channel;
pub mod classify;
pub mod codec;
pub mod error;
pub mod process;
pub mod session;

pub use aggregate::{AnalysisSummary, NO_ANALYSIS, RECENT_LINES};
pub use channel::MessageChannel;
pub use classify::{classify, EngineReply, InfoLine};
pub use codec::SearchMode;
pub use error::EngineError;
pub use process::ProcessChannel;
pub use session::{BestMove, SessionHandle, SessionLimits, MAX_SKILL_LEVEL};
