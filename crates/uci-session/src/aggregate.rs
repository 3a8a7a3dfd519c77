//! Streaming-analysis aggregation
//!
//! A bounded window of the most recent progress lines, plus the quiescence
//! bookkeeping that decides when a streaming search has settled.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Retention window for progress lines.
pub const RECENT_LINES: usize = 5;

/// Displayed when a streaming analysis produced no progress lines at all.
pub const NO_ANALYSIS: &str = "no analysis available";

/// Result of one streaming analysis call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    /// Most recent progress lines, oldest first, possibly followed by a
    /// `best move: <move>` annotation.
    pub lines: Vec<String>,
}

impl AnalysisSummary {
    /// The sentinel summary for an analysis that produced nothing.
    pub fn placeholder() -> Self {
        Self {
            lines: vec![NO_ANALYSIS.to_string()],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.lines.len() == 1 && self.lines[0] == NO_ANALYSIS
    }
}

/// Collects progress lines for one streaming call.
///
/// Lives exactly as long as that call; the retention window keeps the last
/// [`RECENT_LINES`] entries and every push restarts the quiescence clock.
pub(crate) struct AnalysisAccumulator {
    lines: Vec<String>,
    cap: usize,
    quiescence: Duration,
    last_line_at: Option<Instant>,
}

impl AnalysisAccumulator {
    pub(crate) fn new(cap: usize, quiescence: Duration) -> Self {
        Self {
            lines: Vec::with_capacity(cap),
            cap,
            quiescence,
            last_line_at: None,
        }
    }

    pub(crate) fn push(&mut self, line: String) {
        if self.lines.len() == self.cap {
            self.lines.remove(0);
        }
        self.lines.push(line);
        self.last_line_at = Some(Instant::now());
    }

    /// Append the terminal annotation. It rides on top of the retention
    /// window rather than evicting a progress line, and it does not touch
    /// the quiescence clock.
    pub(crate) fn push_terminal(&mut self, line: String) {
        self.lines.push(line);
    }

    pub(crate) fn recent(&self) -> &[String] {
        &self.lines
    }

    pub(crate) fn has_output(&self) -> bool {
        self.last_line_at.is_some()
    }

    /// When the streaming loop should wake if no further line arrives:
    /// the quiescence deadline of the newest line, capped by the overall
    /// deadline; before any line, the overall deadline alone.
    pub(crate) fn next_wakeup(&self, overall: Instant) -> Instant {
        match self.last_line_at {
            Some(at) => (at + self.quiescence).min(overall),
            None => overall,
        }
    }

    pub(crate) fn into_summary(self) -> AnalysisSummary {
        AnalysisSummary { lines: self.lines }
    }
}
