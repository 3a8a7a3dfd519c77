//! Engine session coordination
//!
//! The engine emits unlabelled lines with no request identifiers, so at most
//! one conversation may be active on the channel at a time. The session lives
//! behind an async mutex with FIFO fairness: every high-level operation holds
//! the lock for its whole conversation, which serializes concurrent callers
//! and makes the single pending request structural.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::aggregate::{AnalysisAccumulator, AnalysisSummary, RECENT_LINES};
use crate::channel::MessageChannel;
use crate::classify::{classify, EngineReply};
use crate::codec::{self, SearchMode};
use crate::error::EngineError;

/// Largest accepted skill-level setting.
pub const MAX_SKILL_LEVEL: u8 = 20;

/// Terminal result of a single-shot best-move request.
#[derive(Debug, Clone, Serialize)]
pub struct BestMove {
    /// Move in UCI notation
    pub best: String,
    /// Engine's expected reply, when offered
    pub ponder: Option<String>,
}

/// Timing policy for one session.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Deadline for each setup sub-request (readiness probes, handshake).
    pub setup_timeout: Duration,
    /// Search budget granted per ply of requested depth.
    pub search_budget_per_ply: Duration,
    /// Smallest search budget regardless of depth.
    pub search_floor: Duration,
    /// Silence window after which a streaming analysis is considered settled.
    pub quiescence: Duration,
    /// How long to drain for a late terminal line after issuing stop.
    pub stop_grace: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            setup_timeout: Duration::from_secs(2),
            search_budget_per_ply: Duration::from_secs(1),
            search_floor: Duration::from_secs(5),
            quiescence: Duration::from_millis(500),
            stop_grace: Duration::from_secs(1),
        }
    }
}

impl SessionLimits {
    /// The engine's think time grows with depth, so the search deadline
    /// scales with it.
    fn search_budget(&self, depth: u32) -> Duration {
        (self.search_budget_per_ply * depth).max(self.search_floor)
    }
}

/// One outstanding conversation turn: the command sent, its time budget, and
/// the matcher that picks the terminal reply. Only one can exist per session
/// because dispatch holds `&mut` access for the request's whole lifetime.
struct PendingRequest<F> {
    command: String,
    budget: Duration,
    deadline: Instant,
    complete: F,
}

impl<F> PendingRequest<F> {
    fn new(command: impl Into<String>, budget: Duration, complete: F) -> Self {
        Self {
            command: command.into(),
            budget,
            deadline: Instant::now() + budget,
            complete,
        }
    }
}

/// Session state: the channel handle plus caller-issued configuration.
struct EngineSession<C> {
    channel: C,
    position: String,
    skill_level: u8,
    depth: u32,
    torn_down: bool,
    limits: SessionLimits,
}

impl<C: MessageChannel> EngineSession<C> {
    fn guard_live(&self) -> Result<(), EngineError> {
        if self.torn_down {
            return Err(EngineError::SessionTornDown);
        }
        Ok(())
    }

    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        match self.channel.send(command).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.torn_down = true;
                Err(err)
            }
        }
    }

    /// A closed or failing channel tears the session down; the request in
    /// flight fails rather than dangling.
    fn note_line(
        &mut self,
        next: Result<Option<String>, EngineError>,
    ) -> Result<String, EngineError> {
        match next {
            Ok(Some(line)) => Ok(line),
            Ok(None) => {
                self.torn_down = true;
                Err(EngineError::Channel("engine closed the channel".into()))
            }
            Err(err) => {
                self.torn_down = true;
                Err(err)
            }
        }
    }

    /// Send the request's command and consume replies in delivery order until
    /// the matcher picks a terminal one or the deadline passes. Non-matching
    /// lines are discarded; line consumption stops the moment the request
    /// resolves.
    async fn dispatch<T, F>(&mut self, request: PendingRequest<F>) -> Result<T, EngineError>
    where
        F: Fn(EngineReply) -> Option<T>,
    {
        self.send(&request.command).await?;
        loop {
            match timeout_at(request.deadline, self.channel.next_line()).await {
                Ok(outcome) => {
                    let line = self.note_line(outcome)?;
                    match classify(&line) {
                        Ok(reply) => {
                            if let Some(result) = (request.complete)(reply) {
                                return Ok(result);
                            }
                            debug!(line = %line, "awaiting terminal line");
                        }
                        Err(err) => return Err(err),
                    }
                }
                Err(_) => return Err(EngineError::Timeout(request.budget)),
            }
        }
    }

    async fn sync_ready(&mut self) -> Result<(), EngineError> {
        let request = PendingRequest::new(
            codec::readiness_probe(),
            self.limits.setup_timeout,
            |reply| matches!(reply, EngineReply::Ready).then_some(()),
        );
        self.dispatch(request).await
    }

    /// Identification handshake: `uci` until `uciok`, then a readiness probe.
    /// Id and `option` advertisement lines are classified and skipped.
    async fn handshake(&mut self) -> Result<(), EngineError> {
        let request = PendingRequest::new(codec::handshake(), self.limits.setup_timeout, |reply| {
            matches!(reply, EngineReply::UciOk).then_some(())
        });
        self.dispatch(request).await?;
        self.sync_ready().await
    }

    /// The wire protocol has no acknowledgement for `setoption`, so the
    /// option write is synchronized by a trailing readiness probe.
    async fn apply_option(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.send(&codec::set_option(name, value)).await?;
        self.sync_ready().await
    }

    async fn apply_position(&mut self) -> Result<(), EngineError> {
        let command = codec::set_position(&self.position);
        self.send(&command).await?;
        self.sync_ready().await
    }

    async fn run_search(&mut self, command: String, depth: u32) -> Result<BestMove, EngineError> {
        let budget = self.limits.search_budget(depth);
        let request = PendingRequest::new(command, budget, |reply| match reply {
            EngineReply::BestMove { best, ponder } => Some(BestMove { best, ponder }),
            _ => None,
        });
        match self.dispatch(request).await {
            Ok(found) => {
                info!(best = %found.best, "search resolved");
                Ok(found)
            }
            Err(err @ EngineError::Timeout(_)) => {
                warn!(depth, "search timed out, stopping engine");
                self.halt_search().await;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn run_analysis<F>(
        &mut self,
        command: String,
        depth: u32,
        mut on_progress: F,
    ) -> Result<AnalysisSummary, EngineError>
    where
        F: FnMut(&[String]) + Send,
    {
        let overall = Instant::now() + self.limits.search_budget(depth);
        let mut acc = AnalysisAccumulator::new(RECENT_LINES, self.limits.quiescence);
        self.send(&command).await?;
        loop {
            let wake = acc.next_wakeup(overall);
            match timeout_at(wake, self.channel.next_line()).await {
                Ok(outcome) => {
                    let line = self.note_line(outcome)?;
                    match classify(&line) {
                        Ok(EngineReply::Info(progress)) => {
                            acc.push(progress.display());
                            on_progress(acc.recent());
                        }
                        Ok(EngineReply::BestMove { best, .. }) => {
                            acc.push_terminal(format!("best move: {best}"));
                            on_progress(acc.recent());
                            info!(best = %best, "analysis resolved on terminal line");
                            return Ok(acc.into_summary());
                        }
                        Ok(_) => {}
                        Err(err) => return Err(err),
                    }
                }
                Err(_) => {
                    // The engine either went quiet after streaming or never
                    // produced a line within the overall budget.
                    self.halt_search().await;
                    if acc.has_output() {
                        info!(lines = acc.recent().len(), "analysis settled on quiescence");
                        return Ok(acc.into_summary());
                    }
                    warn!(depth, "analysis produced no progress lines");
                    return Ok(AnalysisSummary::placeholder());
                }
            }
        }
    }

    /// Stop is advisory: the engine may still flush a terminal `bestmove`.
    /// Drain until that line or the grace deadline so it cannot leak into
    /// the next conversation.
    async fn halt_search(&mut self) {
        if self.torn_down {
            return;
        }
        if self.send(codec::stop()).await.is_err() {
            return;
        }
        let grace = Instant::now() + self.limits.stop_grace;
        loop {
            match timeout_at(grace, self.channel.next_line()).await {
                Ok(Ok(Some(line))) => match classify(&line) {
                    Ok(EngineReply::BestMove { .. }) | Err(EngineError::NoMoveFound) => break,
                    _ => {}
                },
                Ok(Ok(None)) | Ok(Err(_)) => {
                    self.torn_down = true;
                    break;
                }
                Err(_) => break,
            }
        }
    }
}

/// Cloneable handle to one engine session.
///
/// Clones share the session; each high-level call locks it for the entire
/// conversation, so concurrent callers queue in arrival order and no engine
/// line can be attributed to the wrong request.
pub struct SessionHandle<C: MessageChannel> {
    inner: Arc<Mutex<EngineSession<C>>>,
}

impl<C: MessageChannel> Clone for SessionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: MessageChannel> SessionHandle<C> {
    pub fn new(channel: C) -> Self {
        Self::with_limits(channel, SessionLimits::default())
    }

    pub fn with_limits(channel: C, limits: SessionLimits) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EngineSession {
                channel,
                position: String::new(),
                skill_level: MAX_SKILL_LEVEL,
                depth: 12,
                torn_down: false,
                limits,
            })),
        }
    }

    /// Run the identification handshake. Call once after channel creation.
    pub async fn init(&self) -> Result<(), EngineError> {
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        session.handshake().await
    }

    /// Validate and store the default search depth and skill level.
    /// Local validation only; nothing reaches the channel.
    pub async fn configure(&self, depth: u32, skill_level: u8) -> Result<(), EngineError> {
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        if depth == 0 {
            return Err(EngineError::InvalidParameter(
                "search depth must be at least 1".into(),
            ));
        }
        if skill_level > MAX_SKILL_LEVEL {
            return Err(EngineError::InvalidParameter(format!(
                "skill level must be at most {MAX_SKILL_LEVEL}"
            )));
        }
        session.depth = depth;
        session.skill_level = skill_level;
        Ok(())
    }

    /// The configured default search depth.
    pub async fn default_depth(&self) -> u32 {
        self.inner.lock().await.depth
    }

    /// Apply an engine tuning option (`Threads`, `Hash`, ...).
    pub async fn set_engine_option(&self, name: &str, value: &str) -> Result<(), EngineError> {
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        session.apply_option(name, value).await
    }

    /// Reset the engine's game state.
    pub async fn new_game(&self) -> Result<(), EngineError> {
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        session.send(codec::new_game()).await?;
        session.sync_ready().await
    }

    /// Single-shot best-move retrieval for `board_encoding` at `depth`.
    ///
    /// Runs the setup sub-requests (new game, readiness probe, skill option,
    /// position) under the setup timeout, then a fixed-depth search whose
    /// terminal line is `bestmove`. A search timeout leaves the session
    /// usable; setup failures abort the whole call.
    pub async fn get_best_move(
        &self,
        board_encoding: &str,
        depth: u32,
    ) -> Result<BestMove, EngineError> {
        let search = codec::start_search(SearchMode::Depth(depth))?;
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        info!(depth, "requesting best move");
        session.position = board_encoding.to_string();
        session.send(codec::new_game()).await?;
        session.sync_ready().await?;
        let skill = session.skill_level.to_string();
        session.apply_option("Skill Level", &skill).await?;
        session.apply_position().await?;
        session.run_search(search, depth).await
    }

    /// Streaming analysis of `board_encoding` at `depth`.
    ///
    /// Every progress line is appended to a bounded window (most recent
    /// [`RECENT_LINES`]) and the window is handed to `on_progress`. Resolves
    /// on the terminal `bestmove`, on quiescence after at least one progress
    /// line, or with the placeholder summary when the overall deadline passes
    /// with no progress at all.
    pub async fn analyze<F>(
        &self,
        board_encoding: &str,
        depth: u32,
        on_progress: F,
    ) -> Result<AnalysisSummary, EngineError>
    where
        F: FnMut(&[String]) + Send,
    {
        let search = codec::start_search(SearchMode::Depth(depth))?;
        let mut session = self.inner.lock().await;
        session.guard_live()?;
        info!(depth, "starting streaming analysis");
        session.position = board_encoding.to_string();
        session.send(codec::new_game()).await?;
        session.sync_ready().await?;
        session.apply_position().await?;
        session.run_analysis(search, depth, on_progress).await
    }

    /// Tear the session down. Idempotent; waits its turn in the request
    /// queue, so it can never race an in-flight conversation. Every later
    /// operation fails with `SessionTornDown`.
    pub async fn shutdown(&self) {
        let mut session = self.inner.lock().await;
        if session.torn_down {
            return;
        }
        info!("shutting down engine session");
        let _ = session.channel.send(codec::quit()).await;
        session.torn_down = true;
    }
}
