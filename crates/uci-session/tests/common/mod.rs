//! Scripted engine channel for session tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uci_session::{EngineError, MessageChannel};

/// One scripted reaction step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Emit this line.
    Line(String),
    /// Wait this long before the next step.
    Delay(Duration),
    /// Close the channel.
    Close,
}

pub fn line(text: &str) -> Step {
    Step::Line(text.to_string())
}

pub fn delay_ms(ms: u64) -> Step {
    Step::Delay(Duration::from_millis(ms))
}

pub fn close() -> Step {
    Step::Close
}

struct Rule {
    prefix: String,
    steps: Vec<Step>,
    once: bool,
    used: bool,
}

impl Rule {
    fn matches(&self, command: &str) -> bool {
        if self.once && self.used {
            return false;
        }
        command == self.prefix || command.starts_with(&format!("{} ", self.prefix))
    }
}

/// A fake engine: each sent command is matched against scripted rules, which
/// enqueue the lines the "engine" will emit. With nothing queued the channel
/// stays silent forever, like a wedged engine.
pub struct FakeChannel {
    rules: Vec<Rule>,
    inbox: VecDeque<Step>,
    closed: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            inbox: VecDeque::new(),
            closed: false,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// React to every command matching `prefix`.
    pub fn on(mut self, prefix: &str, steps: Vec<Step>) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            steps,
            once: false,
            used: false,
        });
        self
    }

    /// React to the first unconsumed command matching `prefix`.
    pub fn once(mut self, prefix: &str, steps: Vec<Step>) -> Self {
        self.rules.push(Rule {
            prefix: prefix.to_string(),
            steps,
            once: true,
            used: false,
        });
        self
    }

    /// Shared log of every command the session sent, in wire order.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn send(&mut self, command: &str) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::Channel("channel closed".into()));
        }
        self.sent.lock().unwrap().push(command.to_string());
        if let Some(rule) = self.rules.iter_mut().find(|r| r.matches(command)) {
            rule.used = true;
            self.inbox.extend(rule.steps.iter().cloned());
        }
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        loop {
            match self.inbox.pop_front() {
                Some(Step::Line(text)) => return Ok(Some(text)),
                Some(Step::Delay(duration)) => tokio::time::sleep(duration).await,
                Some(Step::Close) => {
                    self.closed = true;
                    return Ok(None);
                }
                None => {
                    if self.closed {
                        return Ok(None);
                    }
                    // A silent engine: nothing arrives until a timeout fires.
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
