//! Classification of engine output lines
//!
//! The wire protocol carries no request identifiers, so every line is
//! classified on its leading marker alone; the session decides what the
//! current conversation does with it.

use std::str::FromStr;

use crate::error::EngineError;

/// One classified engine line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineReply {
    /// `readyok`
    Ready,
    /// `uciok`, terminates the identification handshake
    UciOk,
    /// `option name ...` capability advertisement
    OptionAck,
    /// `info ...` search progress
    Info(InfoLine),
    /// `bestmove <move> [ponder <move>]`, the terminal search result
    BestMove {
        best: String,
        ponder: Option<String>,
    },
    /// No known marker matched
    Unrecognized,
}

/// Fields extracted from an `info` line for display.
///
/// Extraction is best-effort: malformed numerics leave the field unset and
/// [`InfoLine::display`] falls back to the raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    /// Centipawn score, from the side to move.
    pub cp: Option<i32>,
    /// Mate in N moves.
    pub mate: Option<i32>,
    /// Principal variation moves.
    pub pv: Vec<String>,
    pub raw: String,
}

impl InfoLine {
    fn parse(line: &str) -> Self {
        Self {
            depth: number_after(line, "depth"),
            cp: number_after(line, "cp"),
            mate: number_after(line, "mate"),
            pv: pv_moves(line),
            raw: line.to_string(),
        }
    }

    /// Render for the analysis panel, e.g. `depth 12 eval +0.35 pv e2e4 e7e5`.
    pub fn display(&self) -> String {
        let score = match (self.cp, self.mate) {
            (_, Some(mate)) => format!("mate {mate}"),
            (Some(cp), None) => format!("eval {:+.2}", f64::from(cp) / 100.0),
            (None, None) => return self.raw.clone(),
        };
        let Some(depth) = self.depth else {
            return self.raw.clone();
        };
        let mut out = format!("depth {depth} {score}");
        if !self.pv.is_empty() {
            out.push_str(" pv ");
            out.push_str(&self.pv.join(" "));
        }
        out
    }
}

/// Classify a single engine line.
///
/// A `bestmove` marker without a parseable move token (including the
/// engine's literal `(none)`) and the explicit `No bestmove found` sentinel
/// are [`EngineError::NoMoveFound`], a failed classification distinct from
/// [`EngineReply::Unrecognized`].
pub fn classify(line: &str) -> Result<EngineReply, EngineError> {
    let line = line.trim();
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("readyok") => Ok(EngineReply::Ready),
        Some("uciok") => Ok(EngineReply::UciOk),
        Some("option") => Ok(EngineReply::OptionAck),
        Some("info") => Ok(EngineReply::Info(InfoLine::parse(line))),
        Some("bestmove") => match tokens.next() {
            None | Some("(none)") => Err(EngineError::NoMoveFound),
            Some(best) => {
                let ponder = match tokens.next() {
                    Some("ponder") => tokens.next().map(str::to_string),
                    _ => None,
                };
                Ok(EngineReply::BestMove {
                    best: best.to_string(),
                    ponder,
                })
            }
        },
        _ if line.eq_ignore_ascii_case("no bestmove found") => Err(EngineError::NoMoveFound),
        _ => Ok(EngineReply::Unrecognized),
    }
}

/// Scan for `key <number>` anywhere in the line.
fn number_after<T: FromStr>(line: &str, key: &str) -> Option<T> {
    let mut tokens = line.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == key {
            return tokens.next()?.parse().ok();
        }
    }
    None
}

/// Moves after the `pv` keyword, up to the next non-move field.
fn pv_moves(line: &str) -> Vec<String> {
    line.split_whitespace()
        .skip_while(|token| *token != "pv")
        .skip(1)
        .take_while(|token| *token != "string" && !token.starts_with("bmc"))
        .map(str::to_string)
        .collect()
}
