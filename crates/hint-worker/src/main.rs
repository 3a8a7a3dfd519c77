//! Best-move and analysis worker
//!
//! Drives a UCI engine process for hint and streaming-analysis requests from
//! the command line. Move legality stays with the rules library; the engine
//! session only passes board encodings through.

mod config;

use std::str::FromStr;

use anyhow::Context;
use chess::{Board, ChessMove, MoveGen, Piece};
use tracing::{error, info, warn};

use uci_session::{EngineError, ProcessChannel, SessionHandle, SessionLimits, NO_ANALYSIS};

use crate::config::HintConfig;

/// Parsed command-line flags.
#[derive(Debug, Default)]
struct CliArgs {
    fen: Option<String>,
    depth: Option<u32>,
    skill: Option<u8>,
    analyze: bool,
}

/// Parse `--fen <FEN> [--depth N] [--skill N] [--analyze]` from CLI args.
fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = CliArgs::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--fen" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.fen = Some(value.clone());
                    i += 1;
                }
            }
            "--depth" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.depth = value.trim().parse().ok();
                    i += 1;
                }
            }
            "--skill" => {
                if let Some(value) = args.get(i + 1) {
                    parsed.skill = value.trim().parse().ok();
                    i += 1;
                }
            }
            "--analyze" => parsed.analyze = true,
            other => warn!(flag = other, "ignoring unknown flag"),
        }
        i += 1;
    }
    parsed
}

/// UCI notation for a move from the rules library.
fn uci_string(chess_move: &ChessMove) -> String {
    format!(
        "{}{}{}",
        chess_move.get_source(),
        chess_move.get_dest(),
        chess_move
            .get_promotion()
            .map(|p| match p {
                Piece::Queen => "q",
                Piece::Rook => "r",
                Piece::Bishop => "b",
                Piece::Knight => "n",
                _ => "",
            })
            .unwrap_or("")
    )
}

/// Whether the engine's token names a legal move in this position.
fn is_legal(board: &Board, token: &str) -> bool {
    MoveGen::new_legal(board).any(|m| uci_string(&m) == token)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = parse_args();
    let config = HintConfig::load();
    info!(engine_path = %config.engine_path, "Worker config loaded");

    // The rules library supplies and validates the position
    let board = match &args.fen {
        Some(fen) => Board::from_str(fen)
            .map_err(|e| anyhow::anyhow!("invalid FEN {fen:?}: {e}"))?,
        None => Board::default(),
    };
    let fen = board.to_string();

    let channel = ProcessChannel::spawn(&config.engine_path)
        .with_context(|| format!("failed to start engine at {}", config.engine_path))?;
    let session = SessionHandle::with_limits(channel, SessionLimits::default());

    session.init().await.context("engine handshake failed")?;
    session
        .set_engine_option("Threads", &config.threads.to_string())
        .await?;
    session
        .set_engine_option("Hash", &config.hash_mb.to_string())
        .await?;
    session
        .configure(config.depth, args.skill.unwrap_or(config.skill_level))
        .await?;

    let depth = match args.depth {
        Some(depth) => depth,
        None => session.default_depth().await,
    };

    if args.analyze {
        match session
            .analyze(&fen, depth, |lines| {
                if let Some(latest) = lines.last() {
                    info!(line = %latest, "analysis");
                }
            })
            .await
        {
            Ok(summary) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            Err(err) => {
                error!(error = %err, "analysis failed");
                println!("{NO_ANALYSIS}");
            }
        }
    } else {
        match session.get_best_move(&fen, depth).await {
            Ok(found) => {
                if !is_legal(&board, &found.best) {
                    warn!(best = %found.best, "engine move is not legal in this position");
                }
                println!("{}", serde_json::to_string_pretty(&found)?);
            }
            Err(err @ (EngineError::Timeout(_) | EngineError::NoMoveFound)) => {
                error!(error = %err, "engine produced no usable move");
                println!("no move found / timed out");
            }
            Err(err) => return Err(err.into()),
        }
    }

    session.shutdown().await;
    Ok(())
}
