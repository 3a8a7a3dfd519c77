//! UCI command construction
//!
//! Pure string builders; transport and sequencing live in the session.

use crate::error::EngineError;

/// How a search request should be bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Search to a fixed depth in plies.
    Depth(u32),
    /// Search until a stop command arrives.
    Infinite,
}

pub fn handshake() -> &'static str {
    "uci"
}

pub fn readiness_probe() -> &'static str {
    "isready"
}

pub fn new_game() -> &'static str {
    "ucinewgame"
}

pub fn stop() -> &'static str {
    "stop"
}

pub fn quit() -> &'static str {
    "quit"
}

pub fn set_position(board_encoding: &str) -> String {
    format!("position fen {board_encoding}")
}

pub fn set_option(name: &str, value: &str) -> String {
    format!("setoption name {name} value {value}")
}

/// Build a `go` command. A zero depth is rejected locally and never
/// reaches the channel.
pub fn start_search(mode: SearchMode) -> Result<String, EngineError> {
    match mode {
        SearchMode::Depth(0) => Err(EngineError::InvalidParameter(
            "search depth must be at least 1".into(),
        )),
        SearchMode::Depth(depth) => Ok(format!("go depth {depth}")),
        SearchMode::Infinite => Ok("go infinite".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_position() {
        assert_eq!(
            set_position("8/8/8/8/8/8/8/K1k5 w - - 0 1"),
            "position fen 8/8/8/8/8/8/8/K1k5 w - - 0 1"
        );
    }

    #[test]
    fn test_set_option() {
        assert_eq!(
            set_option("Skill Level", "20"),
            "setoption name Skill Level value 20"
        );
    }

    #[test]
    fn test_start_search_depth() {
        assert_eq!(start_search(SearchMode::Depth(12)).unwrap(), "go depth 12");
    }

    #[test]
    fn test_start_search_infinite() {
        assert_eq!(start_search(SearchMode::Infinite).unwrap(), "go infinite");
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(matches!(
            start_search(SearchMode::Depth(0)),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fixed_commands() {
        assert_eq!(handshake(), "uci");
        assert_eq!(readiness_probe(), "isready");
        assert_eq!(new_game(), "ucinewgame");
        assert_eq!(stop(), "stop");
        assert_eq!(quit(), "quit");
    }
}
