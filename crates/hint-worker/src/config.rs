//! Worker configuration from environment variables

use std::env;

#[derive(Clone, Debug)]
pub struct HintConfig {
    /// Path to the engine binary
    pub engine_path: String,

    /// Default search depth in plies
    pub depth: u32,

    /// Engine skill level (0 weakest, 20 strongest)
    pub skill_level: u8,

    /// Engine search threads
    pub threads: u32,

    /// Engine hash table size in MiB
    pub hash_mb: u32,
}

impl HintConfig {
    /// Load configuration from environment variables, with defaults for
    /// everything.
    pub fn load() -> Self {
        let engine_path =
            env::var("ENGINE_PATH").unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let depth = env::var("SEARCH_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(12);

        let skill_level = env::var("SKILL_LEVEL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let threads = env::var("ENGINE_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        let hash_mb = env::var("ENGINE_HASH_MB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);

        Self {
            engine_path,
            depth,
            skill_level,
            threads,
            hash_mb,
        }
    }
}
