//! Engine option set sent during startup.

use serde::{Deserialize, Serialize};

/// Options negotiated with the engine after the `uci` handshake.
///
/// Set before or immediately after process start; re-sending an option is
/// idempotent on the engine side, so updating one later is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Search threads. Must be at least 1.
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// Number of principal variations to report. 1 unless analyzing
    /// multiple lines.
    #[serde(default = "default_multi_pv")]
    pub multi_pv: u32,
    /// Ask the engine for win/draw/loss statistics on its info lines.
    #[serde(default = "default_show_wdl")]
    pub show_wdl: bool,
}

fn default_threads() -> u32 {
    1
}

fn default_multi_pv() -> u32 {
    1
}

fn default_show_wdl() -> bool {
    true
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            multi_pv: default_multi_pv(),
            show_wdl: default_show_wdl(),
        }
    }
}

impl EngineOptions {
    /// The `setoption` name/value pairs this option set expands to.
    pub fn setoption_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Threads", self.threads.to_string()),
            ("MultiPV", self.multi_pv.to_string()),
            ("UCI_showWDL", self.show_wdl.to_string()),
        ]
    }
}
