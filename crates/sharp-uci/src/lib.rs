//! UCI (Universal Chess Interface) client for driving analysis engines.
//!
//! This crate owns the conversation with a UCI engine subprocess:
//!
//! - `uci` / `uciok` and `isready` / `readyok` handshakes
//! - `setoption name <k> value <v>` configuration
//! - `position fen <fen> [moves ...]` + `go depth <n>` queries, waiting for
//!   `bestmove` with an optional timeout
//! - parsing of `info` lines for `score cp` / `score mate` / `wdl` fields
//!
//! The conversation is strictly half-duplex and synchronous: one query at a
//! time, the caller blocks until the wait token arrives, the timeout
//! elapses, or the process dies. See [`Engine`].

mod client;
mod options;
mod reply;
mod score;

pub use client::{Engine, EngineError, PositionAnalysis, SessionState};
pub use options::EngineOptions;
pub use reply::EngineReply;
pub use score::{Score, Wdl};
