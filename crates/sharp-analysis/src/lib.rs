//! Position sharpness analysis driven by engine evaluations.
//!
//! A position is "sharp" when most of its legal moves make things worse:
//! only a narrow path keeps the evaluation alive. This crate turns raw
//! per-move evaluations into interpretable scalars:
//!
//! - [`move_distribution`] / [`ratio`] - bucket moves by how much they
//!   worsen the position and publish bad/(bad+good)
//! - [`complexity`] - how much the best move keeps changing as search
//!   depth increases
//! - [`generate_line`] - a greedy best-first line alternating the
//!   sharpest non-losing move with the engine's best reply

mod complexity;
mod line;
mod sharpness;

pub use complexity::{best_move_changes, complexity};
pub use line::{generate_line, line_sharpness, LineReport};
pub use sharpness::{
    expand_ratio, move_distribution, move_sharpness, position_sharpness, ratio, two_bucket,
    MoveDist, Thresholds,
};

use thiserror::Error;

/// Errors surfaced while folding engine output into scores.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The engine conversation failed.
    #[error("engine error: {0}")]
    Engine(#[from] sharp_uci::EngineError),
    /// A move could not be applied to the analysis position.
    #[error("position error: {0}")]
    Position(#[from] sharp_core::PositionError),
}
