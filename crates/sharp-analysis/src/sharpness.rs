//! Move-quality distribution and the sharpness ratio.

use serde::{Deserialize, Serialize};

use sharp_core::{Move, Position};
use sharp_uci::Engine;

use crate::AnalysisError;

/// Evaluation-loss thresholds, in pawns.
///
/// A blunder loses 3+ pawns of evaluation, a mistake 1.1-3, an inaccuracy
/// 0.5-1.1; depending on the ELO you are modeling you might tune these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Loss at or beyond which a move is a blunder.
    #[serde(default = "default_blunder")]
    pub blunder: f64,
    /// Loss beyond which a move is fully bad.
    #[serde(default = "default_mistake")]
    pub mistake: f64,
    /// Loss up to which a move is still fine.
    #[serde(default = "default_inaccuracy")]
    pub inaccuracy: f64,
    /// Absolute evaluation beyond which the game is already decided and
    /// move quality stops mattering.
    #[serde(default = "default_decided")]
    pub decided: f64,
    /// How much a candidate may cede before line generation drops it.
    /// Defaults to the inaccuracy threshold; configurable separately.
    #[serde(default = "default_inaccuracy")]
    pub candidate_filter: f64,
}

fn default_blunder() -> f64 {
    3.0
}

fn default_mistake() -> f64 {
    1.1
}

fn default_inaccuracy() -> f64 {
    0.5
}

fn default_decided() -> f64 {
    10.0
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blunder: default_blunder(),
            mistake: default_mistake(),
            inaccuracy: default_inaccuracy(),
            decided: default_decided(),
            candidate_filter: default_inaccuracy(),
        }
    }
}

/// How a position's legal moves distribute over the quality buckets.
///
/// Counts may be fractional: a move in the inaccuracy-to-mistake band
/// contributes 0.5 to both `good` and `bad`, smoothing the boundary
/// instead of cutting a hard cliff at the mistake threshold.
/// `good + bad + blunders == total` within floating tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveDist {
    pub good: f64,
    pub bad: f64,
    pub blunders: f64,
    pub total: f64,
}

/// Buckets each move evaluation by its loss against the base evaluation.
///
/// `delta = |base_eval - eval|`: at or past the blunder threshold the move
/// is a blunder; within the inaccuracy threshold it is good; in the
/// mid-band it splits evenly between good and bad; past the mistake
/// threshold it is bad.
pub fn move_distribution(evals: &[f64], base_eval: f64, thresholds: &Thresholds) -> MoveDist {
    let mut dist = MoveDist {
        total: evals.len() as f64,
        ..MoveDist::default()
    };
    for &eval in evals {
        let delta = (base_eval - eval).abs();
        if delta >= thresholds.blunder {
            dist.blunders += 1.0;
        } else if delta <= thresholds.inaccuracy {
            dist.good += 1.0;
        } else if delta <= thresholds.mistake {
            dist.good += 0.5;
            dist.bad += 0.5;
        } else {
            dist.bad += 1.0;
        }
    }
    dist
}

/// The simplified two-bucket split: blunders fold into `bad`, and moves in
/// an already-decided position (|eval| at or past the decided threshold)
/// count as good, since blundering while ten pawns up changes nothing.
/// Returns `(good, bad)`.
pub fn two_bucket(evals: &[f64], base_eval: f64, thresholds: &Thresholds) -> (f64, f64) {
    let mut good = 0.0;
    let mut bad = 0.0;
    for &eval in evals {
        if eval.abs() >= thresholds.decided {
            good += 1.0;
            continue;
        }
        let delta = (base_eval - eval).abs();
        if delta <= thresholds.inaccuracy {
            good += 1.0;
        } else if delta >= thresholds.mistake {
            bad += 1.0;
        }
    }
    (good, bad)
}

/// The published sharpness ratio: `bad / (bad + good)`, ignoring blunders.
///
/// `None` when `bad + good == 0`; the caller must guard. Within bounds the
/// ratio lives in [0, 1].
pub fn ratio(dist: &MoveDist) -> Option<f64> {
    let relevant = dist.bad + dist.good;
    if relevant == 0.0 {
        None
    } else {
        Some(dist.bad / relevant)
    }
}

/// Reconstructs a distribution from a published ratio.
///
/// Inverse of [`ratio`]: `total - blunders` splits into good and bad such
/// that `bad / (bad + good)` equals `ratio` again.
pub fn expand_ratio(ratio: f64, blunders: f64, total: f64) -> MoveDist {
    let bad = ratio * (total - blunders);
    let good = total - blunders - bad;
    MoveDist {
        good,
        bad,
        blunders,
        total,
    }
}

/// Full sharpness computation for one position: evaluate it, evaluate
/// every legal move, and bucket the results. `progress(done, total)` is
/// called around each per-move evaluation.
pub fn position_sharpness(
    engine: &mut Engine,
    pos: &Position,
    depth: u32,
    thresholds: &Thresholds,
    progress: impl FnMut(usize, usize),
) -> Result<MoveDist, AnalysisError> {
    let base_eval = engine.eval_position(pos, depth)?;
    let moves = pos.legal_moves();
    let evals = engine.eval_moves(&moves, pos, depth, progress)?;
    Ok(move_distribution(&evals, base_eval, thresholds))
}

/// Sharpness of the position reached by playing `mv`: how narrow the
/// opponent's path is afterwards. The position is restored before
/// returning, whatever happens.
pub fn move_sharpness(
    engine: &mut Engine,
    pos: &mut Position,
    mv: Move,
    depth: u32,
    thresholds: &Thresholds,
) -> Result<MoveDist, AnalysisError> {
    pos.probe(mv, |p| {
        let base_eval = engine.eval_position(p, depth)?;
        let moves = p.legal_moves();
        let evals = engine.eval_moves(&moves, p, depth, |_, _| {})?;
        Ok(move_distribution(&evals, base_eval, thresholds))
    })?
}
