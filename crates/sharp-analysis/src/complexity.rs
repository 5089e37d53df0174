//! Position complexity across a depth sweep.
//!
//! After Computer Analysis of World Chess Champions (M. Guid & I. Bratko):
//! a position is complex when deeper search keeps changing its mind about
//! the best move.

use sharp_core::{Color, Position};
use sharp_uci::Engine;

use crate::AnalysisError;

/// Complexity score of a position.
///
/// Iteratively deepens from depth 2 up to (exclusive) `max_depth`. Every
/// time the reported best move differs from the previous depth's, all
/// legal moves are re-evaluated at that depth and the gap between the best
/// and second-best move is accumulated. The first depth always
/// contributes, seeding the accumulation.
///
/// Positions with fewer than two legal moves, or `max_depth <= 2`, score
/// 0.0.
pub fn complexity(
    engine: &mut Engine,
    pos: &Position,
    max_depth: u32,
) -> Result<f64, AnalysisError> {
    let moves = pos.legal_moves();
    if moves.len() < 2 {
        return Ok(0.0);
    }

    let mut total = 0.0;
    let mut previous_best: Option<String> = None;
    for depth in 2..max_depth {
        let best = engine.best_move_token(pos, depth)?;
        if previous_best.as_deref() != Some(best.as_str()) {
            let evals = engine.eval_moves(&moves, pos, depth, |_, _| {})?;
            total += top_two_gap(&evals, pos.side_to_move());
            tracing::debug!(depth, best = %best, total, "best move changed");
        }
        previous_best = Some(best);
    }
    Ok(total)
}

/// The named alternative metric: how many times the best move changed
/// across the sweep, with no re-evaluation. The first depth only sets the
/// baseline.
pub fn best_move_changes(
    engine: &mut Engine,
    pos: &Position,
    max_depth: u32,
) -> Result<u32, AnalysisError> {
    let mut changes = 0;
    let mut previous_best: Option<String> = None;
    for depth in 2..max_depth {
        let best = engine.best_move_token(pos, depth)?;
        if let Some(previous) = &previous_best {
            if *previous != best {
                changes += 1;
            }
        }
        previous_best = Some(best);
    }
    Ok(changes)
}

/// Gap between the two moves the side to move likes best. Evaluations are
/// White-perspective, so "best" is the maximum for White and the minimum
/// for Black.
fn top_two_gap(evals: &[f64], mover: Color) -> f64 {
    let mut sorted = evals.to_vec();
    sorted.sort_by(f64::total_cmp);
    let gap = match mover {
        Color::White => sorted[sorted.len() - 1] - sorted[sorted.len() - 2],
        Color::Black => sorted[1] - sorted[0],
    };
    gap.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_is_between_the_movers_top_two() {
        let evals = [0.1, -0.4, 0.9];
        // White prefers 0.9 over 0.1.
        assert!((top_two_gap(&evals, Color::White) - 0.8).abs() < 1e-9);
        // Black prefers -0.4 over 0.1.
        assert!((top_two_gap(&evals, Color::Black) - 0.5).abs() < 1e-9);
    }
}
