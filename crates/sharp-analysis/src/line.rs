//! Sharp-line generation and whole-line sharpness.

use sharp_core::{Color, Move, NotationStyle, Position};
use sharp_uci::{Engine, EngineError};

use crate::sharpness::{move_sharpness, position_sharpness, ratio, Thresholds};
use crate::AnalysisError;

/// Penalty per pawn ceded by a candidate move when scoring it for
/// sharpness. Keeps "sharp but slightly worse" candidates honest without
/// letting material-dumping moves win outright.
const CEDE_PENALTY: f64 = 1.0;

/// Sharpness of every position along a line.
#[derive(Debug, Clone)]
pub struct LineReport {
    /// Sharpness ratio per position: the start, then after each move.
    /// `None` where the position had no decision-relevant moves.
    pub ratios: Vec<Option<f64>>,
    /// Average over the defined ratios.
    pub average: f64,
}

/// Computes the sharpness of the starting position and of each position
/// reached along `moves`. The caller's position is not mutated.
pub fn line_sharpness(
    engine: &mut Engine,
    pos: &Position,
    moves: &[Move],
    depth: u32,
    thresholds: &Thresholds,
    mut progress: impl FnMut(usize, usize),
) -> Result<LineReport, AnalysisError> {
    let mut scratch = pos.clone();
    let mut ratios = Vec::with_capacity(moves.len() + 1);

    let dist = position_sharpness(engine, &scratch, depth, thresholds, |_, _| {})?;
    ratios.push(ratio(&dist));
    progress(0, moves.len());

    for (done, &mv) in moves.iter().enumerate() {
        scratch.push(mv)?;
        let dist = position_sharpness(engine, &scratch, depth, thresholds, |_, _| {})?;
        ratios.push(ratio(&dist));
        progress(done + 1, moves.len());
    }

    let defined: Vec<f64> = ratios.iter().flatten().copied().collect();
    let average = if defined.is_empty() {
        0.0
    } else {
        defined.iter().sum::<f64>() / defined.len() as f64
    };
    Ok(LineReport { ratios, average })
}

/// Greedily generates a sharp line of `length` full moves.
///
/// Each iteration evaluates the base position, then scores every legal
/// move that does not cede more than the candidate filter allows: its
/// score is the sharpness ratio of the resulting position minus a penalty
/// proportional to what the move itself gives up. Without the filter the
/// sharpest-looking move is usually a plain blunder - hanging a piece
/// makes nearly every reply "bad" for the opponent. The best candidate is
/// played, then the engine's own best reply, and both half-moves are
/// appended in `style` notation.
///
/// Returns exactly `2 * length` strings unless the line runs into a
/// position with no playable candidate or no engine reply, in which case
/// it stops early. A candidate whose evaluation times out is skipped as
/// unknown rather than failing the run; the engine conversation is
/// re-synchronized first.
pub fn generate_line(
    engine: &mut Engine,
    pos: &mut Position,
    length: usize,
    depth: u32,
    thresholds: &Thresholds,
    style: NotationStyle,
) -> Result<Vec<String>, AnalysisError> {
    let mut line = Vec::with_capacity(length * 2);

    for _ in 0..length {
        let base_eval = engine.eval_position(pos, depth)?;
        let mover = pos.side_to_move();

        let mut best: Option<(Move, f64)> = None;
        for mv in pos.legal_moves() {
            let eval = match engine.eval_move(mv, pos, depth) {
                Ok(eval) => eval,
                Err(EngineError::Timeout(_)) => {
                    // Unknown, not fatal: re-synchronize and move on.
                    engine.sync(None)?;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let ceded = ceded_by(mover, base_eval, eval);
            if ceded > thresholds.candidate_filter {
                continue;
            }

            let dist = match move_sharpness(engine, pos, mv, depth, thresholds) {
                Ok(dist) => dist,
                Err(AnalysisError::Engine(EngineError::Timeout(_))) => {
                    engine.sync(None)?;
                    continue;
                }
                Err(err) => return Err(err),
            };
            let Some(sharpness) = ratio(&dist) else {
                continue;
            };

            let score = sharpness - ceded.max(0.0) * CEDE_PENALTY;
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
        }

        let Some((sharpest, score)) = best else {
            break;
        };
        tracing::debug!(
            mv = %style.encode(pos, sharpest),
            score,
            "sharpest candidate chosen"
        );
        line.push(style.encode(pos, sharpest));
        pos.push(sharpest)?;

        let Some(reply) = engine.best_move(pos, depth)? else {
            break;
        };
        line.push(style.encode(pos, reply));
        pos.push(reply)?;
    }

    Ok(line)
}

/// How much the move worsens the mover's own standing, in pawns.
/// Evaluations are White-perspective, so a loss for Black shows up as a
/// gain for White.
fn ceded_by(mover: Color, base_eval: f64, eval: f64) -> f64 {
    match mover {
        Color::White => base_eval - eval,
        Color::Black => eval - base_eval,
    }
}


#[cfg(all(test, unix))]
mod stub_tests {
    use super::*;
    use sharp_uci::EngineOptions;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn stub(body: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stub-engine.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub");
        (dir, path)
    }

    fn started(body: &str) -> (TempDir, Engine) {
        let (dir, path) = stub(body);
        let mut engine = Engine::spawn(&path).expect("spawn stub");
        engine.start(&EngineOptions::default()).expect("handshake");
        (dir, engine)
    }

    /// Scores everything 0 and answers `bestmove` with a legal reply for
    /// whichever side the last bare `position` command put on move.
    const FLAT_EVAL: &str = r#"
side=w
while read line; do
  case "$line" in
    uci) echo "uciok" ;;
    isready) echo "readyok" ;;
    position*" moves "*) ;;
    position*" b "*) side=b ;;
    position*) side=w ;;
    go*)
      echo "info depth 5 score cp 0"
      if [ "$side" = b ]; then echo "bestmove e7e5"; else echo "bestmove e2e4"; fi ;;
    quit) exit 0 ;;
  esac
done
"#;

    #[test]
    fn zero_length_line_is_empty() {
        let (_dir, mut engine) = started(FLAT_EVAL);
        let mut pos = Position::new();
        let line = generate_line(
            &mut engine,
            &mut pos,
            0,
            5,
            &Thresholds::default(),
            NotationStyle::Long,
        )
        .expect("generate");
        assert!(line.is_empty());
        assert_eq!(pos.fen(), Position::STARTPOS);
    }

    #[test]
    fn one_full_move_yields_two_half_moves() {
        let (_dir, mut engine) = started(FLAT_EVAL);
        let mut pos = Position::new();
        let line = generate_line(
            &mut engine,
            &mut pos,
            1,
            5,
            &Thresholds::default(),
            NotationStyle::Long,
        )
        .expect("generate");
        assert_eq!(line.len(), 2);
        // Both half-moves were applied to the position.
        assert_eq!(pos.side_to_move(), Color::White);
        assert_ne!(pos.fen(), Position::STARTPOS);
    }

    #[test]
    fn line_sharpness_reports_one_ratio_per_position() {
        let (_dir, mut engine) = started(FLAT_EVAL);
        let pos = Position::new();
        let e4 = sharp_core::parse_long_algebraic(&pos, "e2e4").expect("legal");
        let report = line_sharpness(
            &mut engine,
            &pos,
            &[e4],
            5,
            &Thresholds::default(),
            |_, _| {},
        )
        .expect("line sharpness");
        assert_eq!(report.ratios.len(), 2);
        // Flat evaluations make every move good: sharpness 0 everywhere.
        assert_eq!(report.ratios[0], Some(0.0));
        assert!(report.average.abs() < 1e-9);
    }
}
