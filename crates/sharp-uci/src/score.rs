//! Engine score model and normalization.

use sharp_core::Color;
use serde::{Deserialize, Serialize};

/// A score parsed from an engine info line.
///
/// Engines report scores relative to the side they were told to search
/// for; [`Score::normalize`] converts onto a single White-perspective
/// pawn scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    /// Centipawns, positive meaning the searched side is better.
    Cp(i32),
    /// Forced mate in N moves; negative means the searched side gets mated.
    Mate(i32),
}

/// Sentinel magnitudes (in pawns) for mate scores, tiered by how soon the
/// mate falls so that faster mates always outrank slower ones and any mate
/// dwarfs any centipawn score.
const MATE_NEAR: f64 = 99.99;
const MATE_MID: f64 = 55.55;
const MATE_FAR: f64 = 11.11;

impl Score {
    /// Converts to a signed pawn score from White's perspective, given the
    /// side the engine was scoring for.
    ///
    /// Centipawns divide by 100. Mate-in-N collapses to a tiered sentinel:
    /// |N| <= 5 maps to ±99.99, |N| <= 10 to ±55.55, anything further to
    /// ±11.11. The sign follows who delivers the mate, then flips with the
    /// point of view like any other score.
    pub fn normalize(self, point_of_view: Color) -> f64 {
        let pawns = match self {
            Score::Cp(cp) => f64::from(cp) / 100.0,
            Score::Mate(n) => {
                let tier = match n.abs() {
                    0..=5 => MATE_NEAR,
                    6..=10 => MATE_MID,
                    _ => MATE_FAR,
                };
                if n >= 0 {
                    tier
                } else {
                    -tier
                }
            }
        };
        match point_of_view {
            Color::White => pawns,
            Color::Black => -pawns,
        }
    }
}

/// Win/draw/loss statistics from an engine info line, in permille from the
/// searched side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centipawns_scale_to_pawns() {
        assert_eq!(Score::Cp(35).normalize(Color::White), 0.35);
        assert_eq!(Score::Cp(35).normalize(Color::Black), -0.35);
        assert_eq!(Score::Cp(-150).normalize(Color::White), -1.5);
    }

    #[test]
    fn mate_tiers_by_distance() {
        assert_eq!(Score::Mate(1).normalize(Color::White), 99.99);
        assert_eq!(Score::Mate(7).normalize(Color::White), 55.55);
        assert_eq!(Score::Mate(20).normalize(Color::White), 11.11);
    }

    #[test]
    fn faster_mates_outrank_slower_ones() {
        let near = Score::Mate(2).normalize(Color::White);
        let mid = Score::Mate(8).normalize(Color::White);
        let far = Score::Mate(15).normalize(Color::White);
        assert!(near > mid && mid > far);
    }

    #[test]
    fn mate_dwarfs_any_centipawn_score() {
        assert!(Score::Mate(30).normalize(Color::White) > Score::Cp(999).normalize(Color::White));
    }

    #[test]
    fn getting_mated_is_negative_before_the_perspective_flip() {
        // "mate -3" while scoring for Black: Black gets mated, which is
        // good for White.
        assert_eq!(Score::Mate(-3).normalize(Color::Black), 99.99);
        assert_eq!(Score::Mate(-3).normalize(Color::White), -99.99);
    }
}
