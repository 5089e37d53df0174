//! FEN (Forsyth-Edwards Notation) validation.
//!
//! A fast structural and consistency check over the six FEN fields, run
//! before a string is handed to the board loader. This is not a full
//! legality prover: doubled-pawn geometry and bishops trapped behind
//! unmoved pawns are known gaps and are deliberately not detected.

use thiserror::Error;

/// Errors produced by [`validate_fen`], one variant per violated check class.
///
/// The first violated class wins; later checks are not run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    /// An empty-run digit or piece pushes a rank past 8 files.
    #[error("rank {0} overflows past 8 files")]
    FileOverflow(u8),

    /// Impossible piece counts: more than one king per color, more than 10
    /// queens/rooks/knights, or more than 4 same-square-color bishops.
    #[error("impossible piece count: {0}")]
    PieceConsistency(String),

    /// Pawns on a back rank, more than 6 pawns in one file, or a pawn
    /// structure requiring more captures than the opponent has pieces.
    #[error("illegal position: {0}")]
    IllegalPosition(String),

    /// Structural problems: wrong rank count, bad piece letter, bad
    /// side-to-move token, or garbage in the trailing counters.
    #[error("badly formatted FEN: {0}")]
    BadFormat(String),

    /// A castling-rights letter without the matching king and rook on
    /// their starting squares.
    #[error("castling right '{0}' disagrees with piece placement")]
    InconsistentCastling(char),

    /// En passant target that is not '-' or a file letter plus rank 3/6.
    #[error("invalid en passant square: {0}")]
    InconsistentEnPassant(String),
}

/// Per-color piece tallies collected during the board scan.
#[derive(Default)]
struct SideCount {
    kings: u32,
    queens: u32,
    rooks: u32,
    knights: u32,
    light_bishops: u32,
    dark_bishops: u32,
    /// Pawns per file, a-file first.
    pawns: [u32; 8],
    /// King on its starting square (e1/e8).
    king_home: bool,
    /// Rooks on their starting corners.
    rook_kingside: bool,
    rook_queenside: bool,
}

impl SideCount {
    fn total(&self) -> u32 {
        self.kings
            + self.queens
            + self.rooks
            + self.knights
            + self.light_bishops
            + self.dark_bishops
            + self.pawns.iter().sum::<u32>()
    }
}

/// Minimum opposing captures implied by N own pawns sharing one file.
///
/// Pawns change file only by capturing, so stacked pawns bound how much
/// material the opponent can still have on the board. Edge files need the
/// most exchanges, central files the fewest.
const EXCHANGES_AH: [u32; 7] = [0, 0, 1, 3, 6, 10, 15];
const EXCHANGES_BG: [u32; 7] = [0, 0, 1, 2, 4, 7, 11];
const EXCHANGES_CF: [u32; 7] = [0, 0, 1, 2, 4, 6, 9];

/// Validates a FEN string without loading it into a board.
///
/// Checks, in order: board structure and per-piece caps, pawn placement,
/// captured-material feasibility, side to move, castling-rights
/// consistency, the en passant square, and the trailing counters. Returns
/// the error for the first violated class.
///
/// # Examples
///
/// ```
/// use sharp_core::{validate_fen, FenError};
///
/// assert!(validate_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_ok());
/// assert!(matches!(
///     validate_fen("9/8/8/8/8/8/8/8 w - - 0 1"),
///     Err(FenError::FileOverflow(_))
/// ));
/// ```
pub fn validate_fen(fen: &str) -> Result<(), FenError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(FenError::BadFormat(format!(
            "expected at least 4 fields, got {}",
            fields.len()
        )));
    }

    let (white, black) = scan_board(fields[0])?;

    // Pawn-per-file cap, then the exchange-feasibility tables: every file
    // holding stacked pawns implies captures, and each capture removes an
    // opposing piece from a 16-piece budget.
    for side in [&white, &black] {
        for count in side.pawns {
            if count > 6 {
                return Err(FenError::IllegalPosition(format!(
                    "{count} pawns in one file"
                )));
            }
        }
    }
    let w_total = white.total();
    let b_total = black.total();
    for file in 0..8 {
        let table = match file {
            0 | 7 => &EXCHANGES_AH,
            1 | 6 => &EXCHANGES_BG,
            _ => &EXCHANGES_CF,
        };
        if b_total + table[white.pawns[file] as usize] > 15 {
            return Err(FenError::IllegalPosition(format!(
                "white pawn structure in file {} needs more captures than black has pieces",
                file_letter(file)
            )));
        }
        if w_total + table[black.pawns[file] as usize] > 15 {
            return Err(FenError::IllegalPosition(format!(
                "black pawn structure in file {} needs more captures than white has pieces",
                file_letter(file)
            )));
        }
    }

    match fields[1] {
        "w" | "b" => {}
        other => {
            return Err(FenError::BadFormat(format!(
                "side to move must be 'w' or 'b', got '{other}'"
            )))
        }
    }

    check_castling(fields[2], &white, &black)?;
    check_en_passant(fields[3])?;

    // Halfmove/fullmove counters: digits only. Absent counters are accepted.
    for field in &fields[4..] {
        if !field.chars().all(|c| c.is_ascii_digit()) {
            return Err(FenError::BadFormat(format!("bad move counter '{field}'")));
        }
    }

    Ok(())
}

fn file_letter(file: usize) -> char {
    (b'a' + file as u8) as char
}

/// Scans the piece-placement field, collecting per-side tallies and the
/// king/rook home-square facts needed for the castling check.
fn scan_board(placement: &str) -> Result<(SideCount, SideCount), FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::BadFormat(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    let mut white = SideCount::default();
    let mut black = SideCount::default();

    // FEN lists rank 8 first.
    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i as u8;
        let mut file = 0u32;
        for c in rank_str.chars() {
            if let Some(run) = c.to_digit(10).filter(|&d| d > 0) {
                file += run;
                if file > 8 {
                    return Err(FenError::FileOverflow(rank + 1));
                }
                continue;
            }
            if file >= 8 {
                return Err(FenError::FileOverflow(rank + 1));
            }
            let is_white = c.is_ascii_uppercase();
            let side = if is_white { &mut white } else { &mut black };
            match c.to_ascii_uppercase() {
                'K' => {
                    side.kings += 1;
                    if side.kings > 1 {
                        return Err(FenError::PieceConsistency(format!(
                            "two {} kings",
                            color_name(is_white)
                        )));
                    }
                    let home_rank = if is_white { 0 } else { 7 };
                    if rank == home_rank && file == 4 {
                        side.king_home = true;
                    }
                }
                'P' => {
                    if rank == 0 || rank == 7 {
                        return Err(FenError::IllegalPosition(format!(
                            "pawn on rank {}",
                            rank + 1
                        )));
                    }
                    side.pawns[file as usize] += 1;
                }
                'Q' => {
                    side.queens += 1;
                    if side.queens > 10 {
                        return Err(FenError::PieceConsistency(format!(
                            "more than 10 {} queens",
                            color_name(is_white)
                        )));
                    }
                }
                'R' => {
                    side.rooks += 1;
                    if side.rooks > 10 {
                        return Err(FenError::PieceConsistency(format!(
                            "more than 10 {} rooks",
                            color_name(is_white)
                        )));
                    }
                    let home_rank = if is_white { 0 } else { 7 };
                    if rank == home_rank && file == 0 {
                        side.rook_queenside = true;
                    }
                    if rank == home_rank && file == 7 {
                        side.rook_kingside = true;
                    }
                }
                'N' => {
                    side.knights += 1;
                    if side.knights > 10 {
                        return Err(FenError::PieceConsistency(format!(
                            "more than 10 {} knights",
                            color_name(is_white)
                        )));
                    }
                }
                'B' => {
                    // a1 is dark: file+rank even means dark square.
                    let light = (file + rank as u32) % 2 == 1;
                    let count = if light {
                        side.light_bishops += 1;
                        side.light_bishops
                    } else {
                        side.dark_bishops += 1;
                        side.dark_bishops
                    };
                    if count > 4 {
                        return Err(FenError::PieceConsistency(format!(
                            "more than 4 {} {}-square bishops",
                            color_name(is_white),
                            if light { "light" } else { "dark" }
                        )));
                    }
                }
                other => {
                    return Err(FenError::BadFormat(format!(
                        "invalid piece letter '{other}'"
                    )))
                }
            }
            file += 1;
        }
        if file != 8 {
            return Err(FenError::BadFormat(format!(
                "rank {} covers {} files, expected 8",
                rank + 1,
                file
            )));
        }
    }

    Ok((white, black))
}

fn color_name(is_white: bool) -> &'static str {
    if is_white {
        "white"
    } else {
        "black"
    }
}

/// Each letter present must match a king-on-home-square plus
/// rook-on-starting-corner configuration found during the board scan. A
/// king on its home square makes rights inferable but never forces them,
/// so '-' is always accepted.
fn check_castling(castling: &str, white: &SideCount, black: &SideCount) -> Result<(), FenError> {
    if castling == "-" || castling.is_empty() {
        return Ok(());
    }
    for c in castling.chars() {
        let ok = match c {
            'K' => white.king_home && white.rook_kingside,
            'Q' => white.king_home && white.rook_queenside,
            'k' => black.king_home && black.rook_kingside,
            'q' => black.king_home && black.rook_queenside,
            other => {
                return Err(FenError::BadFormat(format!(
                    "invalid castling character '{other}'"
                )))
            }
        };
        if !ok {
            return Err(FenError::InconsistentCastling(c));
        }
    }
    Ok(())
}

/// '-' or a file letter plus rank 3/6. Direction consistency with the side
/// to move is not cross-checked against the board here.
fn check_en_passant(ep: &str) -> Result<(), FenError> {
    if ep == "-" {
        return Ok(());
    }
    let mut chars = ep.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('a'..='h'), Some('3' | '6'), None) => Ok(()),
        (Some('a'..='h'), _, _) => Err(FenError::InconsistentEnPassant(ep.to_string())),
        _ => Err(FenError::BadFormat(format!("bad en passant field '{ep}'"))),
    }
}
