//! Move notation: long algebraic and short (standard) algebraic.
//!
//! Examples: "e2e4", "e7e8q" (long); "e4", "Nf3", "exd5", "O-O", "c8=Q+",
//! "Nbd2", "R1e1" (short).
//!
//! The move library encodes castling as the king moving onto its own rook
//! (chess960 style), so both encoders rewrite castles to the king's actual
//! landing square: king-side to the g-file, queen-side to the c-file.
//!
//! Both parsers work by re-encoding candidate moves and comparing strings
//! against the legal-move list, so they can only ever return a legal move.
//! A parse with no match returns `None`, the null-move sentinel; the
//! decision to treat that as fatal is the caller's.

use cozy_chess::{File, Move, Piece, Rank, Square};

use crate::position::Position;

/// Reserved long-algebraic string for "no move".
pub const MOVE_NONE_STR: &str = "(none)";
/// Reserved long-algebraic string for the null move.
pub const MOVE_NULL_STR: &str = "0000";

/// Which of the two notations to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotationStyle {
    /// Long algebraic: "e2e4", "e7e8q".
    #[default]
    Long,
    /// Short algebraic: "e4", "Nf3", "O-O".
    Short,
}

impl NotationStyle {
    /// Renders a legal move in this notation.
    pub fn encode(self, pos: &Position, mv: Move) -> String {
        match self {
            NotationStyle::Long => to_long_algebraic(pos, mv),
            NotationStyle::Short => to_short_algebraic(pos, mv),
        }
    }

    /// Parses a move in this notation; `None` when no legal move matches.
    pub fn parse(self, pos: &Position, s: &str) -> Option<Move> {
        match self {
            NotationStyle::Long => parse_long_algebraic(pos, s),
            NotationStyle::Short => parse_short_algebraic(pos, s),
        }
    }
}

fn file_char(file: File) -> char {
    (b'a' + file as u8) as char
}

fn rank_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

fn square_str(sq: Square) -> String {
    let mut s = String::with_capacity(2);
    s.push(file_char(sq.file()));
    s.push(rank_char(sq.rank()));
    s
}

fn char_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => File::try_index(c as usize - 'a' as usize),
        _ => None,
    }
}

fn char_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Rank::try_index(c as usize - '1' as usize),
        _ => None,
    }
}

fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.chars();
    let file = char_file(chars.next()?)?;
    let rank = char_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P', // not used in SAN output
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn letter_piece(c: char) -> Option<Piece> {
    match c.to_ascii_uppercase() {
        'N' => Some(Piece::Knight),
        'B' => Some(Piece::Bishop),
        'R' => Some(Piece::Rook),
        'Q' => Some(Piece::Queen),
        'K' => Some(Piece::King),
        _ => None,
    }
}

fn promo_letter(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        _ => 'q',
    }
}

/// Castling is the only move whose destination holds a friendly piece.
fn is_castle(pos: &Position, mv: Move) -> bool {
    pos.piece_on(mv.from) == Some(Piece::King) && pos.color_on(mv.to) == Some(pos.side_to_move())
}

fn castle_is_kingside(mv: Move) -> bool {
    (mv.to.file() as i8) > (mv.from.file() as i8)
}

/// Converts a move to long algebraic notation ("e2e4", "e7e8q").
///
/// Castles are rewritten from the library's king-takes-rook encoding to
/// the king's landing square ("e1g1" / "e1c1"). The move must be legal in
/// `pos`.
pub fn to_long_algebraic(pos: &Position, mv: Move) -> String {
    let to = if is_castle(pos, mv) {
        let file = if castle_is_kingside(mv) { File::G } else { File::C };
        Square::new(file, mv.from.rank())
    } else {
        mv.to
    };

    let mut s = String::with_capacity(5);
    s.push_str(&square_str(mv.from));
    s.push_str(&square_str(to));
    if let Some(promo) = mv.promotion {
        s.push(promo_letter(promo));
    }
    s
}

/// Parses a long algebraic string against the position's legal moves.
///
/// Matching is done by re-encoding every legal move and comparing strings,
/// so the result is always a legal move. Returns `None` when nothing
/// matches (including the reserved [`MOVE_NONE_STR`] and [`MOVE_NULL_STR`]
/// sentinels, which never match a real move).
pub fn parse_long_algebraic(pos: &Position, input: &str) -> Option<Move> {
    let mut wanted = input.trim().to_string();
    if wanted.len() == 5 && wanted.is_ascii() {
        // The promotion piece letter must be lowercase.
        wanted = format!("{}{}", &wanted[..4], wanted[4..].to_ascii_lowercase());
    }
    pos.legal_moves()
        .into_iter()
        .find(|&mv| to_long_algebraic(pos, mv) == wanted)
}

/// Converts a move to short algebraic notation.
///
/// Produces castling literals, the piece letter (empty for pawns), the
/// minimal disambiguator, 'x' for captures (en passant prints as an
/// ordinary pawn capture), the destination, '=P' for promotions, and a
/// trailing '+' or '#'. The move must be legal in `pos`.
pub fn to_short_algebraic(pos: &Position, mv: Move) -> String {
    if is_castle(pos, mv) {
        let san = if castle_is_kingside(mv) { "O-O" } else { "O-O-O" };
        return add_check_suffix(pos, mv, san.to_string());
    }

    let piece = pos
        .piece_on(mv.from)
        .expect("move has no piece on its origin square");
    // With castling handled above, any occupied destination is a capture;
    // a pawn changing file onto an empty square is en passant.
    let is_capture = pos.piece_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    if piece != Piece::Pawn {
        san.push(piece_letter(piece));
        san.push_str(&disambiguator(pos, mv, piece));
    }
    if is_capture {
        if piece == Piece::Pawn {
            // Pawn captures always carry the origin file.
            san.push(file_char(mv.from.file()));
        }
        san.push('x');
    }
    san.push_str(&square_str(mv.to));
    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(piece_letter(promo));
    }
    add_check_suffix(pos, mv, san)
}

/// Minimal origin marker when several same-typed pieces reach one square:
/// two candidates disambiguate by file when the origin files differ and by
/// rank otherwise; three or more take the full origin square.
fn disambiguator(pos: &Position, mv: Move, piece: Piece) -> String {
    let mut origins: Vec<Square> = Vec::new();
    for other in pos.legal_moves() {
        if other.to == mv.to && pos.piece_on(other.from) == Some(piece) {
            if !origins.contains(&other.from) {
                origins.push(other.from);
            }
        }
    }

    match origins.len() {
        0 | 1 => String::new(),
        2 => {
            let other = origins
                .iter()
                .find(|&&sq| sq != mv.from)
                .copied()
                .expect("two distinct origins");
            if other.file() != mv.from.file() {
                file_char(mv.from.file()).to_string()
            } else {
                rank_char(mv.from.rank()).to_string()
            }
        }
        _ => square_str(mv.from),
    }
}

fn add_check_suffix(pos: &Position, mv: Move, mut san: String) -> String {
    let mut board = pos.board().clone();
    board.play_unchecked(mv);
    if !board.checkers().is_empty() {
        let mut has_reply = false;
        board.generate_moves(|_| {
            has_reply = true;
            true
        });
        san.push(if has_reply { '+' } else { '#' });
    }
    san
}

/// The origin constraint carried by a short-algebraic string, matched in
/// specificity order: file, then rank, then the full square.
#[derive(Debug, Clone, Copy)]
enum Discriminator {
    None,
    File(File),
    Rank(Rank),
    Square(Square),
}

impl Discriminator {
    fn matches(self, origin: Square) -> bool {
        match self {
            Discriminator::None => true,
            Discriminator::File(f) => origin.file() == f,
            Discriminator::Rank(r) => origin.rank() == r,
            Discriminator::Square(sq) => origin == sq,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let chars: Vec<char> = s.chars().collect();
        match chars.as_slice() {
            [] => Some(Discriminator::None),
            [c] => char_file(*c)
                .map(Discriminator::File)
                .or_else(|| char_rank(*c).map(Discriminator::Rank)),
            [f, r] => {
                let file = char_file(*f)?;
                let rank = char_rank(*r)?;
                Some(Discriminator::Square(Square::new(file, rank)))
            }
            _ => None,
        }
    }
}

/// Parses a short algebraic string against the position's legal moves.
///
/// Strips a trailing check marker, handles castling literals directly, and
/// otherwise derives the destination square and origin constraint, then
/// tries every same-color same-type origin as a long-algebraic candidate.
/// The first candidate that round-trips to a legal move and satisfies the
/// constraint wins. Returns `None`, the null-move sentinel, when no
/// candidate does.
pub fn parse_short_algebraic(pos: &Position, input: &str) -> Option<Move> {
    let san = input.trim().trim_end_matches(['+', '#']);
    if san.is_empty() {
        return None;
    }

    if san == "O-O" || san == "0-0" {
        return find_castle(pos, true);
    }
    if san == "O-O-O" || san == "0-0-0" {
        return find_castle(pos, false);
    }

    // Promotions: the origin rank is forced (7th for White, 2nd for
    // Black); the origin file comes from the capture disambiguator when
    // present, else it is the destination file.
    if let Some((body, promo_str)) = san.split_once('=') {
        let promo = letter_piece(promo_str.chars().next()?)?;
        if promo == Piece::King {
            return None;
        }
        let (disc_file, dest) = match body.split_once('x') {
            Some((origin, dest)) => (char_file(origin.chars().next()?)?, parse_square(dest)?),
            None => (parse_square(body)?.file(), parse_square(body)?),
        };
        let from_rank = match pos.side_to_move() {
            cozy_chess::Color::White => Rank::Seventh,
            cozy_chess::Color::Black => Rank::Second,
        };
        let candidate = format!(
            "{}{}{}",
            square_str(Square::new(disc_file, from_rank)),
            square_str(dest),
            promo_letter(promo)
        );
        return parse_long_algebraic(pos, &candidate);
    }

    let chars: Vec<char> = san.chars().collect();
    let (piece, rest) = match letter_piece(chars[0]).filter(|_| chars[0].is_ascii_uppercase()) {
        Some(p) => (p, &chars[1..]),
        None => (Piece::Pawn, &chars[..]),
    };

    // Drop the capture marker; for pawns whatever precedes it is the
    // origin file.
    let has_capture = rest.contains(&'x');
    let rest: Vec<char> = rest.iter().copied().filter(|&c| c != 'x').collect();
    if rest.len() < 2 {
        return None;
    }

    let dest_str: String = rest[rest.len() - 2..].iter().collect();
    let dest = parse_square(&dest_str)?;
    let disc_str: String = rest[..rest.len() - 2].iter().collect();
    let disc = if disc_str.is_empty() && piece == Piece::Pawn && !has_capture {
        // A quiet pawn move's origin shares the destination file.
        Discriminator::File(dest.file())
    } else {
        Discriminator::parse(&disc_str)?
    };

    // Candidate origins are the side-to-move's pieces of the right type;
    // legality filtering happens in the round-trip.
    let board = pos.board();
    let origins = board.pieces(piece) & board.colors(pos.side_to_move());
    for origin in origins {
        if !disc.matches(origin) {
            continue;
        }
        let candidate = format!("{}{}", square_str(origin), square_str(dest));
        if let Some(mv) = parse_long_algebraic(pos, &candidate) {
            return Some(mv);
        }
    }
    None
}

fn find_castle(pos: &Position, kingside: bool) -> Option<Move> {
    pos.legal_moves()
        .into_iter()
        .find(|&mv| is_castle(pos, mv) && castle_is_kingside(mv) == kingside)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).expect("valid test FEN")
    }

    fn long(pos: &Position, s: &str) -> Move {
        parse_long_algebraic(pos, s).expect("legal move")
    }

    #[test]
    fn startpos_e4() {
        let p = Position::new();
        let mv = long(&p, "e2e4");
        assert_eq!(to_long_algebraic(&p, mv), "e2e4");
        assert_eq!(to_short_algebraic(&p, mv), "e4");
        assert_eq!(parse_short_algebraic(&p, "e4"), Some(mv));
    }

    #[test]
    fn startpos_knight() {
        let p = Position::new();
        let mv = long(&p, "g1f3");
        assert_eq!(to_short_algebraic(&p, mv), "Nf3");
        assert_eq!(parse_short_algebraic(&p, "Nf3"), Some(mv));
    }

    #[test]
    fn no_match_returns_none() {
        let p = Position::new();
        assert_eq!(parse_long_algebraic(&p, "e2e5"), None);
        assert_eq!(parse_short_algebraic(&p, "Qh5"), None);
        assert_eq!(parse_long_algebraic(&p, MOVE_NONE_STR), None);
        assert_eq!(parse_long_algebraic(&p, MOVE_NULL_STR), None);
    }

    #[test]
    fn castling_both_sides() {
        let p = pos("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1");

        let short = parse_short_algebraic(&p, "O-O").expect("kingside castle");
        assert_eq!(to_long_algebraic(&p, short), "e1g1");
        assert_eq!(to_short_algebraic(&p, short), "O-O");

        let long_side = parse_short_algebraic(&p, "O-O-O").expect("queenside castle");
        assert_eq!(to_long_algebraic(&p, long_side), "e1c1");
        assert_eq!(to_short_algebraic(&p, long_side), "O-O-O");

        // The king-landing-square form parses back to the same moves.
        assert_eq!(parse_long_algebraic(&p, "e1g1"), Some(short));
        assert_eq!(parse_long_algebraic(&p, "e1c1"), Some(long_side));
    }

    #[test]
    fn zero_castling_literals() {
        let p = pos("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R b KQkq - 0 1");
        assert_eq!(
            parse_short_algebraic(&p, "0-0"),
            parse_short_algebraic(&p, "O-O")
        );
    }

    #[test]
    fn two_knights_disambiguate_by_file() {
        let p = pos("k7/8/8/8/8/2N3N1/8/K7 w - - 0 1");
        let mv = long(&p, "c3e4");
        let san = to_short_algebraic(&p, mv);
        assert_eq!(san, "Nce4");
        assert_eq!(parse_short_algebraic(&p, "Nce4"), Some(mv));

        let other = long(&p, "g3e4");
        assert_eq!(to_short_algebraic(&p, other), "Nge4");
    }

    #[test]
    fn two_knights_same_file_disambiguate_by_rank() {
        let p = pos("7k/2N5/8/8/8/2N5/8/K7 w - - 0 1");
        let mv = long(&p, "c3b5");
        assert_eq!(to_short_algebraic(&p, mv), "N3b5");
        assert_eq!(parse_short_algebraic(&p, "N3b5"), Some(mv));
        let other = long(&p, "c7b5");
        assert_eq!(to_short_algebraic(&p, other), "N7b5");
    }

    #[test]
    fn three_rooks_take_the_full_origin_square() {
        let p = pos("8/1k6/8/8/R6R/8/8/3R3K w - - 0 1");
        let mv = long(&p, "a4d4");
        assert_eq!(to_short_algebraic(&p, mv), "Ra4d4");
        assert_eq!(parse_short_algebraic(&p, "Ra4d4"), Some(mv));
        assert_eq!(parse_short_algebraic(&p, "Rh4d4"), Some(long(&p, "h4d4")));
        assert_eq!(parse_short_algebraic(&p, "Rd1d4"), Some(long(&p, "d1d4")));
    }

    #[test]
    fn pawn_capture_carries_origin_file() {
        let p = pos("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let mv = long(&p, "e4d5");
        assert_eq!(to_short_algebraic(&p, mv), "exd5");
        assert_eq!(parse_short_algebraic(&p, "exd5"), Some(mv));
    }

    #[test]
    fn en_passant_prints_as_plain_pawn_capture() {
        let p = pos("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
        let mv = long(&p, "e5d6");
        assert_eq!(to_short_algebraic(&p, mv), "exd6");
        assert_eq!(parse_short_algebraic(&p, "exd6"), Some(mv));
    }

    #[test]
    fn promotion_with_check_suffix() {
        let p = pos("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let mv = long(&p, "a7a8q");
        assert_eq!(to_long_algebraic(&p, mv), "a7a8q");
        assert_eq!(to_short_algebraic(&p, mv), "a8=Q+");
        assert_eq!(parse_short_algebraic(&p, "a8=Q+"), Some(mv));
        assert_eq!(parse_short_algebraic(&p, "a8=Q"), Some(mv));
    }

    #[test]
    fn underpromotion_capture() {
        let p = pos("1r2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let mv = long(&p, "a7b8n");
        assert_eq!(to_short_algebraic(&p, mv), "axb8=N");
        assert_eq!(parse_short_algebraic(&p, "axb8=N"), Some(mv));
    }

    #[test]
    fn uppercase_promotion_letter_is_lowered() {
        let p = pos("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(
            parse_long_algebraic(&p, "a7a8Q"),
            parse_long_algebraic(&p, "a7a8q")
        );
    }

    #[test]
    fn checkmate_gets_the_mate_suffix() {
        // Back-rank mate: Ra8#.
        let p = pos("4k3/8/4K3/8/8/8/8/R7 w - - 0 1");
        let mv = long(&p, "a1a8");
        assert_eq!(to_short_algebraic(&p, mv), "Ra8#");
        assert_eq!(parse_short_algebraic(&p, "Ra8#"), Some(mv));
    }

    #[test]
    fn every_legal_startpos_move_round_trips() {
        let p = Position::new();
        for mv in p.legal_moves() {
            let long_str = to_long_algebraic(&p, mv);
            assert_eq!(parse_long_algebraic(&p, &long_str), Some(mv), "{long_str}");
            let short_str = to_short_algebraic(&p, mv);
            assert_eq!(
                parse_short_algebraic(&p, &short_str),
                Some(mv),
                "{short_str}"
            );
        }
    }
}

#[cfg(test)]
mod round_trip {
    use super::*;
    use proptest::prelude::*;

    /// Plays out a pseudo-random game, steering each step by an index into
    /// the legal-move list.
    fn playout(steps: &[u8]) -> Position {
        let mut pos = Position::new();
        for &step in steps {
            let moves = pos.legal_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[step as usize % moves.len()];
            pos.push(mv).expect("generated move is legal");
        }
        pos
    }

    proptest! {
        #[test]
        fn long_and_short_round_trip(steps in prop::collection::vec(any::<u8>(), 0..40)) {
            let pos = playout(&steps);
            for mv in pos.legal_moves() {
                let long_str = to_long_algebraic(&pos, mv);
                prop_assert_eq!(parse_long_algebraic(&pos, &long_str), Some(mv));
                let short_str = to_short_algebraic(&pos, mv);
                prop_assert_eq!(parse_short_algebraic(&pos, &short_str), Some(mv));
            }
        }

        #[test]
        fn push_pop_restores_the_position(steps in prop::collection::vec(any::<u8>(), 1..30)) {
            let mut pos = playout(&steps);
            let before = pos.fen();
            let mut pushed = 0;
            for &step in &steps {
                let moves = pos.legal_moves();
                if moves.is_empty() {
                    break;
                }
                pos.push(moves[step as usize % moves.len()]).unwrap();
                pushed += 1;
            }
            for _ in 0..pushed {
                prop_assert!(pos.pop());
            }
            prop_assert_eq!(pos.fen(), before);
        }
    }
}
