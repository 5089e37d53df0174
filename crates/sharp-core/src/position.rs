//! Board facade with an explicit undo stack.
//!
//! [`Position`] wraps a [`cozy_chess::Board`] and keeps every prior board
//! state on a stack, so analysis code can speculatively apply moves and
//! restore the exact position afterwards. Move generation and application
//! are the library's; this type only adds the checkpoint discipline.

use cozy_chess::{Board, Color, Move, Piece, Square};
use thiserror::Error;

use crate::fen::{validate_fen, FenError};

/// Errors from constructing or mutating a [`Position`].
#[derive(Debug, Error)]
pub enum PositionError {
    /// The FEN failed the validator; no engine or loader ever saw it.
    #[error("invalid FEN: {0}")]
    InvalidFen(#[from] FenError),

    /// The FEN passed validation but the board loader still refused it.
    #[error("FEN rejected by board loader: {0}")]
    Unparseable(String),

    /// The move is not legal in the current position.
    #[error("illegal move: {0}")]
    IllegalMove(String),
}

/// A chess position with recoverable history.
///
/// `push` applies a legal move while retaining the prior state; `pop`
/// restores it. After N pushes followed by N pops the position is
/// bit-identical to its pre-push state. The stack discipline is strict:
/// the analysis layers rely on it to restore the position after probing
/// candidate moves.
#[derive(Debug, Clone)]
pub struct Position {
    board: Board,
    undo_stack: Vec<Board>,
}

impl Position {
    /// The standard starting position.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Creates the standard starting position.
    pub fn new() -> Self {
        Self {
            board: Board::default(),
            undo_stack: Vec::new(),
        }
    }

    /// Creates a position from a FEN string.
    ///
    /// The string goes through [`validate_fen`] first, so impossible
    /// positions are rejected before the loader trusts its input.
    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        validate_fen(fen)?;
        let board = fen
            .parse::<Board>()
            .map_err(|e| PositionError::Unparseable(e.to_string()))?;
        Ok(Self {
            board,
            undo_stack: Vec::new(),
        })
    }

    /// The current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The current position as a FEN string.
    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    /// The side to move.
    pub fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        !self.board.checkers().is_empty()
    }

    /// The piece on `sq`, if any.
    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.board.piece_on(sq)
    }

    /// The color of the piece on `sq`, if any.
    pub fn color_on(&self, sq: Square) -> Option<Color> {
        self.board.color_on(sq)
    }

    /// All legal moves in the current position, in generator order.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.board.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }

    /// Applies a legal move, keeping the prior state recoverable via
    /// [`pop`](Self::pop).
    pub fn push(&mut self, mv: Move) -> Result<(), PositionError> {
        if !self.legal_moves().contains(&mv) {
            return Err(PositionError::IllegalMove(format!("{mv}")));
        }
        self.undo_stack.push(self.board.clone());
        self.board.play_unchecked(mv);
        Ok(())
    }

    /// Undoes the most recent push. Returns `false` when there is nothing
    /// to undo.
    pub fn pop(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(board) => {
                self.board = board;
                true
            }
            None => false,
        }
    }

    /// Applies `mv`, runs `f`, and restores the position before returning,
    /// on every exit path. This is the checkpoint form the scoring and
    /// line-generation code uses for speculative probing.
    pub fn probe<T>(
        &mut self,
        mv: Move,
        f: impl FnOnce(&mut Position) -> T,
    ) -> Result<T, PositionError> {
        self.push(mv)?;
        let out = f(self);
        self.pop();
        Ok(out)
    }

    /// Applies a sequence of moves in order.
    ///
    /// Stops at the first illegal move, leaving the legally-applied prefix
    /// on the stack.
    pub fn advance(&mut self, moves: &[Move]) -> Result<(), PositionError> {
        for &mv in moves {
            self.push(mv)?;
        }
        Ok(())
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}
