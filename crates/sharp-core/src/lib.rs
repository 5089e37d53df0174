//! Core types for chess position analysis.
//!
//! This crate provides the foundation the analysis layers build on:
//! - FEN validation ([`validate_fen`]) that rejects impossible positions
//!   before they reach the board loader
//! - [`Position`] - a board facade with an explicit undo stack for
//!   speculative move probing
//! - Move notation ([`to_long_algebraic`], [`to_short_algebraic`] and the
//!   matching parsers) - lossless translation between moves and
//!   long/short algebraic strings
//!
//! Move generation itself is delegated to [`cozy_chess`]; this crate never
//! reimplements chess rules.

mod fen;
mod notation;
mod position;

pub use fen::{validate_fen, FenError};
pub use notation::{
    parse_long_algebraic, parse_short_algebraic, to_long_algebraic, to_short_algebraic,
    NotationStyle, MOVE_NONE_STR, MOVE_NULL_STR,
};
pub use position::{Position, PositionError};

pub use cozy_chess::{Color, Move, Piece, Square};
