//! Bitboard chess engine library.
//!
//! Provides a complete single-threaded engine with:
//! - Bitboard board representation with a redundant mailbox
//! - Legal move generation validated by perft
//! - Iterative-deepening alpha-beta search with a transposition table
//! - Hand-tuned positional evaluation
//! - Weighted opening-book probing
//!
//! # Quick Start
//!
//! ```
//! use peregrine::board::Board;
//! use peregrine::search::{Engine, EngineConfig};
//!
//! let mut board = Board::new();
//!
//! // Generate all legal moves
//! let moves = board.generate_all_moves();
//! assert_eq!(moves.len(), 20);
//!
//! // Find a move within a 50 ms budget
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.set_time_limit(50);
//! let best = engine.get_move(&mut board);
//! assert!(best.is_some());
//! ```
//!
//! # Building Positions
//!
//! ```
//! use peregrine::board::Board;
//!
//! let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
//!     .unwrap();
//! assert_eq!(board.to_fen(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
//! ```

// Enable pedantic lints with sensible domain-specific exceptions
#![warn(clippy::pedantic)]
// Bitboard hex literals are clearer without separators (bit patterns visible)
#![allow(clippy::unreadable_literal)]
// Chess engines have intentionally similar names (l_rook/r_rook, mg/eg, etc.)
#![allow(clippy::similar_names)]
// Index casts are ubiquitous and safe in chess (board indices, square indices)
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::cast_precision_loss)]
// Attack queries take the full attacker piece sets
#![allow(clippy::too_many_arguments)]
// Module-level documentation is sufficient for this codebase
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod bitboard;
pub mod board;
pub mod book;
pub mod evaluation;
pub mod perft;
pub mod search;
pub mod sync;
pub mod tt;
pub mod types;
pub mod zobrist;
