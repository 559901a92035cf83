//! Zobrist hashing keys.
//!
//! All constants are drawn from a fixed-seed RNG with a uniqueness filter so
//! that every key is nonzero and distinct, and two processes agree on the
//! table bit-for-bit. Hashes produced here key the transposition table, the
//! repetition stack and the opening book, so the layout is a compatibility
//! contract.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ZOBRIST_SEED: u64 = 5259408;

pub struct ZobristKeys {
    /// Indexed by `types::piece_index` (white lowercase 0..6, black 6..12).
    pub piece_square: [[u64; 64]; 12],
    /// One key per castling "moved" flag, XORed in while the flag is false.
    /// Order: white king, white right rook, white left rook, then black.
    pub castling: [u64; 6],
    /// Indexed by the raw file of the en-passant target square (`sq & 7`).
    pub en_passant_file: [u64; 8],
    /// XORed in while White is to move.
    pub side_to_move: u64,
}

pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
    let mut seen = HashSet::new();
    let mut draw = || loop {
        let x: u64 = rng.gen();
        if x != 0 && seen.insert(x) {
            return x;
        }
    };

    let mut piece_square = [[0u64; 64]; 12];
    for row in &mut piece_square {
        for key in row.iter_mut() {
            *key = draw();
        }
    }

    let mut castling = [0u64; 6];
    for key in &mut castling {
        *key = draw();
    }

    let mut en_passant_file = [0u64; 8];
    for key in &mut en_passant_file {
        *key = draw();
    }

    ZobristKeys {
        piece_square,
        castling,
        en_passant_file,
        side_to_move: draw(),
    }
});
