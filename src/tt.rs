//! Transposition table.
//!
//! A power-of-two array of fixed-size entries indexed by `key & mask`.
//! Replacement prefers new information: a slot is overwritten when the key
//! differs, the new search is deeper, or the new score is exact.
//!
//! Mate scores are stored ply-adjusted so that "mate in N" reads the same
//! from every ply that reaches the position; forgetting this causes mate
//! scores to oscillate between probes at different depths.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use log::{info, warn};

use crate::evaluation::MATE_THRESHOLD;
use crate::types::Move;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtFlag {
    /// Score is exact.
    Exact,
    /// Score is at least this value (beta cutoff).
    Lower,
    /// Score is at most this value (no move exceeded alpha).
    Upper,
    /// Seeded opening-book entry; the move is usable, the score is not.
    Book,
}

#[derive(Clone, Copy, Debug)]
pub struct TtEntry {
    pub key: u64,
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: i16,
    pub flag: TtFlag,
}

impl Default for TtEntry {
    fn default() -> Self {
        TtEntry {
            key: 0,
            best_move: None,
            score: 0,
            depth: -1,
            flag: TtFlag::Exact,
        }
    }
}

/// Adjust a score for storage: mate scores become ply-independent.
#[inline]
#[must_use]
pub fn score_to_tt(score: i32, ply: i32) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply
    } else if score < -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

/// Re-anchor a stored mate score at the probing ply.
#[inline]
#[must_use]
pub fn score_from_tt(score: i32, ply: i32) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply
    } else if score < -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

pub struct TranspositionTable {
    table: Vec<TtEntry>,
    mask: u64,
}

impl TranspositionTable {
    /// Allocate with the largest power-of-two entry count that fits `mb`
    /// megabytes, so the index mask stays valid.
    #[must_use]
    pub fn new(mb: u64) -> Self {
        let entry_size = std::mem::size_of::<TtEntry>() as u64;
        let entries = ((mb * 1024 * 1024) / entry_size).max(1024);

        let mut pow2: u64 = 1;
        while pow2 << 1 <= entries {
            pow2 <<= 1;
        }

        TranspositionTable {
            table: vec![TtEntry::default(); pow2 as usize],
            mask: pow2 - 1,
        }
    }

    pub fn resize(&mut self, mb: u64) {
        *self = TranspositionTable::new(mb);
    }

    pub fn clear(&mut self) {
        for entry in &mut self.table {
            *entry = TtEntry::default();
        }
    }

    #[inline]
    fn index(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    /// The entry stored for `key`, if its full key matches.
    #[must_use]
    pub fn probe(&self, key: u64) -> Option<&TtEntry> {
        let entry = &self.table[self.index(key)];
        (entry.key == key && entry.depth >= 0).then_some(entry)
    }

    /// Store an entry. `score` must already be ply-adjusted via
    /// `score_to_tt`.
    pub fn store(&mut self, key: u64, score: i32, flag: TtFlag, best_move: Option<Move>, depth: i16) {
        let index = self.index(key);
        let entry = &mut self.table[index];
        if entry.key != key || depth > entry.depth || flag == TtFlag::Exact {
            *entry = TtEntry {
                key,
                best_move,
                score,
                depth,
                flag,
            };
        }
    }

    /// Pre-seed the table with book entries from a binary dump: repeated
    /// records of `u64 key, u16 from, u16 to, u16 promotion`, little-endian.
    /// Entries are tagged `TtFlag::Book` at depth 0.
    pub fn seed_book_entries(&mut self, path: &Path) -> io::Result<usize> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        let mut loaded = 0;
        let mut offset = 0;
        while offset + 14 <= data.len() {
            let key = u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap());
            let from = u16::from_le_bytes(data[offset + 8..offset + 10].try_into().unwrap());
            let to = u16::from_le_bytes(data[offset + 10..offset + 12].try_into().unwrap());
            let promo = u16::from_le_bytes(data[offset + 12..offset + 14].try_into().unwrap());
            offset += 14;

            if key == 0 || from >= 64 || to >= 64 {
                continue;
            }
            let mv = Move {
                from: from as u8,
                to: to as u8,
                promotion: promo as u8,
                is_capture: false,
            };
            self.store(key, 0, TtFlag::Book, Some(mv), 0);
            loaded += 1;
        }

        info!("seeded {loaded} book entries into the transposition table");
        Ok(loaded)
    }

    /// Like `seed_book_entries`, but a missing or unreadable file is not an
    /// error; it just leaves the table unseeded.
    pub fn seed_book_entries_or_ignore(&mut self, path: &Path) {
        if let Err(err) = self.seed_book_entries(path) {
            warn!("no book seed loaded from {}: {err}", path.display());
        }
    }
}
