//! Opening book reader.
//!
//! Binary format, little-endian, repeated until EOF:
//!
//! ```text
//! u64 zobrist_key
//! u16 move_count
//! move_count times:
//!     u16 from, u16 to, u16 promotion, u32 weight
//! ```
//!
//! Probing picks a move with probability proportional to its weight. The
//! moves are raw `(from, to, promotion)` triples produced offline; their
//! capture flags are meaningless and `Board::make` derives the real ones.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use log::{info, warn};
use rand::Rng;

use crate::types::Move;

#[derive(Clone, Copy, Debug)]
pub struct BookMove {
    pub mv: Move,
    pub weight: u32,
}

#[derive(Default)]
pub struct OpeningBook {
    entries: HashMap<u64, Vec<BookMove>>,
}

fn read_u16(reader: &mut impl Read) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(reader: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

impl OpeningBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut book = Self::from_reader(BufReader::new(file))?;
        info!(
            "opening book loaded: {} positions from {}",
            book.entries.len(),
            path.display()
        );
        book.entries.shrink_to_fit();
        Ok(book)
    }

    /// Load a book, falling back to an empty one if the file is missing or
    /// unreadable. The engine plays on without a book in that case.
    #[must_use]
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(book) => book,
            Err(err) => {
                warn!("no opening book at {}: {err}", path.display());
                Self::new()
            }
        }
    }

    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut entries: HashMap<u64, Vec<BookMove>> = HashMap::new();

        loop {
            let mut key_buf = [0u8; 8];
            match reader.read_exact(&mut key_buf) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err),
            }
            let key = u64::from_le_bytes(key_buf);
            let count = read_u16(&mut reader)?;

            let moves = entries.entry(key).or_default();
            moves.reserve(count as usize);
            for _ in 0..count {
                let from = read_u16(&mut reader)?;
                let to = read_u16(&mut reader)?;
                let promotion = read_u16(&mut reader)?;
                let weight = read_u32(&mut reader)?;
                if from >= 64 || to >= 64 {
                    continue;
                }
                moves.push(BookMove {
                    mv: Move {
                        from: from as u8,
                        to: to as u8,
                        promotion: promotion as u8,
                        is_capture: false,
                    },
                    weight,
                });
            }
        }

        Ok(OpeningBook { entries })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All book moves for a position, mostly for inspection and tests.
    #[must_use]
    pub fn moves_for(&self, zobrist: u64) -> Option<&[BookMove]> {
        self.entries.get(&zobrist).map(Vec::as_slice)
    }

    /// Weighted random pick among the moves stored for this position.
    #[must_use]
    pub fn probe(&self, zobrist: u64) -> Option<Move> {
        self.probe_with(zobrist, &mut rand::thread_rng())
    }

    /// As `probe`, with an injected RNG so tests can pin the draw.
    pub fn probe_with(&self, zobrist: u64, rng: &mut impl Rng) -> Option<Move> {
        let moves = self.entries.get(&zobrist)?;
        let total: u64 = moves.iter().map(|m| u64::from(m.weight)).sum();
        if total == 0 {
            return None;
        }

        let draw = rng.gen_range(1..=total);
        let mut acc = 0u64;
        for entry in moves {
            acc += u64::from(entry.weight);
            if draw <= acc {
                return Some(entry.mv);
            }
        }
        None
    }
}
