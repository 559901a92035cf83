//! Randomized board invariants.
//!
//! Random legal walks from assorted positions check that make/undo restores
//! the position bit-for-bit, that the incremental hash always equals the
//! from-scratch hash, that the occupancy/mailbox/bitboard views agree, that
//! no generated move leaves the mover's king in check, and that FEN
//! round-trips.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use peregrine::board::Board;

const WALK_FENS: [&str; 5] = [
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
    "rnbqkbnr/ppp1pppp/8/8/3pP3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
];

fn random_walk(seed: u64, fen: &str, plies: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut board = Board::from_fen(fen).expect("valid FEN");

    for _ in 0..plies {
        let mover_is_white = board.white_to_move;
        let moves = board.generate_all_moves();
        if moves.is_empty() {
            break;
        }

        let snapshot = board.clone();
        let hash_before = board.hash();

        // Every generated move must leave the mover's king safe, and
        // make followed by undo must restore the exact position.
        for m in &moves {
            let mut mv = *m;
            let undo = board.make(&mut mv);
            assert!(
                !board.in_check(mover_is_white),
                "move {mv} leaves own king in check in {fen}"
            );
            assert!(board.is_consistent(), "desync after {mv}");
            board.undo(&mv, &undo);
            assert_eq!(board, snapshot, "undo of {mv} did not restore state");
            assert_eq!(board.hash(), hash_before);
        }

        // Walk one random move forward.
        let mut mv = moves[rng.gen_range(0..moves.len())];
        board.make(&mut mv);
        assert!(board.is_consistent());
        assert_eq!(board.hash(), board.hash_from_scratch());

        // FEN round-trips through parsing.
        let fen_out = board.to_fen();
        let reparsed = Board::from_fen(&fen_out).expect("own FEN parses");
        assert_eq!(reparsed.to_fen(), fen_out);
        assert_eq!(reparsed.piece_at(0), board.piece_at(0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn random_walks_preserve_invariants(seed in any::<u64>(), which in 0usize..5) {
        random_walk(seed, WALK_FENS[which], 48);
    }
}

#[test]
fn null_move_walk_preserves_hash() {
    let mut board = Board::from_fen(WALK_FENS[1]).unwrap();
    for _ in 0..8 {
        let before = board.clone();
        let undo = board.make_null();
        assert_eq!(board.hash(), board.hash_from_scratch());
        board.undo_null(&undo);
        assert_eq!(board, before);

        let mut moves = board.generate_all_moves();
        if moves.is_empty() {
            break;
        }
        let mut mv = moves.swap_remove(0);
        board.make(&mut mv);
    }
}

#[test]
fn repetition_scan_respects_irreversible_boundary() {
    let mut board = Board::new();
    // Two knight shuffles reach the start position for the third time.
    for _ in 0..2 {
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            board.make_uci_move(uci).unwrap();
        }
    }
    assert!(board.is_threefold_repetition());

    // A pawn move is irreversible; the old repetitions no longer count.
    board.make_uci_move("e2e4").unwrap();
    assert!(!board.is_threefold_repetition());
}
