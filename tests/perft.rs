//! Perft regression suite: node, capture, leaf-check and leaf-mate counts
//! for the standard validation positions. Every number must match exactly;
//! the deepest runs are `#[ignore]`d for everyday test runs and enabled with
//! `cargo test --release -- --ignored`.

use peregrine::board::Board;
use peregrine::perft::{perft, PerftCounts};

fn expect(fen: &str, depth: u32, nodes: u64, captures: u64, checks: u64, mates: u64) {
    let mut board = Board::from_fen(fen).expect("valid FEN");
    let got = perft(&mut board, depth);
    let want = PerftCounts {
        nodes,
        captures,
        checks,
        mates,
    };
    assert_eq!(got, want, "perft({depth}) mismatch for {fen}");
}

const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
const PROMOTIONS: &str = "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1";

#[test]
fn startpos_shallow() {
    expect(STARTPOS, 1, 20, 0, 0, 0);
    expect(STARTPOS, 2, 400, 0, 0, 0);
    expect(STARTPOS, 3, 8_902, 34, 12, 0);
}

#[test]
fn startpos_depth_4() {
    expect(STARTPOS, 4, 197_281, 1_576, 469, 8);
}

#[test]
#[ignore = "several million nodes; run with --ignored in release"]
fn startpos_depth_5() {
    expect(STARTPOS, 5, 4_865_609, 82_719, 27_351, 347);
}

#[test]
fn kiwipete_shallow() {
    expect(KIWIPETE, 1, 48, 8, 0, 0);
    expect(KIWIPETE, 2, 2_039, 351, 3, 0);
    expect(KIWIPETE, 3, 97_862, 17_102, 993, 1);
}

#[test]
#[ignore = "several million nodes; run with --ignored in release"]
fn kiwipete_depth_4() {
    expect(KIWIPETE, 4, 4_085_603, 757_163, 25_523, 43);
}

#[test]
fn endgame_shallow() {
    expect(ENDGAME, 1, 14, 1, 2, 0);
    expect(ENDGAME, 2, 191, 14, 10, 0);
    expect(ENDGAME, 3, 2_812, 209, 267, 0);
    expect(ENDGAME, 4, 43_238, 3_348, 1_680, 17);
}

#[test]
fn endgame_depth_5() {
    expect(ENDGAME, 5, 674_624, 52_051, 52_950, 0);
}

#[test]
#[ignore = "several million nodes; run with --ignored in release"]
fn endgame_depth_6() {
    expect(ENDGAME, 6, 11_030_083, 940_350, 452_473, 2_733);
}

#[test]
fn promotions_shallow() {
    expect(PROMOTIONS, 1, 6, 0, 0, 0);
    expect(PROMOTIONS, 2, 264, 87, 10, 0);
    expect(PROMOTIONS, 3, 9_467, 1_021, 38, 22);
}

#[test]
fn promotions_depth_4() {
    expect(PROMOTIONS, 4, 422_333, 131_393, 15_492, 5);
}

#[test]
#[ignore = "several million nodes; run with --ignored in release"]
fn promotions_depth_5() {
    expect(PROMOTIONS, 5, 15_833_292, 2_046_173, 200_568, 50_562);
}
