//! Iterative-deepening alpha-beta search.
//!
//! Negamax with principal-variation search, a transposition table with
//! mate-distance-adjusted scores, null-move pruning, check extensions, late
//! move reductions, killer and history move ordering, and a quiescence
//! search that resolves captures (and all evasions when in check).
//!
//! The search runs on the calling thread. Cancellation is cooperative: the
//! wall clock and a shared stop flag are polled on a node-counter mask, and
//! a timed-out subtree reports `None`, which callers propagate with `?`
//! without updating any table or best-move state. The last fully completed
//! depth wins.

use std::path::Path;
use std::time::{Duration, Instant};

use log::debug;

use crate::board::Board;
use crate::book::OpeningBook;
use crate::evaluation::{evaluate, PieceValues, MATE_SCORE, MATE_THRESHOLD};
use crate::sync::StopFlag;
use crate::tt::{score_from_tt, score_to_tt, TranspositionTable, TtFlag};
use crate::types::{move_to_uci, piece_exchange_value, piece_index, Move, BISHOP, KNIGHT, QUEEN, ROOK};

const MAX_PLY: usize = 128;
const INF: i32 = 999_999;
const ASPIRATION_WINDOW: i32 = 50;
/// The clock is polled every 2048 nodes.
const TIME_CHECK_MASK: u64 = 2047;

/// Structural and tuning switches. Every switch is honored by the search, so
/// features can be disabled individually for testing and engine-vs-engine
/// comparison.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    pub time_limit_ms: u64,
    pub use_opening_book: bool,
    pub use_tt: bool,
    pub use_null_move: bool,
    pub use_lmr: bool,
    pub use_killer_moves: bool,
    pub use_history: bool,
    /// Also search quiet checking moves in quiescence.
    pub quiescence_include_checks: bool,
    pub extend_checks: bool,
    pub max_extensions_per_line: i32,
    pub max_depth: i32,
    pub tt_size_mb: u64,
    pub values: PieceValues,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            time_limit_ms: 300,
            use_opening_book: true,
            use_tt: true,
            use_null_move: true,
            use_lmr: true,
            use_killer_moves: true,
            use_history: true,
            quiescence_include_checks: false,
            extend_checks: true,
            max_extensions_per_line: 3,
            max_depth: 100,
            tt_size_mb: 64,
            values: PieceValues::default(),
        }
    }
}

/// Draw score inside the search: slightly negative for the root side so a
/// winning engine does not shuffle into repetitions. The root side is to
/// move at even plies.
#[inline]
fn draw_score(ply: i32) -> i32 {
    if ply % 2 == 0 {
        -5
    } else {
        5
    }
}

/// Null-move pruning needs real material on the board, or zugzwang makes the
/// "free tempo" assumption unsound: at least two minor-equivalents, counting
/// rooks and queens double.
fn null_move_viable(board: &Board) -> bool {
    let us = board.side_index();
    let p = &board.pieces[us];
    p[BISHOP].count_ones() + p[KNIGHT].count_ones()
        + 2 * (p[ROOK].count_ones() + p[QUEEN].count_ones())
        >= 2
}

pub struct Engine {
    cfg: EngineConfig,
    tt: TranspositionTable,
    book: Option<OpeningBook>,
    stop: StopFlag,
    deadline: Instant,
    nodes: u64,
    killers: [[Option<Move>; 2]; MAX_PLY],
    history: [[i64; 64]; 12],
    max_history: i64,
    last_depth: i32,
    last_nodes: u64,
    last_eval: i32,
}

impl Engine {
    #[must_use]
    pub fn new(cfg: EngineConfig) -> Self {
        let mut engine = Engine {
            cfg,
            tt: TranspositionTable::new(cfg.tt_size_mb),
            book: None,
            stop: StopFlag::new(),
            deadline: Instant::now(),
            nodes: 0,
            killers: [[None; 2]; MAX_PLY],
            history: [[0; 64]; 12],
            max_history: 1 << 16,
            last_depth: 0,
            last_nodes: 0,
            last_eval: 0,
        };
        engine.new_game();
        engine
    }

    /// Clear per-game state: transposition table, killers, history. The
    /// position is owned by the caller and not touched.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.killers = [[None; 2]; MAX_PLY];
        self.history = [[0; 64]; 12];
        self.max_history = 1 << 16;
    }

    pub fn set_time_limit(&mut self, ms: u64) {
        self.cfg.time_limit_ms = ms.clamp(1, 20_000);
    }

    #[must_use]
    pub fn time_limit(&self) -> u64 {
        self.cfg.time_limit_ms
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.cfg
    }

    pub fn set_book(&mut self, book: OpeningBook) {
        self.book = Some(book);
    }

    /// Load `opening_book.bin`-format data; a missing file leaves the engine
    /// bookless but playable.
    pub fn load_book(&mut self, path: &Path) {
        self.book = Some(OpeningBook::load_or_empty(path));
    }

    /// Pre-seed the transposition table from a book dump, if present.
    pub fn seed_tt_book(&mut self, path: &Path) {
        self.tt.seed_book_entries_or_ignore(path);
    }

    /// A clone of the stop flag; `stop()` on it cancels an in-flight search
    /// from another thread.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    #[must_use]
    pub fn last_search_depth(&self) -> i32 {
        self.last_depth
    }

    #[must_use]
    pub fn last_search_nodes(&self) -> u64 {
        self.last_nodes
    }

    #[must_use]
    pub fn last_eval(&self) -> i32 {
        self.last_eval
    }

    #[inline]
    fn out_of_time(&self) -> bool {
        self.stop.is_stopped() || Instant::now() >= self.deadline
    }

    /// Count a node; every `TIME_CHECK_MASK + 1` nodes, poll the clock.
    #[inline]
    fn node_tick(&mut self) -> bool {
        self.nodes += 1;
        self.nodes & TIME_CHECK_MASK == 0 && self.out_of_time()
    }

    // ------------------------------------------------------------------
    // Heuristic bookkeeping
    // ------------------------------------------------------------------

    fn is_killer(&self, mv: &Move, ply: i32) -> bool {
        if !self.cfg.use_killer_moves {
            return false;
        }
        let ply = ply as usize;
        ply < MAX_PLY && (self.killers[ply][0] == Some(*mv) || self.killers[ply][1] == Some(*mv))
    }

    fn record_killer(&mut self, mv: &Move, ply: i32) {
        if !self.cfg.use_killer_moves || mv.is_capture {
            return;
        }
        let ply = ply as usize;
        if ply >= MAX_PLY {
            return;
        }
        if self.killers[ply][0] != Some(*mv) {
            self.killers[ply][1] = self.killers[ply][0];
            self.killers[ply][0] = Some(*mv);
        }
    }

    fn update_history(&mut self, board: &Board, mv: &Move, bonus: i32) {
        if !self.cfg.use_history {
            return;
        }
        let idx = piece_index(board.piece_at(mv.from as usize));
        let to = mv.to as usize;
        let value = (self.history[idx][to] + i64::from(bonus)).clamp(0, self.max_history);
        self.history[idx][to] = value;

        // At the cap, double the cap and halve everything; relative order
        // survives and nothing overflows.
        if value >= self.max_history {
            self.max_history <<= 1;
            for row in &mut self.history {
                for entry in row.iter_mut() {
                    *entry >>= 1;
                }
            }
        }
    }

    /// Stage the move list: hash move, then good captures and promotions by
    /// victim-minus-attacker (promotions add the promoted piece's value),
    /// then killers, then quiets by history. Bad captures sink to the end.
    fn order_moves(&self, board: &Board, moves: Vec<Move>, hash_move: Option<Move>, ply: i32) -> Vec<Move> {
        let top = self.max_history;
        let mut scored: Vec<(i64, Move)> = Vec::with_capacity(moves.len());

        for mv in moves {
            let score = if hash_move == Some(mv) {
                top + 1_000_000
            } else if mv.is_capture || mv.is_promotion() {
                let gain = i64::from(board.capture_gain(&mv));
                if mv.is_capture && gain < 0 {
                    -1_000_000 + gain
                } else {
                    let mut s = top + 1 + gain;
                    if mv.is_promotion() {
                        s += i64::from(piece_exchange_value(mv.promotion));
                    }
                    s
                }
            } else if self.is_killer(&mv, ply) {
                top
            } else if self.cfg.use_history {
                self.history[piece_index(board.piece_at(mv.from as usize))][mv.to as usize]
            } else {
                0
            };
            scored.push((score, mv));
        }

        scored.sort_by_key(|(score, _)| -score);
        scored.into_iter().map(|(_, mv)| mv).collect()
    }

    // ------------------------------------------------------------------
    // Quiescence
    // ------------------------------------------------------------------

    /// Resolve tactics at the horizon. In check this is a full node (all
    /// evasions); otherwise stand pat on the static eval and search captures
    /// and promotions (plus quiet checks when configured). Returns `None`
    /// when the search ran out of time.
    fn quiescence(&mut self, board: &mut Board, mut alpha: i32, beta: i32, ply: i32) -> Option<i32> {
        if self.node_tick() {
            return None;
        }

        if ply > 0 && board.is_threefold_repetition() {
            return Some(draw_score(ply));
        }

        let in_check = board.in_check(board.white_to_move);
        let legal = board.generate_all_moves();
        if legal.is_empty() {
            return Some(if in_check {
                -(MATE_SCORE - ply)
            } else {
                draw_score(ply)
            });
        }

        if !in_check {
            let stand_pat = evaluate(board, &self.cfg.values);
            if stand_pat >= beta {
                return Some(stand_pat);
            }
            alpha = alpha.max(stand_pat);
        }

        let mut candidates: Vec<(i32, Move)> = Vec::with_capacity(legal.len());
        for mv in legal {
            let mut include = in_check;
            let mut order = 0;

            if !in_check {
                include = mv.is_capture || mv.is_promotion();
                if !include && self.cfg.quiescence_include_checks {
                    let mut probe = mv;
                    let undo = board.make(&mut probe);
                    let gives_check = board.in_check(board.white_to_move);
                    board.undo(&probe, &undo);
                    if gives_check {
                        include = true;
                        order += 50;
                    }
                }
            }
            if !include {
                continue;
            }

            if mv.is_promotion() {
                order += piece_exchange_value(mv.promotion);
            }
            if mv.is_capture {
                order += board.capture_gain(&mv);
            }
            candidates.push((order, mv));
        }

        if candidates.is_empty() {
            return Some(alpha);
        }
        candidates.sort_by_key(|(order, _)| -order);

        for (_, m) in candidates {
            let mut mv = m;
            let undo = board.make(&mut mv);
            let result = self.quiescence(board, -beta, -alpha, ply + 1);
            board.undo(&mv, &undo);

            let score = -(result?);
            if score >= beta {
                return Some(score);
            }
            alpha = alpha.max(score);
        }

        Some(alpha)
    }

    // ------------------------------------------------------------------
    // Main search
    // ------------------------------------------------------------------

    /// Negamax with PVS. Returns `(score, best_move)` from the side to
    /// move's perspective, or `None` when the deadline passed; a `None` must
    /// not update any caller state.
    fn search(
        &mut self,
        board: &mut Board,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: i32,
        total_extensions: i32,
        last_was_null: bool,
    ) -> Option<(i32, Option<Move>)> {
        if self.node_tick() {
            return None;
        }

        // Mate-distance pruning: no line from here can beat an already
        // proven shorter mate.
        alpha = alpha.max(-MATE_SCORE + ply);
        beta = beta.min(MATE_SCORE - ply);
        if alpha >= beta {
            return Some((alpha, None));
        }

        if depth <= 0 {
            return Some((self.quiescence(board, alpha, beta, ply)?, None));
        }

        if ply > 0 && !last_was_null && board.is_threefold_repetition() {
            return Some((draw_score(ply), None));
        }

        let original_alpha = alpha;
        let key = board.hash();

        let mut hash_move: Option<Move> = None;
        if self.cfg.use_tt {
            if let Some(entry) = self.tt.probe(key) {
                hash_move = entry.best_move;
                if entry.flag != TtFlag::Book && i32::from(entry.depth) >= depth {
                    let tt_score = score_from_tt(entry.score, ply);
                    match entry.flag {
                        TtFlag::Exact => return Some((tt_score, entry.best_move)),
                        TtFlag::Lower => alpha = alpha.max(tt_score),
                        TtFlag::Upper => beta = beta.min(tt_score),
                        TtFlag::Book => {}
                    }
                    if alpha >= beta {
                        return Some((tt_score, entry.best_move));
                    }
                }
            }
        }

        let in_check = board.in_check(board.white_to_move);

        let moves = board.generate_all_moves();
        if moves.is_empty() {
            return Some(if in_check {
                (-(MATE_SCORE - ply), None)
            } else {
                (draw_score(ply), None)
            });
        }

        // Null-move pruning: hand the opponent a free tempo at reduced
        // depth; if they still cannot reach beta, this node will not either.
        let mut extension_base = 0;
        if self.cfg.use_null_move
            && !in_check
            && !last_was_null
            && ply > 0
            && depth >= 3
            && beta.abs() < MATE_THRESHOLD
            && null_move_viable(board)
        {
            let r = 2 + depth / 3;
            let undo = board.make_null();
            let result = self.search(
                board,
                depth - 1 - r,
                -beta,
                -beta + 1,
                ply + 1,
                total_extensions,
                true,
            );
            board.undo_null(&undo);

            let (child, _) = result?;
            let null_score = -child;
            if null_score >= beta {
                return Some((null_score, None));
            }
            // A null search landing far below alpha hints at a threat
            // against us; look one ply deeper near the horizon.
            if total_extensions < self.cfg.max_extensions_per_line
                && depth <= 3
                && null_score + 100 <= alpha
            {
                extension_base = 1;
            }
        }

        let ordered = self.order_moves(board, moves, hash_move, ply);

        let mut best_score = -1_000_000;
        let mut best_move: Option<Move> = None;
        let mut quiets_tried: Vec<Move> = Vec::with_capacity(16);

        for (index, m) in ordered.iter().enumerate() {
            let mut mv = *m;
            let quiet = !mv.is_capture && !mv.is_promotion();
            if quiet {
                quiets_tried.push(mv);
            }

            let undo = board.make(&mut mv);

            let mut ext = extension_base;
            if self.cfg.extend_checks
                && total_extensions < self.cfg.max_extensions_per_line
                && board.in_check(board.white_to_move)
            {
                ext += 1;
            }
            let ext = ext.clamp(0, 2);

            let mut reduction = 0;
            if self.cfg.use_lmr
                && depth >= 4
                && quiet
                && ext == 0
                && index >= 3
                && alpha.abs() < MATE_THRESHOLD
                && !in_check
            {
                reduction = 1;
            }

            let mut timed_out = false;
            let mut score = 0;
            if index == 0 {
                match self.search(
                    board,
                    depth - 1 + ext,
                    -beta,
                    -alpha,
                    ply + 1,
                    total_extensions + ext,
                    false,
                ) {
                    Some((child, _)) => score = -child,
                    None => timed_out = true,
                }
            } else {
                // Null-window probe, possibly reduced; re-search on surprise.
                match self.search(
                    board,
                    depth - 1 - reduction + ext,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    total_extensions + ext,
                    false,
                ) {
                    Some((child, _)) => {
                        score = -child;
                        if score > alpha && (score < beta || reduction > 0) {
                            match self.search(
                                board,
                                depth - 1 + ext,
                                -beta,
                                -alpha,
                                ply + 1,
                                total_extensions + ext,
                                false,
                            ) {
                                Some((verified, _)) => score = -verified,
                                None => timed_out = true,
                            }
                        }
                    }
                    None => timed_out = true,
                }
            }

            board.undo(&mv, &undo);
            if timed_out {
                return None;
            }

            if score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
            alpha = alpha.max(score);

            if alpha >= beta {
                if quiet {
                    self.record_killer(&mv, ply);
                    let bonus = depth * depth;
                    self.update_history(board, &mv, bonus);
                    for tried in &quiets_tried {
                        if *tried == mv {
                            continue;
                        }
                        self.update_history(board, tried, -(bonus / 4));
                    }
                }
                break;
            }
        }

        if self.cfg.use_tt {
            let flag = if best_score <= original_alpha {
                TtFlag::Upper
            } else if best_score >= beta {
                TtFlag::Lower
            } else {
                TtFlag::Exact
            };
            self.tt
                .store(key, score_to_tt(best_score, ply), flag, best_move, depth as i16);
        }

        Some((best_score, best_move))
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    /// Pick a move for the side to move within the configured time budget.
    /// Returns `None` only when the position has no legal moves; callers
    /// detect mate/stalemate themselves.
    pub fn get_move(&mut self, board: &mut Board) -> Option<Move> {
        self.deadline = Instant::now() + Duration::from_millis(self.cfg.time_limit_ms);
        self.stop.reset();
        self.nodes = 0;
        self.last_depth = 0;
        self.last_eval = 0;

        let legal = board.generate_all_moves();
        if legal.is_empty() {
            self.last_nodes = 0;
            return None;
        }

        // Book probe at the root. Book moves are validated against the
        // legal-move list; a stale or corrupt entry is simply ignored.
        if self.cfg.use_opening_book {
            if let Some(book_move) = self.probe_books(board.hash()) {
                if let Some(found) = legal.iter().find(|m| **m == book_move) {
                    debug!("book move {}", move_to_uci(found));
                    return Some(*found);
                }
            }
        }

        let mut best_move: Option<Move> = None;
        let mut prev_score: i32 = 0;
        let mut have_prev = false;

        for depth in 1..=self.cfg.max_depth {
            // Aspiration: a narrow window around the last depth's score,
            // widened multiplicatively on a fail.
            let mut window = ASPIRATION_WINDOW;
            let (mut alpha, mut beta) = if have_prev && prev_score.abs() < MATE_THRESHOLD {
                (prev_score - window, prev_score + window)
            } else {
                (-INF, INF)
            };

            let mut completed = None;
            loop {
                match self.search(board, depth, alpha, beta, 0, 0, false) {
                    None => break,
                    Some((score, mv)) => {
                        if score <= alpha && alpha > -INF {
                            window *= 4;
                            alpha = score - window;
                            continue;
                        }
                        if score >= beta && beta < INF {
                            window *= 4;
                            beta = score + window;
                            continue;
                        }
                        completed = Some((score, mv));
                        break;
                    }
                }
            }

            let Some((score, mv)) = completed else { break };
            if let Some(mv) = mv {
                best_move = Some(mv);
                prev_score = score;
                have_prev = true;
                self.last_depth = depth;
                self.last_eval = score;
                debug!(
                    "depth {depth} score {score} nodes {} best {}",
                    self.nodes,
                    move_to_uci(&mv)
                );
            }

            if score.abs() >= MATE_THRESHOLD {
                break;
            }
            if self.out_of_time() {
                break;
            }
        }

        self.last_nodes = self.nodes;

        // An instant timeout can leave no completed depth; any legal move
        // beats forfeiting.
        best_move.or_else(|| legal.first().copied())
    }

    /// The dedicated book first, then book-flagged TT seeds.
    fn probe_books(&self, key: u64) -> Option<Move> {
        if let Some(book) = &self.book {
            if let Some(mv) = book.probe(key) {
                return Some(mv);
            }
        }
        let entry = self.tt.probe(key)?;
        (entry.flag == TtFlag::Book).then_some(entry.best_move)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_score_is_negative_for_the_root_side() {
        assert_eq!(draw_score(0), -5);
        assert_eq!(draw_score(1), 5);
        assert_eq!(draw_score(6), -5);
    }

    #[test]
    fn killers_never_store_captures() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut capture = Move::new(1, 2);
        capture.is_capture = true;
        engine.record_killer(&capture, 3);
        assert!(!engine.is_killer(&capture, 3));

        let quiet = Move::new(1, 2);
        engine.record_killer(&quiet, 3);
        assert!(engine.is_killer(&quiet, 3));
        // The previous killer shifts to the second slot.
        let other = Move::new(5, 6);
        engine.record_killer(&other, 3);
        assert!(engine.is_killer(&quiet, 3) && engine.is_killer(&other, 3));
    }

    #[test]
    fn history_rescales_instead_of_overflowing() {
        let mut engine = Engine::new(EngineConfig::default());
        let board = Board::new();
        let mv = Move::new(11, 19); // pawn e2e3
        let cap_before = engine.max_history;
        for _ in 0..40 {
            engine.update_history(&board, &mv, i32::MAX / 4);
        }
        assert!(engine.max_history > cap_before);
        for row in &engine.history {
            for &entry in row {
                assert!(entry >= 0 && entry <= engine.max_history);
            }
        }
    }

    #[test]
    fn null_material_rule_counts_majors_double() {
        let king_and_rook = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        assert!(null_move_viable(&king_and_rook));
        let king_and_knight = Board::from_fen("4k3/8/8/8/8/8/8/N3K3 w - - 0 1").unwrap();
        assert!(!null_move_viable(&king_and_knight));
        let lone_king = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(!null_move_viable(&lone_king));
    }
}
