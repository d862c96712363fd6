//! Fixed-depth minimax with alpha-beta pruning for the computer player.
use crate::game::board::{Board, Player, Position, Rank};
use crate::game::moves::Move;
use crate::game::promotion::promotes_on_arrival;
use crate::game::rules::{
    apply_move, continues_chain, evaluate_result, legal_moves, GameResult, RuleSet,
};
use crate::game::state::GameState;
use async_std::channel::{bounded, Receiver};
#[cfg(debug_assertions)]
use log::trace;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

pub const KING_VALUE: f64 = 3.0;
pub const REGULAR_VALUE: f64 = 1.0;
/// per row a regular piece has advanced towards its promotion row
pub const ADVANCEMENT_BONUS: f64 = 0.1;
/// score of a lost game, e.g. when the side to move has no move left
pub const LOSS_SCORE: f64 = 1000.0;
/// score of a drawn game
pub const DRAW_SCORE: f64 = 0.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SearchConfig {
    pub depth: u8,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig { depth: 4 }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct SearchOutcome {
    /// `None` when the side to move has no legal move
    pub best: Option<Move>,
    pub score: f64,
}

/// Static evaluation from the point of view of `maximizing`.
pub fn evaluate(board: &Board, maximizing: Player) -> f64 {
    board
        .pieces()
        .map(|(pos, piece)| {
            let value = match piece.rank {
                Rank::King => KING_VALUE,
                Rank::Regular => {
                    REGULAR_VALUE
                        + ADVANCEMENT_BONUS * piece.owner.advancement(pos.row) as f64
                }
            };
            if piece.owner == maximizing {
                value
            } else {
                -value
            }
        })
        .sum()
}

/// king captures, then captures, then promoting moves, then the rest
fn priority(board: &Board, mv: &Move) -> u8 {
    let takes_king = mv
        .captured
        .iter()
        .any(|&pos| matches!(board.cell(pos), Some(Some(p)) if p.is_king()));
    if takes_king {
        return 3;
    }
    if mv.is_capture() {
        return 2;
    }
    match board.piece_at(mv.from) {
        Ok(piece) if piece.rank == Rank::Regular && promotes_on_arrival(piece.owner, mv.to) => 1,
        _ => 0,
    }
}

/// Stable: equal priorities keep generation order.
pub fn order_moves(board: &Board, mut moves: Vec<Move>) -> Vec<Move> {
    moves.sort_by_key(|mv| Reverse(priority(board, mv)));
    moves
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Node {
    board: Board,
    to_move: Player,
    active_chain: Option<Position>,
}

struct Searcher<'a> {
    maximizing: Player,
    rules: RuleSet,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Searcher<'a> {
    fn cancelled(&self) -> bool {
        self.cancel
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    fn no_move_score(&self, node: &Node) -> f64 {
        if node.to_move == self.maximizing {
            -LOSS_SCORE
        } else {
            LOSS_SCORE
        }
    }

    fn result_score(&self, result: GameResult) -> Option<f64> {
        match result {
            GameResult::InProgress => None,
            GameResult::Draw => Some(DRAW_SCORE),
            GameResult::Win(winner) if winner == self.maximizing => Some(LOSS_SCORE),
            GameResult::Win(_) => Some(-LOSS_SCORE),
        }
    }

    /// Score of a finished game. Mid-chain positions are never finished.
    fn terminal_score(&self, node: &Node) -> Option<f64> {
        if node.active_chain.is_some() {
            return None;
        }
        self.result_score(evaluate_result(&node.board, node.to_move, &self.rules))
    }

    /// A capture whose piece can keep capturing leaves the same side to move.
    fn child(&self, node: &Node, mv: &Move) -> Option<Node> {
        let board = apply_move(&node.board, mv, &self.rules).ok()?;
        if mv.is_capture() && continues_chain(&board, mv.to) {
            Some(Node {
                board,
                to_move: node.to_move,
                active_chain: Some(mv.to),
            })
        } else {
            Some(Node {
                board,
                to_move: node.to_move.opponent(),
                active_chain: None,
            })
        }
    }

    fn moves(&self, node: &Node) -> Vec<Move> {
        order_moves(
            &node.board,
            legal_moves(&node.board, node.to_move, node.active_chain),
        )
    }

    fn minimax(&self, node: &Node, depth: u8, mut alpha: f64, mut beta: f64) -> f64 {
        if self.cancelled() {
            return 0.0;
        }
        if let Some(score) = self.terminal_score(node) {
            return score;
        }
        if depth == 0 {
            return evaluate(&node.board, self.maximizing);
        }
        let moves = self.moves(node);
        if moves.is_empty() {
            return self.no_move_score(node);
        }
        let maximizing = node.to_move == self.maximizing;
        let mut best = if maximizing {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        for mv in moves.iter() {
            let child = match self.child(node, mv) {
                Some(child) => child,
                None => continue,
            };
            let score = self.minimax(&child, depth - 1, alpha, beta);
            if maximizing {
                best = best.max(score);
                alpha = alpha.max(score);
            } else {
                best = best.min(score);
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }
        best
    }

    fn search(&self, node: &Node, depth: u8) -> SearchOutcome {
        let moves = self.moves(node);
        let mut outcome = SearchOutcome {
            best: None,
            score: self.no_move_score(node),
        };
        let mut alpha = f64::NEG_INFINITY;
        for mv in moves {
            let child = match self.child(node, &mv) {
                Some(child) => child,
                None => continue,
            };
            let score = self.minimax(&child, depth.max(1) - 1, alpha, f64::INFINITY);
            // first best wins ties
            if outcome.best.is_none() || score > outcome.score {
                outcome = SearchOutcome {
                    best: Some(mv),
                    score,
                };
            }
            alpha = alpha.max(score);
        }
        outcome
    }
}

fn root(state: &GameState) -> Node {
    Node {
        board: state.board,
        to_move: state.current_player(),
        active_chain: state.turn.active_chain,
    }
}

fn run_search(
    state: &GameState,
    config: SearchConfig,
    cancel: Option<&AtomicBool>,
) -> Option<SearchOutcome> {
    let searcher = Searcher {
        maximizing: state.current_player(),
        rules: state.rules,
        cancel,
    };
    let outcome = if state.is_over() {
        SearchOutcome {
            best: None,
            score: searcher.result_score(state.result).unwrap_or(-LOSS_SCORE),
        }
    } else {
        searcher.search(&root(state), config.depth)
    };
    if searcher.cancelled() {
        None
    } else {
        Some(outcome)
    }
}

/// Best move for the side to move of `state`. Never fails: a side with no
/// move gets `best: None`.
pub fn find_best_move(state: &GameState, config: SearchConfig) -> SearchOutcome {
    match run_search(state, config, None) {
        Some(outcome) => outcome,
        None => SearchOutcome {
            best: None,
            score: -LOSS_SCORE,
        },
    }
}

/// Minimax value of a position under the default rules. Depth 0 is the
/// static evaluation, finished games below that score as won, lost or drawn.
pub fn minimax(board: &Board, to_move: Player, maximizing: Player, depth: u8) -> f64 {
    if depth == 0 {
        return evaluate(board, maximizing);
    }
    let searcher = Searcher {
        maximizing,
        rules: RuleSet::default(),
        cancel: None,
    };
    let node = Node {
        board: *board,
        to_move,
        active_chain: None,
    };
    searcher.minimax(&node, depth, f64::NEG_INFINITY, f64::INFINITY)
}

/// A search running on its own thread.
pub struct SearchHandle {
    cancel: Arc<AtomicBool>,
    result: Receiver<Option<SearchOutcome>>,
}

impl SearchHandle {
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// `None` when cancelled
    pub async fn result(self) -> Option<SearchOutcome> {
        self.result.recv().await.ok().flatten()
    }
}

/// Run the search off the async executor; it is CPU bound.
pub fn spawn_search(state: GameState, config: SearchConfig) -> SearchHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let (sender, result) = bounded(1);
    let flag = cancel.clone();
    thread::spawn(move || {
        let outcome = run_search(&state, config, Some(&flag));
        #[cfg(debug_assertions)]
        trace!("search finished: {:?}", outcome);
        // the handle may be gone already
        let _ = sender.try_send(outcome);
    });
    SearchHandle { cancel, result }
}

#[cfg(test)]
mod test_search {
    use super::*;
    use crate::game::board::Piece;
    use crate::game::promotion::PromotionPolicy;
    use futures::executor::block_on;

    fn p(row: u8, col: u8) -> Position {
        Position::new(row, col)
    }

    fn board_with(pieces: &[(u8, u8, Piece)]) -> Board {
        let mut b = Board::empty();
        for &(r, c, piece) in pieces {
            b.set(p(r, c), Some(piece)).unwrap();
        }
        b
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_static_evaluation() {
        assert!(close(evaluate(&Board::initialize(), Player::One), 0.0));
        let b = board_with(&[
            (2, 2, Piece::king(Player::One)),
            (1, 0, Piece::regular(Player::One)),
            (3, 4, Piece::regular(Player::Two)),
        ]);
        assert!(close(evaluate(&b, Player::One), 3.0));
        assert!(close(evaluate(&b, Player::Two), -3.0));
        let b = board_with(&[
            (1, 0, Piece::regular(Player::One)),
            (4, 4, Piece::king(Player::Two)),
        ]);
        assert!(close(evaluate(&b, Player::One), 1.3 - 3.0));
        for to_move in [Player::One, Player::Two] {
            assert!(close(minimax(&b, to_move, Player::One, 0), evaluate(&b, Player::One)));
        }
    }

    #[test]
    fn test_move_ordering() {
        let b = board_with(&[
            (1, 1, Piece::regular(Player::One)),
            (2, 2, Piece::regular(Player::One)),
            (4, 4, Piece::regular(Player::One)),
            (1, 2, Piece::king(Player::Two)),
            (2, 3, Piece::regular(Player::Two)),
        ]);
        let moves = vec![
            Move::simple(p(4, 4), p(4, 3)),
            Move::simple(p(1, 1), p(0, 1)),
            Move::capture(p(2, 2), p(2, 4), vec![p(2, 3)]),
            Move::simple(p(4, 4), p(3, 4)),
            Move::capture(p(2, 2), p(0, 2), vec![p(1, 2)]),
        ];
        assert_eq!(
            order_moves(&b, moves),
            vec![
                Move::capture(p(2, 2), p(0, 2), vec![p(1, 2)]),
                Move::capture(p(2, 2), p(2, 4), vec![p(2, 3)]),
                Move::simple(p(1, 1), p(0, 1)),
                Move::simple(p(4, 4), p(4, 3)),
                Move::simple(p(4, 4), p(3, 4)),
            ]
        );
    }

    #[test]
    fn test_prefers_king_capture() {
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (1, 2, Piece::king(Player::Two)),
            (2, 3, Piece::regular(Player::Two)),
        ]);
        let rules = RuleSet {
            promotion: PromotionPolicy::LastRow,
            ..RuleSet::default()
        };
        let state = GameState::from_board(b, Player::One, rules);
        for depth in [1, 2, 3] {
            let outcome = find_best_move(&state, SearchConfig { depth });
            assert_eq!(
                outcome.best,
                Some(Move::capture(p(2, 2), p(0, 2), vec![p(1, 2)]))
            );
        }
    }

    #[test]
    fn test_no_move_is_a_loss() {
        let b = board_with(&[
            (0, 0, Piece::regular(Player::One)),
            (0, 1, Piece::regular(Player::Two)),
            (0, 2, Piece::regular(Player::Two)),
        ]);
        let state = GameState::from_board(b, Player::One, RuleSet::default());
        let outcome = find_best_move(&state, SearchConfig::default());
        assert_eq!(outcome.best, None);
        assert!(close(outcome.score, -LOSS_SCORE));
        assert!(close(minimax(&b, Player::One, Player::One, 3), -LOSS_SCORE));
        assert!(close(minimax(&b, Player::One, Player::Two, 3), LOSS_SCORE));
    }

    #[test]
    fn test_lone_pieces_score_as_draw() {
        // one king against one regular piece: a draw, not a material lead
        let b = board_with(&[
            (1, 1, Piece::king(Player::One)),
            (3, 3, Piece::regular(Player::Two)),
        ]);
        assert!(evaluate(&b, Player::One) > 1.0);
        for depth in [1, 2, 4] {
            assert!(close(minimax(&b, Player::One, Player::One, depth), DRAW_SCORE));
            assert!(close(minimax(&b, Player::Two, Player::Two, depth), DRAW_SCORE));
        }
        let state = GameState::from_board(b, Player::One, RuleSet::default());
        assert_eq!(state.result, GameResult::Draw);
        let outcome = find_best_move(&state, SearchConfig::default());
        assert_eq!(outcome.best, None);
        assert!(close(outcome.score, DRAW_SCORE));

        // without the draw rule the king's lead counts
        let rules = RuleSet {
            lone_piece_draw: false,
            ..RuleSet::default()
        };
        let state = GameState::from_board(b, Player::One, rules);
        let outcome = find_best_move(&state, SearchConfig { depth: 1 });
        assert!(outcome.best.is_some());
        assert!(outcome.score > 1.0);
    }

    #[test]
    fn test_chain_continues_after_promotion() {
        // the jump to (0, 1) crowns the piece, which can then take (0, 3)
        let b = board_with(&[
            (2, 1, Piece::regular(Player::One)),
            (4, 4, Piece::regular(Player::One)),
            (1, 1, Piece::regular(Player::Two)),
            (0, 3, Piece::regular(Player::Two)),
            (4, 0, Piece::regular(Player::Two)),
        ]);
        let searcher = Searcher {
            maximizing: Player::One,
            rules: RuleSet::default(),
            cancel: None,
        };
        let node = Node {
            board: b,
            to_move: Player::One,
            active_chain: None,
        };
        let mv = Move::capture(p(2, 1), p(0, 1), vec![p(1, 1)]);
        assert_eq!(searcher.moves(&node), vec![mv.clone()]);
        let child = searcher.child(&node, &mv).unwrap();
        assert_eq!(child.to_move, Player::One);
        assert_eq!(child.active_chain, Some(p(0, 1)));
        assert_eq!(
            searcher.moves(&child),
            vec![Move::capture(p(0, 1), p(0, 4), vec![p(0, 3)])]
        );
    }

    #[test]
    fn test_opening_search_is_deterministic() {
        let state = GameState::default();
        let first = find_best_move(&state, SearchConfig::default());
        let second = find_best_move(&state, SearchConfig::default());
        assert_eq!(first, second);
        assert!(state.legal_moves().contains(first.best.as_ref().unwrap()));
    }

    #[test]
    fn test_background_search() {
        let state = GameState::default();
        let handle = spawn_search(state.clone(), SearchConfig::default());
        let outcome = block_on(handle.result()).unwrap();
        assert_eq!(outcome, find_best_move(&state, SearchConfig::default()));
    }

    #[test]
    fn test_cancelled_search() {
        let flag = AtomicBool::new(true);
        assert_eq!(
            run_search(&GameState::default(), SearchConfig::default(), Some(&flag)),
            None
        );
    }
}
