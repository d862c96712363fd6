mod board;
mod capture;
mod error;
mod moves;
mod promotion;
mod rules;
mod search;
mod state;

pub use board::{
    within_bounds, Board, Cell, Direction, Piece, PieceCount, Player, Position, Rank,
    BOARD_SIZE, PIECES_PER_PLAYER,
};
pub use capture::capture_chains;
pub use error::GameError;
pub use moves::{capture_steps, execute_move, is_valid_move, simple_moves, strip_captured, Move};
pub use promotion::{apply_promotion, promotes_on_arrival, PromotionPolicy};
pub use rules::{
    apply_move, continues_chain, evaluate_result, has_captures, legal_moves, legal_steps,
    GameResult, RuleSet, TurnState,
};
pub use search::{
    evaluate, find_best_move, minimax, order_moves, spawn_search, SearchConfig, SearchHandle,
    SearchOutcome, ADVANCEMENT_BONUS, DRAW_SCORE, KING_VALUE, LOSS_SCORE, REGULAR_VALUE,
};
pub use state::{ClickOutcome, GameState, GameStateUpdate};
