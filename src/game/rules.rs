//! Turn-level rules: mandatory capture, move application and game result.
use crate::game::board::{Board, Player, Position};
use crate::game::capture::capture_chains;
use crate::game::error::GameError;
use crate::game::moves::{capture_steps, execute_move, jumps, simple_moves, strip_captured, Move};
use crate::game::promotion::{apply_promotion, PromotionPolicy};
use bincode::{Decode, Encode};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RuleSet {
    pub promotion: PromotionPolicy,
    /// a game where both sides are down to one piece is drawn
    pub lone_piece_draw: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        RuleSet {
            promotion: PromotionPolicy::default(),
            lone_piece_draw: true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TurnState {
    pub current_player: Player,
    pub must_capture: bool,
    /// the piece in the middle of a capture chain, if any
    pub active_chain: Option<Position>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub enum GameResult {
    InProgress,
    Win(Player),
    Draw,
}

impl GameResult {
    pub fn is_over(&self) -> bool {
        !matches!(self, GameResult::InProgress)
    }
}

/// whether any piece of `player` can capture
pub fn has_captures(board: &Board, player: Player) -> bool {
    board
        .pieces()
        .any(|(pos, piece)| piece.owner == player && !jumps(board, pos).is_empty())
}

/// Legal moves of `player` with captures expanded into maximal chains.
///
/// Captures preempt simple moves. With `active_chain` set only that piece
/// may move, and only by capturing.
pub fn legal_moves(board: &Board, player: Player, active_chain: Option<Position>) -> Vec<Move> {
    collect_moves(board, player, active_chain, capture_chains)
}

/// Same as [`legal_moves`] but captures are single jumps.
pub fn legal_steps(board: &Board, player: Player, active_chain: Option<Position>) -> Vec<Move> {
    collect_moves(board, player, active_chain, capture_steps)
}

fn collect_moves(
    board: &Board,
    player: Player,
    active_chain: Option<Position>,
    captures_of: fn(&Board, Position) -> Vec<Move>,
) -> Vec<Move> {
    if let Some(pos) = active_chain {
        return match board.piece_at(pos) {
            Ok(piece) if piece.owner == player => captures_of(board, pos),
            _ => Vec::new(),
        };
    }
    let own: Vec<Position> = board
        .pieces()
        .filter(|(_, piece)| piece.owner == player)
        .map(|(pos, _)| pos)
        .collect();
    let captures: Vec<Move> = own.iter().flat_map(|&pos| captures_of(board, pos)).collect();
    if !captures.is_empty() {
        return captures;
    }
    own.iter().flat_map(|&pos| simple_moves(board, pos)).collect()
}

fn has_legal_move(board: &Board, player: Player) -> bool {
    board.pieces().any(|(pos, piece)| {
        piece.owner == player
            && (!jumps(board, pos).is_empty() || !simple_moves(board, pos).is_empty())
    })
}

/// Play `mv` on a copy of `board`: relocate, strip the captured pieces,
/// then promote.
///
/// Legality against the turn is not checked here. Captured squares are
/// cleared before relocating since a king's chain may end on one of them.
pub fn apply_move(board: &Board, mv: &Move, rules: &RuleSet) -> Result<Board, GameError> {
    let stripped = strip_captured(board, &mv.captured)?;
    let moved = execute_move(&stripped, mv.from, mv.to)?;
    Ok(apply_promotion(&moved, mv.to, rules.promotion))
}

/// whether the piece on `at` can keep capturing
pub fn continues_chain(board: &Board, at: Position) -> bool {
    !jumps(board, at).is_empty()
}

/// Result of the game with `next` to move.
pub fn evaluate_result(board: &Board, next: Player, rules: &RuleSet) -> GameResult {
    let one = board.count_pieces(Player::One).count;
    let two = board.count_pieces(Player::Two).count;
    if one == 0 {
        return GameResult::Win(Player::Two);
    }
    if two == 0 {
        return GameResult::Win(Player::One);
    }
    if rules.lone_piece_draw && one == 1 && two == 1 {
        return GameResult::Draw;
    }
    if !has_legal_move(board, next) {
        return GameResult::Win(next.opponent());
    }
    GameResult::InProgress
}
