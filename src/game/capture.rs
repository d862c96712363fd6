//! Enumeration of multi-jump capture sequences.
//!
//! The traversal is an explicit depth-first walk. Every branch owns a scratch
//! copy of the board with the pieces it has already taken removed, so one
//! branch can never observe the captures of its siblings.
use crate::game::board::{Board, Position};
use crate::game::error::GameError;
use crate::game::moves::{jumps, Move};

struct Branch {
    board: Board,
    at: Position,
    captured: Vec<Position>,
    /// landing squares on this path, origin included
    visited: Vec<Position>,
}

/// All maximal capture sequences of the piece at `from`.
///
/// Each returned `Move` ends on a square with no further capture and lists
/// every piece taken along its own path. Sequences that could still be
/// extended are never returned. Empty when the piece cannot capture.
pub fn capture_chains(board: &Board, from: Position) -> Vec<Move> {
    let mut chains = Vec::new();
    if board.piece_at(from).is_err() {
        return chains;
    }
    let mut stack = vec![Branch {
        board: *board,
        at: from,
        captured: Vec::new(),
        visited: vec![from],
    }];
    while let Some(branch) = stack.pop() {
        let continuations: Vec<(Position, Position)> = jumps(&branch.board, branch.at)
            .into_iter()
            .filter(|(landing, _)| !branch.visited.contains(landing))
            .collect();
        if continuations.is_empty() {
            if !branch.captured.is_empty() {
                chains.push(Move::capture(from, branch.at, branch.captured));
            }
            continue;
        }
        // pushed in reverse so that branches pop in enumeration order
        for &(landing, over) in continuations.iter().rev() {
            let mut captured = branch.captured.clone();
            captured.push(over);
            let mut visited = branch.visited.clone();
            visited.push(landing);
            if let Ok(board) = jump(&branch.board, branch.at, landing, over) {
                stack.push(Branch {
                    board,
                    at: landing,
                    captured,
                    visited,
                });
            }
        }
    }
    chains
}

/// Scratch-board transition for one jump.
fn jump(
    board: &Board,
    from: Position,
    landing: Position,
    over: Position,
) -> Result<Board, GameError> {
    let piece = board.piece_at(from)?;
    board
        .with(from, None)?
        .with(over, None)?
        .with(landing, Some(piece))
}
