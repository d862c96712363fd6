use crate::game::board::{Board, Direction, Piece, Player, Position, Rank, BOARD_SIZE};
use crate::game::error::GameError;
use bincode::{Decode, Encode};

/// A move of one piece. An empty `captured` list marks a simple move;
/// otherwise it lists the jumped pieces in the order they were taken.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub captured: Vec<Position>,
}

impl Move {
    pub fn simple(from: Position, to: Position) -> Self {
        Move {
            from,
            to,
            captured: Vec::new(),
        }
    }

    pub fn capture(from: Position, to: Position, captured: Vec<Position>) -> Self {
        Move { from, to, captured }
    }

    #[inline(always)]
    pub fn is_capture(&self) -> bool {
        !self.captured.is_empty()
    }
}

/// Regular pieces never step or jump backwards.
#[inline(always)]
pub(crate) fn may_travel(piece: &Piece, direction: Direction) -> bool {
    match piece.rank {
        Rank::King => true,
        Rank::Regular => direction.is_sideways() || direction.delta().0 == piece.owner.forward(),
    }
}

/// Non-capturing destinations of the piece at `from`.
///
/// Empty when no piece stands there.
pub fn simple_moves(board: &Board, from: Position) -> Vec<Move> {
    let piece = match board.piece_at(from) {
        Ok(piece) => piece,
        Err(_) => return Vec::new(),
    };
    let mut moves = Vec::new();
    for direction in Direction::ALL {
        if !may_travel(&piece, direction) {
            continue;
        }
        let reach = match piece.rank {
            Rank::Regular => 1,
            Rank::King => BOARD_SIZE as u8,
        };
        for distance in 1..=reach {
            match from.offset(direction, distance) {
                Some(to) if board.is_empty(to) => moves.push(Move::simple(from, to)),
                _ => break,
            }
        }
    }
    moves
}

/// Single-jump captures of the piece at `from`: `(landing, captured)`.
///
/// A regular piece jumps an adjacent enemy into the empty square right behind
/// it. A king slides to the first piece in a line; if that piece is an enemy,
/// every empty square in the unbroken run behind it is a landing square.
pub(crate) fn jumps(board: &Board, from: Position) -> Vec<(Position, Position)> {
    let piece = match board.piece_at(from) {
        Ok(piece) => piece,
        Err(_) => return Vec::new(),
    };
    let mut jumps = Vec::new();
    for direction in Direction::ALL {
        if !may_travel(&piece, direction) {
            continue;
        }
        match piece.rank {
            Rank::Regular => {
                if let (Some(over), Some(landing)) =
                    (from.offset(direction, 1), from.offset(direction, 2))
                {
                    if is_enemy(board, over, piece.owner) && board.is_empty(landing) {
                        jumps.push((landing, over));
                    }
                }
            }
            Rank::King => {
                let mut distance = 1;
                // slide over empty squares to the first piece in line
                let over = loop {
                    match from.offset(direction, distance) {
                        None => break None,
                        Some(p) if board.is_empty(p) => distance += 1,
                        Some(p) => break Some(p),
                    }
                };
                if let Some(over) = over.filter(|&p| is_enemy(board, p, piece.owner)) {
                    distance += 1;
                    while let Some(landing) = from.offset(direction, distance) {
                        if !board.is_empty(landing) {
                            break;
                        }
                        jumps.push((landing, over));
                        distance += 1;
                    }
                }
            }
        }
    }
    jumps
}

#[inline(always)]
fn is_enemy(board: &Board, pos: Position, player: Player) -> bool {
    matches!(board.cell(pos), Some(Some(p)) if p.owner != player)
}

/// Every single-jump capture available to the piece at `from`,
/// each carrying exactly one captured position.
pub fn capture_steps(board: &Board, from: Position) -> Vec<Move> {
    jumps(board, from)
        .into_iter()
        .map(|(to, over)| Move::capture(from, to, vec![over]))
        .collect()
}

/// Validate a simple move. Only meaningful while no capture is mandatory.
pub fn is_valid_move(board: &Board, from: Position, to: Position) -> bool {
    if !from.within_bounds() || !to.within_bounds() {
        return false;
    }
    simple_moves(board, from).iter().any(|m| m.to == to)
}

/// Relocate the piece at `from` to `to`.
///
/// This does not remove captured pieces nor promote: callers sequence
/// move, [`strip_captured`], then promotion.
pub fn execute_move(board: &Board, from: Position, to: Position) -> Result<Board, GameError> {
    let piece = board.piece_at(from)?;
    match board.cell(to) {
        None => Err(GameError::OutOfBounds(to)),
        Some(Some(_)) if to != from => Err(GameError::Occupied(to)),
        Some(_) => {
            let mut next = *board;
            next.set(from, None)?;
            next.set(to, Some(piece))?;
            Ok(next)
        }
    }
}

/// Remove every captured piece from the board.
pub fn strip_captured(board: &Board, captured: &[Position]) -> Result<Board, GameError> {
    let mut next = *board;
    for &pos in captured {
        board.piece_at(pos)?;
        next.set(pos, None)?;
    }
    Ok(next)
}

#[cfg(test)]
mod test_moves {
    use super::*;

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

    fn destinations(moves: &[Move]) -> Vec<Position> {
        moves.iter().map(|m| m.to).collect()
    }

    #[test]
    fn test_regular_forward_and_sideways() {
        let b = board_with(&[(2, 2, Piece::regular(Player::One))]);
        assert_eq!(destinations(&simple_moves(&b, p(2, 2))), vec![p(1, 2), p(2, 1), p(2, 3)]);
        let b = board_with(&[(2, 2, Piece::regular(Player::Two))]);
        assert_eq!(destinations(&simple_moves(&b, p(2, 2))), vec![p(3, 2), p(2, 1), p(2, 3)]);
    }

    #[test]
    fn test_regular_blocked_and_edges() {
        let b = board_with(&[
            (0, 0, Piece::regular(Player::One)),
            (0, 1, Piece::regular(Player::Two)),
        ]);
        // on its promotion row with the only sideways square taken
        assert!(simple_moves(&b, p(0, 0)).is_empty());
        assert!(simple_moves(&b, p(3, 3)).is_empty());
    }

    #[test]
    fn test_king_slides_until_blocked() {
        let b = board_with(&[
            (2, 2, Piece::king(Player::One)),
            (0, 2, Piece::regular(Player::Two)),
            (2, 4, Piece::regular(Player::One)),
        ]);
        assert_eq!(
            destinations(&simple_moves(&b, p(2, 2))),
            vec![p(1, 2), p(3, 2), p(4, 2), p(2, 1), p(2, 0), p(2, 3)]
        );
        assert!(is_valid_move(&b, p(2, 2), p(4, 2)));
        // cannot pass over the piece at (0, 2)
        assert!(!is_valid_move(&b, p(2, 2), p(0, 2)));
        // no diagonals
        assert!(!is_valid_move(&b, p(2, 2), p(3, 3)));
    }

    #[test]
    fn test_regular_never_backwards() {
        let b = board_with(&[(2, 2, Piece::regular(Player::One))]);
        assert!(!is_valid_move(&b, p(2, 2), p(3, 2)));
        assert!(is_valid_move(&b, p(2, 2), p(1, 2)));
        assert!(!is_valid_move(&b, p(2, 2), p(0, 2)));
        assert!(!is_valid_move(&b, p(2, 2), p(9, 2)));
    }

    #[test]
    fn test_regular_capture_direction() {
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (1, 2, Piece::regular(Player::Two)),
            (3, 2, Piece::regular(Player::Two)),
            (2, 3, Piece::regular(Player::Two)),
        ]);
        // forward and sideways only, never the backward jump over (3, 2)
        let steps = capture_steps(&b, p(2, 2));
        assert_eq!(
            steps,
            vec![
                Move::capture(p(2, 2), p(0, 2), vec![p(1, 2)]),
                Move::capture(p(2, 2), p(2, 4), vec![p(2, 3)]),
            ]
        );
    }

    #[test]
    fn test_regular_capture_needs_empty_landing() {
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (1, 2, Piece::regular(Player::Two)),
            (0, 2, Piece::regular(Player::Two)),
            (2, 1, Piece::regular(Player::One)),
        ]);
        assert!(capture_steps(&b, p(2, 2)).is_empty());
    }

    #[test]
    fn test_king_capture_landings() {
        let b = board_with(&[
            (4, 0, Piece::king(Player::Two)),
            (2, 0, Piece::regular(Player::One)),
        ]);
        assert_eq!(
            destinations(&capture_steps(&b, p(4, 0))),
            vec![p(1, 0), p(0, 0)]
        );
        assert!(capture_steps(&b, p(4, 0))
            .iter()
            .all(|m| m.captured == vec![p(2, 0)]));
    }

    #[test]
    fn test_king_capture_blocked() {
        // friendly piece first
        let b = board_with(&[
            (4, 0, Piece::king(Player::Two)),
            (3, 0, Piece::regular(Player::Two)),
            (2, 0, Piece::regular(Player::One)),
        ]);
        assert!(capture_steps(&b, p(4, 0)).is_empty());
        // enemy with no room behind it
        let b = board_with(&[
            (4, 0, Piece::king(Player::Two)),
            (1, 0, Piece::regular(Player::One)),
            (0, 0, Piece::regular(Player::One)),
        ]);
        assert!(capture_steps(&b, p(4, 0)).is_empty());
        // enemy on the edge
        let b = board_with(&[
            (4, 0, Piece::king(Player::Two)),
            (0, 0, Piece::regular(Player::One)),
        ]);
        assert!(capture_steps(&b, p(4, 0)).is_empty());
    }

    #[test]
    fn test_execute_move_fails_fast() {
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (1, 2, Piece::regular(Player::Two)),
        ]);
        assert_eq!(execute_move(&b, p(3, 3), p(3, 4)), Err(GameError::NoPiece(p(3, 3))));
        assert_eq!(execute_move(&b, p(2, 2), p(1, 2)), Err(GameError::Occupied(p(1, 2))));
        assert_eq!(
            execute_move(&b, p(2, 2), p(2, 7)),
            Err(GameError::OutOfBounds(p(2, 7)))
        );
        let moved = execute_move(&b, p(2, 2), p(2, 3)).unwrap();
        assert!(moved.is_empty(p(2, 2)));
        assert_eq!(moved.cell(p(2, 3)), Some(Some(Piece::regular(Player::One))));
        // the input snapshot is untouched
        assert_eq!(b.cell(p(2, 2)), Some(Some(Piece::regular(Player::One))));
        assert_eq!(strip_captured(&moved, &[p(4, 4)]), Err(GameError::NoPiece(p(4, 4))));
        let stripped = strip_captured(&moved, &[p(1, 2)]).unwrap();
        assert_eq!(stripped.count_pieces(Player::Two).count, 0);
    }
}
