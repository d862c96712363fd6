use crate::game::board::{Board, Player, Position};
use bincode::{Decode, Encode};

/// Crowning policies seen across the game's history. They differ in the
/// endgame, so the choice is explicit rather than baked in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Encode, Decode)]
pub enum PromotionPolicy {
    /// crown only on the opponent's back row
    LastRow,
    /// also crown a player's last remaining piece
    LastRowOrLastPiece,
    /// as above, and the opponent's lone piece is crowned too
    LastRowOrLastPieceWithCompensation,
}

impl Default for PromotionPolicy {
    fn default() -> Self {
        PromotionPolicy::LastRowOrLastPieceWithCompensation
    }
}

impl PromotionPolicy {
    fn crowns_last_piece(&self) -> bool {
        !matches!(self, PromotionPolicy::LastRow)
    }

    /// whether the opponent's lone piece is crowned as well
    pub fn compensates(&self) -> bool {
        matches!(self, PromotionPolicy::LastRowOrLastPieceWithCompensation)
    }
}

/// Apply promotion after the piece now standing on `moved_to` completed its
/// move. Kings are left alone, so applying this twice changes nothing.
pub fn apply_promotion(board: &Board, moved_to: Position, policy: PromotionPolicy) -> Board {
    let mut next = *board;
    let mover = match board.piece_at(moved_to) {
        Ok(piece) => piece,
        Err(_) => return next,
    };
    let on_last_row = moved_to.row == mover.owner.promotion_row();
    let is_last_piece =
        policy.crowns_last_piece() && board.count_pieces(mover.owner).count == 1;
    if on_last_row || is_last_piece {
        next.crown(moved_to);
    }
    if policy.compensates() {
        if let Some(lone) = board.count_pieces(mover.owner.opponent()).last_remaining {
            next.crown(lone);
        }
    }
    next
}

/// whether `apply_promotion` would crown a regular piece arriving on `to`
pub fn promotes_on_arrival(player: Player, to: Position) -> bool {
    to.row == player.promotion_row()
}

#[cfg(test)]
mod test_promotion {
    use super::*;
    use crate::game::board::Piece;
    use PromotionPolicy::*;

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

    #[test]
    fn test_last_row() {
        let b = board_with(&[
            (0, 1, Piece::regular(Player::One)),
            (3, 1, Piece::regular(Player::One)),
            (1, 1, Piece::regular(Player::Two)),
            (4, 4, Piece::regular(Player::Two)),
        ]);
        for policy in [LastRow, LastRowOrLastPiece, LastRowOrLastPieceWithCompensation] {
            let promoted = apply_promotion(&b, p(0, 1), policy);
            assert_eq!(promoted.piece_at(p(0, 1)).unwrap(), Piece::king(Player::One));
            assert_eq!(promoted.piece_at(p(3, 1)).unwrap(), Piece::regular(Player::One));
        }
        // player 2 crowns on row 4 only
        assert!(apply_promotion(&b, p(1, 1), LastRow)
            .piece_at(p(1, 1))
            .map(|x| !x.is_king())
            .unwrap());
        assert!(apply_promotion(&b, p(4, 4), LastRow)
            .piece_at(p(4, 4))
            .unwrap()
            .is_king());
    }

    #[test]
    fn test_last_piece() {
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (0, 0, Piece::regular(Player::Two)),
            (0, 1, Piece::regular(Player::Two)),
        ]);
        assert!(!apply_promotion(&b, p(2, 2), LastRow)
            .piece_at(p(2, 2))
            .unwrap()
            .is_king());
        assert!(apply_promotion(&b, p(2, 2), LastRowOrLastPiece)
            .piece_at(p(2, 2))
            .unwrap()
            .is_king());
    }

    #[test]
    fn test_compensation() {
        // player 1 just moved; player 2 is down to a single regular piece
        let b = board_with(&[
            (2, 2, Piece::regular(Player::One)),
            (3, 3, Piece::regular(Player::One)),
            (1, 4, Piece::regular(Player::Two)),
        ]);
        let plain = apply_promotion(&b, p(2, 2), LastRowOrLastPiece);
        assert!(!plain.piece_at(p(1, 4)).unwrap().is_king());
        let compensated = apply_promotion(&b, p(2, 2), LastRowOrLastPieceWithCompensation);
        assert!(compensated.piece_at(p(1, 4)).unwrap().is_king());
        assert!(!compensated.piece_at(p(2, 2)).unwrap().is_king());
    }

    #[test]
    fn test_idempotent() {
        let b = board_with(&[
            (0, 1, Piece::king(Player::One)),
            (4, 4, Piece::king(Player::Two)),
        ]);
        let once = apply_promotion(&b, p(0, 1), PromotionPolicy::default());
        assert_eq!(once, b);
        assert_eq!(apply_promotion(&once, p(0, 1), PromotionPolicy::default()), once);
        // an empty square is a no-op
        assert_eq!(apply_promotion(&b, p(2, 2), PromotionPolicy::default()), b);
    }
}
