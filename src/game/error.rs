use crate::game::board::Position;
use std::fmt::{Display, Formatter};

/// Rejections raised by the rule engine.
///
/// The engine fails fast on any of these instead of producing a board that
/// the capture and search code would have to second-guess.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    /// the position lies outside the 5x5 board
    OutOfBounds(Position),
    /// no piece stands on the position
    NoPiece(Position),
    /// the piece belongs to the player not on turn
    NotYourPiece(Position),
    /// the destination is already taken
    Occupied(Position),
    /// the move is not among the legal options of the side to move
    InvalidMove { from: Position, to: Position },
    /// the game already has a result
    GameOver,
}

impl Display for GameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::OutOfBounds(p) => write!(f, "position {p} is out of bounds"),
            GameError::NoPiece(p) => write!(f, "no piece at {p}"),
            GameError::NotYourPiece(p) => write!(f, "piece at {p} belongs to the opponent"),
            GameError::Occupied(p) => write!(f, "position {p} is occupied"),
            GameError::InvalidMove { from, to } => write!(f, "invalid move from {from} to {to}"),
            GameError::GameOver => f.write_str("game is already over"),
        }
    }
}

impl std::error::Error for GameError {}
