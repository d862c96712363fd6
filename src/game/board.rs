use crate::game::error::GameError;
use bincode::{Decode, Encode};
use std::fmt::{Display, Formatter};

pub const BOARD_SIZE: usize = 5;

/// number of pieces each side starts with
pub const PIECES_PER_PLAYER: usize = 12;

/// Player 1 starts on the bottom rows and moves up,
/// player 2 starts on the top rows and moves down.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
#[repr(u8)]
pub enum Player {
    One = 1,
    Two = 2,
}

impl Player {
    pub fn opponent(&self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// row delta of a forward step
    pub fn forward(&self) -> i8 {
        match self {
            Player::One => -1,
            Player::Two => 1,
        }
    }

    /// the opponent's back edge, where regular pieces are crowned
    pub fn promotion_row(&self) -> u8 {
        match self {
            Player::One => 0,
            Player::Two => (BOARD_SIZE - 1) as u8,
        }
    }

    /// rows travelled from the own back edge
    pub fn advancement(&self, row: u8) -> u8 {
        match self {
            Player::One => (BOARD_SIZE - 1) as u8 - row,
            Player::Two => row,
        }
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "player {}", *self as u8)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub enum Rank {
    Regular,
    King,
}

/// Pieces are values: promotion replaces the piece, it never edits one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub struct Piece {
    pub owner: Player,
    pub rank: Rank,
}

impl Piece {
    pub const fn regular(owner: Player) -> Self {
        Piece {
            owner,
            rank: Rank::Regular,
        }
    }

    pub const fn king(owner: Player) -> Self {
        Piece {
            owner,
            rank: Rank::King,
        }
    }

    #[inline(always)]
    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// the king that replaces this piece on promotion
    pub fn crowned(self) -> Self {
        Piece::king(self.owner)
    }
}

pub type Cell = Option<Piece>;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Position { row, col }
    }

    pub fn within_bounds(&self) -> bool {
        within_bounds(self.row as i16, self.col as i16)
    }

    /// walk `distance` squares in `direction`, `None` once off the board
    pub fn offset(&self, direction: Direction, distance: u8) -> Option<Position> {
        let (dr, dc) = direction.delta();
        let row = self.row as i16 + dr as i16 * distance as i16;
        let col = self.col as i16 + dc as i16 * distance as i16;
        if within_bounds(row, col) {
            Some(Position::new(row as u8, col as u8))
        } else {
            None
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[inline(always)]
pub fn within_bounds(row: i16, col: i16) -> bool {
    (0..BOARD_SIZE as i16).contains(&row) && (0..BOARD_SIZE as i16).contains(&col)
}

/// orthogonal directions only, in enumeration order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row, col) delta of one step
    pub fn delta(&self) -> (i8, i8) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    pub fn is_sideways(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PieceCount {
    pub count: usize,
    /// only set when exactly one piece remains
    pub last_remaining: Option<Position>,
}

/// A 5x5 snapshot. Operations never edit a board handed to them, they
/// return a new one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    pub const fn empty() -> Self {
        Board {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// The opening position: 12 regular pieces a side, only the centre empty.
    pub fn initialize() -> Self {
        let mut board = Board::empty();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let owner = match (row, col) {
                    (0..=1, _) | (2, 0..=1) => Player::Two,
                    (3..=4, _) | (2, 3..=4) => Player::One,
                    _ => continue,
                };
                board.cells[row][col] = Some(Piece::regular(owner));
            }
        }
        board
    }

    pub fn from_rows(cells: [[Cell; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Board { cells }
    }

    /// read the internal representation of the board
    pub fn rows(&self) -> &[[Cell; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// `None` if the position is out of bounds
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        self.cells
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
    }

    pub fn piece_at(&self, pos: Position) -> Result<Piece, GameError> {
        match self.cell(pos) {
            None => Err(GameError::OutOfBounds(pos)),
            Some(None) => Err(GameError::NoPiece(pos)),
            Some(Some(piece)) => Ok(piece),
        }
    }

    /// out of bounds positions are never empty
    pub fn is_empty(&self, pos: Position) -> bool {
        matches!(self.cell(pos), Some(None))
    }

    /// put a piece on the board, or clear a cell using `None`.
    pub fn set(&mut self, pos: Position, cell: Cell) -> Result<(), GameError> {
        match self
            .cells
            .get_mut(pos.row as usize)
            .and_then(|row| row.get_mut(pos.col as usize))
        {
            None => Err(GameError::OutOfBounds(pos)),
            Some(c) => {
                *c = cell;
                Ok(())
            }
        }
    }

    /// Crown the regular piece at `pos`. Returns whether a piece was crowned.
    pub fn crown(&mut self, pos: Position) -> bool {
        let cell = self
            .cells
            .get_mut(pos.row as usize)
            .and_then(|row| row.get_mut(pos.col as usize));
        match cell {
            Some(Some(piece)) if piece.rank == Rank::Regular => {
                *piece = piece.crowned();
                true
            }
            _ => false,
        }
    }

    /// builder used to stage positions
    pub fn with(mut self, pos: Position, cell: Cell) -> Result<Self, GameError> {
        self.set(pos, cell)?;
        Ok(self)
    }

    /// every piece in row-major order
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(col, cell)| {
                cell.map(|piece| (Position::new(row as u8, col as u8), piece))
            })
        })
    }

    pub fn count_pieces(&self, player: Player) -> PieceCount {
        let mut count = 0;
        let mut last = None;
        for (pos, piece) in self.pieces() {
            if piece.owner == player {
                count += 1;
                last = Some(pos);
            }
        }
        PieceCount {
            count,
            last_remaining: if count == 1 { last } else { None },
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::initialize()
    }
}

/// `b`/`B` for player 1 (regular/king), `r`/`R` for player 2.
impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("  ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {col}")?;
        }
        for (row, cells) in self.cells.iter().enumerate() {
            write!(f, "\n{row} ")?;
            for cell in cells.iter() {
                let c = match cell {
                    None => '.',
                    Some(Piece { owner: Player::One, rank: Rank::Regular }) => 'b',
                    Some(Piece { owner: Player::One, rank: Rank::King }) => 'B',
                    Some(Piece { owner: Player::Two, rank: Rank::Regular }) => 'r',
                    Some(Piece { owner: Player::Two, rank: Rank::King }) => 'R',
                };
                write!(f, " {c}")?;
            }
        }
        Ok(())
    }
}
