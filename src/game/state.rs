use crate::game::board::{Board, Player, Position};
use crate::game::error::GameError;
use crate::game::moves::{capture_steps, is_valid_move, Move};
use crate::game::rules::{
    apply_move, continues_chain, evaluate_result, has_captures, legal_moves, legal_steps,
    GameResult, RuleSet, TurnState,
};
use bincode::{Decode, Encode};

/// One game as a value. Every transition returns a new `GameState`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    pub board: Board,
    pub turn: TurnState,
    pub result: GameResult,
    pub selected: Option<Position>,
    pub rules: RuleSet,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ClickOutcome {
    Selected(GameState),
    Moved(GameState),
    /// selection cleared, board unchanged
    Rejected(GameState, GameError),
    Ignored,
}

/// The relayed game snapshot. Absent fields are left untouched on merge.
#[derive(Clone, PartialEq, Eq, Debug, Default, Encode, Decode)]
pub struct GameStateUpdate {
    pub board: Option<Board>,
    pub current_player: Option<Player>,
    pub game_over: Option<GameResult>,
    pub selected_piece: Option<Option<Position>>,
    pub must_capture: Option<bool>,
    pub sequential_capture: Option<bool>,
}

impl GameStateUpdate {
    /// overwrite the fields present in `newer`
    pub fn merge(&mut self, newer: &GameStateUpdate) {
        if newer.board.is_some() {
            self.board = newer.board;
        }
        if newer.current_player.is_some() {
            self.current_player = newer.current_player;
        }
        if newer.game_over.is_some() {
            self.game_over = newer.game_over;
        }
        if newer.selected_piece.is_some() {
            self.selected_piece = newer.selected_piece;
        }
        if newer.must_capture.is_some() {
            self.must_capture = newer.must_capture;
        }
        if newer.sequential_capture.is_some() {
            self.sequential_capture = newer.sequential_capture;
        }
    }
}

impl GameState {
    pub fn new(rules: RuleSet) -> Self {
        GameState::from_board(Board::initialize(), Player::One, rules)
    }

    /// Start from an arbitrary position.
    pub fn from_board(board: Board, to_move: Player, rules: RuleSet) -> Self {
        GameState {
            board,
            turn: TurnState {
                current_player: to_move,
                must_capture: has_captures(&board, to_move),
                active_chain: None,
            },
            result: evaluate_result(&board, to_move, &rules),
            selected: None,
            rules,
        }
    }

    pub fn current_player(&self) -> Player {
        self.turn.current_player
    }

    pub fn is_over(&self) -> bool {
        self.result.is_over()
    }

    pub fn sequential_capture(&self) -> bool {
        self.turn.active_chain.is_some()
    }

    /// Moves of the side to move, captures as maximal chains.
    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_over() {
            return Vec::new();
        }
        legal_moves(&self.board, self.turn.current_player, self.turn.active_chain)
    }

    /// Moves of the side to move, captures as single jumps.
    pub fn legal_steps(&self) -> Vec<Move> {
        if self.is_over() {
            return Vec::new();
        }
        legal_steps(&self.board, self.turn.current_player, self.turn.active_chain)
    }

    /// Play a full chain or a single step of the side to move.
    pub fn apply(&self, mv: &Move) -> Result<GameState, GameError> {
        if self.is_over() {
            return Err(GameError::GameOver);
        }
        let piece = self.board.piece_at(mv.from)?;
        if piece.owner != self.turn.current_player {
            return Err(GameError::NotYourPiece(mv.from));
        }
        if !self.legal_moves().contains(mv) && !self.legal_steps().contains(mv) {
            return Err(GameError::InvalidMove {
                from: mv.from,
                to: mv.to,
            });
        }
        let board = apply_move(&self.board, mv, &self.rules)?;
        Ok(self.transition(board, mv))
    }

    fn transition(&self, board: Board, mv: &Move) -> GameState {
        let player = self.turn.current_player;
        if mv.is_capture() && continues_chain(&board, mv.to) {
            return GameState {
                board,
                turn: TurnState {
                    current_player: player,
                    must_capture: true,
                    active_chain: Some(mv.to),
                },
                result: GameResult::InProgress,
                selected: Some(mv.to),
                rules: self.rules,
            };
        }
        let next = player.opponent();
        GameState {
            board,
            turn: TurnState {
                current_player: next,
                must_capture: has_captures(&board, next),
                active_chain: None,
            },
            result: evaluate_result(&board, next, &self.rules),
            selected: None,
            rules: self.rules,
        }
    }

    fn with_selection(&self, selected: Option<Position>) -> GameState {
        GameState {
            selected,
            ..self.clone()
        }
    }

    /// Interpret a click on `pos` by the side to move.
    pub fn click(&self, pos: Position) -> ClickOutcome {
        if self.is_over() {
            return ClickOutcome::Ignored;
        }
        let cell = match self.board.cell(pos) {
            None => return ClickOutcome::Rejected(self.clone(), GameError::OutOfBounds(pos)),
            Some(cell) => cell,
        };
        let player = self.turn.current_player;

        // mid-chain only the capture destinations of the chained piece count
        if let Some(chain) = self.turn.active_chain {
            return match self.step_to(chain, pos) {
                Some(mv) => self.play(&mv),
                None => ClickOutcome::Ignored,
            };
        }

        let own_piece = matches!(cell, Some(piece) if piece.owner == player);
        if own_piece {
            if self.turn.must_capture && capture_steps(&self.board, pos).is_empty() {
                return ClickOutcome::Ignored;
            }
            return ClickOutcome::Selected(self.with_selection(Some(pos)));
        }

        let from = match self.selected {
            Some(from) => from,
            None => return ClickOutcome::Ignored,
        };
        if self.turn.must_capture {
            // an invalid target keeps the piece selected
            return match self.step_to(from, pos) {
                Some(mv) => self.play(&mv),
                None => ClickOutcome::Ignored,
            };
        }
        if is_valid_move(&self.board, from, pos) {
            self.play(&Move::simple(from, pos))
        } else {
            ClickOutcome::Rejected(
                self.with_selection(None),
                GameError::InvalidMove { from, to: pos },
            )
        }
    }

    fn step_to(&self, from: Position, to: Position) -> Option<Move> {
        self.legal_steps()
            .into_iter()
            .find(|mv| mv.from == from && mv.to == to && mv.is_capture())
    }

    fn play(&self, mv: &Move) -> ClickOutcome {
        match self.apply(mv) {
            Ok(next) => ClickOutcome::Moved(next),
            Err(e) => ClickOutcome::Rejected(self.with_selection(None), e),
        }
    }

    pub fn is_selected(&self, pos: Position) -> bool {
        self.selected == Some(pos)
    }

    /// Simple-move target of the selected piece. Never true while a capture
    /// is mandatory.
    pub fn is_move_destination(&self, pos: Position) -> bool {
        match self.selected {
            Some(from) if !self.turn.must_capture => is_valid_move(&self.board, from, pos),
            _ => false,
        }
    }

    pub fn is_capture_destination(&self, pos: Position) -> bool {
        match self.selected {
            Some(from) => capture_steps(&self.board, from).iter().any(|mv| mv.to == pos),
            None => false,
        }
    }

    /// full snapshot for relaying
    pub fn to_update(&self) -> GameStateUpdate {
        GameStateUpdate {
            board: Some(self.board),
            current_player: Some(self.turn.current_player),
            game_over: Some(self.result),
            selected_piece: Some(self.selected),
            must_capture: Some(self.turn.must_capture),
            sequential_capture: Some(self.sequential_capture()),
        }
    }

    /// Merge a relayed snapshot. The sender is trusted: nothing is replayed
    /// through the rules.
    pub fn apply_update(&self, update: &GameStateUpdate) -> GameState {
        let board = update.board.unwrap_or(self.board);
        let current_player = update.current_player.unwrap_or(self.turn.current_player);
        let selected = update.selected_piece.unwrap_or(self.selected);
        let sequential = update
            .sequential_capture
            .unwrap_or_else(|| self.sequential_capture());
        let must_capture = update
            .must_capture
            .unwrap_or_else(|| has_captures(&board, current_player));
        GameState {
            board,
            turn: TurnState {
                current_player,
                must_capture,
                active_chain: if sequential { selected } else { None },
            },
            result: update.game_over.unwrap_or(self.result),
            selected,
            rules: self.rules,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(RuleSet::default())
    }
}
