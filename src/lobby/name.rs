use std::fmt::{Display, Formatter};
use unicode_segmentation::UnicodeSegmentation;

pub const MAX_PLAYER_NAME_GRAPHEMES: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidPlayerName {
    Empty,
    TooLong,
    BadCharacter,
}

impl Display for InvalidPlayerName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidPlayerName::Empty => f.write_str("Player name is empty"),
            InvalidPlayerName::TooLong => write!(
                f,
                "Player name is longer than {MAX_PLAYER_NAME_GRAPHEMES} characters"
            ),
            InvalidPlayerName::BadCharacter => f.write_str("Player name contains bad characters"),
        }
    }
}

/// Trim and check a player name. Length counts user-perceived characters.
pub fn validate_player_name(name: &str) -> Result<String, InvalidPlayerName> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InvalidPlayerName::Empty);
    }
    if name.chars().any(char::is_control) {
        return Err(InvalidPlayerName::BadCharacter);
    }
    if name.graphemes(true).count() > MAX_PLAYER_NAME_GRAPHEMES {
        return Err(InvalidPlayerName::TooLong);
    }
    Ok(name.to_string())
}
