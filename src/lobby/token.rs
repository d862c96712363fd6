use anyhow::{Error, Result};
use bincode::{Decode, Encode};
use rand::prelude::*;
use std::fmt::{Display, Formatter};

const CODE_LENGTH: usize = 6;
const CODE_CHARS: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short room code handed out to the room creator, e.g. `K3ZQ8A`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Encode, Decode)]
pub struct RoomCode(pub(crate) [u8; CODE_LENGTH]);

impl RoomCode {
    pub(crate) fn random<R: Rng>(rng: &mut R) -> Self {
        let mut inner = [0u8; CODE_LENGTH];
        for c in inner.iter_mut() {
            // CODE_CHARS is not empty
            *c = *CODE_CHARS.choose(rng).unwrap_or(&b'A');
        }
        RoomCode(inner)
    }

    /// Parse a client supplied code, case-insensitively.
    pub fn from_code(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.chars().count() != CODE_LENGTH {
            return Err(Error::msg("room code must be 6 characters"));
        }
        let mut out = [0u8; CODE_LENGTH];
        for (t, ch) in out.iter_mut().zip(code.chars()) {
            let ch = ch.to_ascii_uppercase();
            if !ch.is_ascii() || !CODE_CHARS.contains(&(ch as u8)) {
                return Err(Error::msg("invalid room code char"));
            }
            *t = ch as u8;
        }
        Ok(RoomCode(out))
    }

    pub fn as_code(&self) -> String {
        self.0.iter().map(|&c| c as char).collect()
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_code())
    }
}

#[cfg(test)]
mod test_room_code {
    use super::*;

    #[test]
    fn test_decode() {
        let code = "AB12CZ";
        assert_eq!(RoomCode::from_code(code).unwrap().as_code(), code);
    }

    #[test]
    fn test_case_normalized() {
        assert_eq!(
            RoomCode::from_code("ab12cz").unwrap(),
            RoomCode::from_code("AB12CZ").unwrap()
        );
        assert_eq!(RoomCode::from_code(" x9y8z7 ").unwrap().to_string(), "X9Y8Z7");
    }

    #[test]
    fn test_error_length() {
        assert!(RoomCode::from_code("ABC").is_err());
        assert!(RoomCode::from_code("ABCDEFG").is_err());
        assert!(RoomCode::from_code("").is_err());
    }

    #[test]
    fn test_error_char() {
        assert!(RoomCode::from_code("AB-12C").is_err());
        assert!(RoomCode::from_code("观自在菩萨行").is_err());
    }

    #[test]
    fn test_random_gen() {
        let mut rng = thread_rng();
        for _ in 0..1000 {
            let code = RoomCode::random(&mut rng);
            assert!(code.0.iter().all(|c| CODE_CHARS.contains(c)));
            assert_eq!(RoomCode::from_code(&code.as_code()).unwrap(), code)
        }
    }
}
