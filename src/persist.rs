//! Save-game serialization.
//!
//! A [`SavedGame`] snapshots the character and the adventure session
//! as one versioned JSON document. Loading rejects documents written
//! by an incompatible version instead of misreading them.

use crate::adventure::AdventureSession;
use crate::character::Character;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Bump on any breaking change to the save layout.
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Save data error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Incompatible save version: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// A complete snapshot of a game in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGame {
    pub version: u32,
    pub character: Character,
    pub session: AdventureSession,
}

impl SavedGame {
    pub fn new(character: Character, session: AdventureSession) -> Self {
        SavedGame {
            version: SAVE_VERSION,
            character,
            session,
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize and check the version stamp.
    pub fn from_json(data: &str) -> Result<Self, PersistError> {
        let saved: SavedGame = serde_json::from_str(data)?;
        if saved.version != SAVE_VERSION {
            return Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: saved.version,
            });
        }
        debug!(room = %saved.session.current_room, "save loaded");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::AdventureSession;
    use crate::character::Character;
    use crate::scenarios::your_first_adventure;
    use crate::testing::leveled_fighter;

    #[test]
    fn test_round_trip_preserves_state() {
        let mut character = leveled_fighter();
        let mut session = AdventureSession::new(your_first_adventure());
        character.take_damage(3);
        session.defeated.insert("goblin_1".to_string());
        session.has_rested = true;

        let json = SavedGame::new(character.clone(), session.clone())
            .to_json()
            .unwrap();
        let loaded = SavedGame::from_json(&json).unwrap();

        assert_eq!(loaded.version, SAVE_VERSION);
        assert_eq!(loaded.character.hp.current, character.hp.current);
        assert_eq!(loaded.character.name, character.name);
        assert!(loaded.session.has_defeated("goblin_1"));
        assert!(loaded.session.has_rested);
        assert_eq!(loaded.session.current_room, session.current_room);
    }

    #[test]
    fn test_mid_creation_character_round_trips() {
        let mut character = Character::new();
        character.set_name("Morgan");
        let json = SavedGame::new(
            character.clone(),
            AdventureSession::new(your_first_adventure()),
        )
        .to_json()
        .unwrap();
        let loaded = SavedGame::from_json(&json).unwrap();
        assert_eq!(loaded.character.creation_step, character.creation_step);
        assert!(loaded.character.class.is_none());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut saved = SavedGame::new(
            leveled_fighter(),
            AdventureSession::new(your_first_adventure()),
        );
        saved.version = 99;
        let json = serde_json::to_string(&saved).unwrap();
        assert!(matches!(
            SavedGame::from_json(&json),
            Err(PersistError::VersionMismatch {
                expected: SAVE_VERSION,
                found: 99
            })
        ));
    }

    #[test]
    fn test_garbage_is_a_json_error() {
        assert!(matches!(
            SavedGame::from_json("not a save"),
            Err(PersistError::Json(_))
        ));
    }
}
