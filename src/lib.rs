//! 1983 D&D Basic Rules game engine.
//!
//! This crate provides:
//! - Dice notation parsing and rolling with pluggable randomness
//! - Basic Rules mechanics: ability modifiers, descending AC, THAC0
//! - Character creation and the full character sheet
//! - Turn-based combat with initiative, morale, and fleeing
//! - First-level spellcasting for clerics, magic-users, and elves
//! - Room-graph adventures with traps, treasure, and a light clock
//! - Versioned JSON save games
//!
//! # Quick Start
//!
//! ```ignore
//! use redbox::{AdventureSession, Character, ClassId, scenarios};
//! use redbox::dice::{default_roller, roll_ability_scores};
//!
//! let mut roller = default_roller();
//! let mut character = Character::new();
//! character.set_abilities(roll_ability_scores(&mut roller).scores())?;
//! character.set_class(ClassId::Fighter, &mut roller)?;
//!
//! let mut session = AdventureSession::new(scenarios::your_first_adventure());
//! ```

pub mod adventure;
pub mod character;
pub mod class_data;
pub mod combat;
pub mod dice;
pub mod items;
pub mod monster;
pub mod persist;
pub mod rules;
pub mod scenarios;
pub mod spells;
pub mod testing;
pub mod treasure;

// Primary public API
pub use adventure::{Adventure, AdventureError, AdventureSession, Room, RoomState};
pub use character::{Ability, AbilityScores, Character, CharacterError, CreationStep, HitPoints};
pub use class_data::{Alignment, ClassId};
pub use combat::{CombatError, CombatPhase, Encounter};
pub use dice::{roll_ability_scores, DiceError, DiceExpression, DiceRoller};
pub use items::{ItemInstance, UseContext};
pub use monster::{EnemyInstance, Monster};
pub use persist::{PersistError, SavedGame, SAVE_VERSION};
pub use spells::{Spell, SpellError, SpellOutcome};
pub use treasure::Treasure;
