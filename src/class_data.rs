//! Basic Rules class data.
//!
//! The 1983 set treats race-as-class: the seven playable classes are
//! cleric, fighter, magic-user, thief, dwarf, elf, and halfling. This
//! module carries the static per-class tables: hit die, prime
//! requisites, minimum-score requirements, infravision, and spellcasting.

use crate::character::Ability;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven Basic classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassId {
    Cleric,
    Fighter,
    MagicUser,
    Thief,
    Dwarf,
    Elf,
    Halfling,
}

/// Character alignment on the Basic three-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Lawful,
    Neutral,
    Chaotic,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Lawful => write!(f, "Lawful"),
            Alignment::Neutral => write!(f, "Neutral"),
            Alignment::Chaotic => write!(f, "Chaotic"),
        }
    }
}

/// Class-specific data for character creation and play.
pub struct ClassData {
    pub name: &'static str,
    /// Sides of the per-level hit die.
    pub hit_die: u32,
    /// Abilities whose lowest score drives the XP bonus.
    pub prime_requisites: &'static [Ability],
    /// Minimum ability scores required to take the class.
    pub requirements: &'static [(Ability, u8)],
    /// Infravision range in feet, for the demi-humans.
    pub infravision_feet: Option<u32>,
    /// Dwarves spot stonework traps; thieves find traps as a skill.
    pub trap_sense: bool,
    pub spellcaster: bool,
    /// Base movement rate in feet per turn, unencumbered.
    pub base_movement: u32,
    pub description: &'static str,
}

impl ClassId {
    pub fn all() -> [ClassId; 7] {
        [
            ClassId::Cleric,
            ClassId::Fighter,
            ClassId::MagicUser,
            ClassId::Thief,
            ClassId::Dwarf,
            ClassId::Elf,
            ClassId::Halfling,
        ]
    }

    /// Get the static data table for this class.
    pub fn data(&self) -> &'static ClassData {
        match self {
            ClassId::Cleric => &ClassData {
                name: "Cleric",
                hit_die: 6,
                prime_requisites: &[Ability::Wisdom],
                requirements: &[(Ability::Constitution, 9)],
                infravision_feet: None,
                trap_sense: false,
                spellcaster: true,
                base_movement: 120,
                description: "A human dedicated to a great and worthy cause, \
                              channeling holy power against the undead.",
            },
            ClassId::Fighter => &ClassData {
                name: "Fighter",
                hit_die: 8,
                prime_requisites: &[Ability::Strength],
                requirements: &[(Ability::Strength, 9)],
                infravision_feet: None,
                trap_sense: false,
                spellcaster: false,
                base_movement: 120,
                description: "A human warrior, master of weapons and armor.",
            },
            ClassId::MagicUser => &ClassData {
                name: "Magic-User",
                hit_die: 4,
                prime_requisites: &[Ability::Intelligence],
                requirements: &[(Ability::Intelligence, 9)],
                infravision_feet: None,
                trap_sense: false,
                spellcaster: true,
                base_movement: 120,
                description: "A human student of arcane arts, frail but \
                              wielding the mightiest spells.",
            },
            ClassId::Thief => &ClassData {
                name: "Thief",
                hit_die: 4,
                prime_requisites: &[Ability::Dexterity],
                requirements: &[(Ability::Dexterity, 9)],
                infravision_feet: None,
                trap_sense: true,
                spellcaster: false,
                base_movement: 120,
                description: "A human expert in stealth, locks, and finding \
                              traps before they find you.",
            },
            ClassId::Dwarf => &ClassData {
                name: "Dwarf",
                hit_die: 8,
                prime_requisites: &[Ability::Strength],
                requirements: &[(Ability::Constitution, 9), (Ability::Strength, 9)],
                infravision_feet: Some(60),
                trap_sense: true,
                spellcaster: false,
                base_movement: 120,
                description: "A stout demi-human miner, hardy in battle and \
                              sharp-eyed underground.",
            },
            ClassId::Elf => &ClassData {
                name: "Elf",
                hit_die: 6,
                prime_requisites: &[Ability::Strength, Ability::Intelligence],
                requirements: &[(Ability::Intelligence, 9), (Ability::Strength, 9)],
                infravision_feet: Some(60),
                trap_sense: false,
                spellcaster: true,
                base_movement: 120,
                description: "A graceful demi-human who fights with sword and \
                              spell alike.",
            },
            ClassId::Halfling => &ClassData {
                name: "Halfling",
                hit_die: 6,
                prime_requisites: &[Ability::Strength, Ability::Dexterity],
                requirements: &[(Ability::Constitution, 9), (Ability::Dexterity, 9)],
                infravision_feet: None,
                trap_sense: false,
                spellcaster: false,
                base_movement: 120,
                description: "A small, nimble demi-human, hard to hit and \
                              deadly with thrown weapons.",
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.data().name
    }

    pub fn hit_die(&self) -> u32 {
        self.data().hit_die
    }

    pub fn is_spellcaster(&self) -> bool {
        self.data().spellcaster
    }

    pub fn has_infravision(&self) -> bool {
        self.data().infravision_feet.is_some()
    }

    /// Levels between each THAC0 improvement.
    pub fn thac0_step(&self) -> u8 {
        match self {
            ClassId::Fighter | ClassId::Dwarf => 3,
            _ => 4,
        }
    }

    /// Chance (percent) of spotting a trap while searching.
    ///
    /// Trap-sense classes search at 2-in-6, everyone else at 1-in-6.
    pub fn trap_detect_percent(&self) -> u32 {
        if self.data().trap_sense {
            33
        } else {
            17
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_dice_match_rulebook() {
        assert_eq!(ClassId::Cleric.hit_die(), 6);
        assert_eq!(ClassId::Fighter.hit_die(), 8);
        assert_eq!(ClassId::MagicUser.hit_die(), 4);
        assert_eq!(ClassId::Thief.hit_die(), 4);
        assert_eq!(ClassId::Dwarf.hit_die(), 8);
        assert_eq!(ClassId::Elf.hit_die(), 6);
        assert_eq!(ClassId::Halfling.hit_die(), 6);
    }

    #[test]
    fn test_demi_human_infravision() {
        assert!(ClassId::Dwarf.has_infravision());
        assert!(ClassId::Elf.has_infravision());
        assert!(!ClassId::Halfling.has_infravision());
        assert!(!ClassId::Fighter.has_infravision());
    }

    #[test]
    fn test_spellcasters() {
        let casters: Vec<ClassId> = ClassId::all()
            .into_iter()
            .filter(|c| c.is_spellcaster())
            .collect();
        assert_eq!(
            casters,
            vec![ClassId::Cleric, ClassId::MagicUser, ClassId::Elf]
        );
    }

    #[test]
    fn test_elf_has_two_prime_requisites() {
        let data = ClassId::Elf.data();
        assert_eq!(
            data.prime_requisites,
            &[Ability::Strength, Ability::Intelligence]
        );
    }

    #[test]
    fn test_serde_kebab_case_ids() {
        let json = serde_json::to_string(&ClassId::MagicUser).unwrap();
        assert_eq!(json, "\"magic-user\"");
        let back: ClassId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClassId::MagicUser);
    }
}
