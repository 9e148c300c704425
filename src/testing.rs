//! Deterministic test scaffolding.
//!
//! [`ScriptedRoller`] feeds exact die faces to anything that takes a
//! [`DiceRoller`], so tests can force the precise sequence of rolls a
//! scenario needs. The builders here produce ready-to-play characters
//! and monsters with known derived stats.

use crate::character::{AbilityScores, Character};
use crate::class_data::{Alignment, ClassId};
use crate::dice::DiceRoller;
use crate::monster::Monster;
use std::collections::VecDeque;

/// A roller that replays a fixed script of results.
///
/// Panics when the script runs dry, which in a test means the code
/// under test rolled more dice than the scenario accounted for.
#[derive(Debug, Clone)]
pub struct ScriptedRoller {
    script: VecDeque<u32>,
}

impl ScriptedRoller {
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        ScriptedRoller {
            script: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DiceRoller for ScriptedRoller {
    fn roll(&mut self, sides: u32) -> u32 {
        match self.script.pop_front() {
            Some(result) => {
                debug_assert!(
                    result >= 1 && result <= sides.max(1),
                    "scripted roll {result} is outside 1..={sides}"
                );
                result
            }
            None => panic!("scripted roller ran out of results (rolling d{sides})"),
        }
    }
}

fn finish(mut character: Character, name: &str, spells: &[&str]) -> Character {
    character.set_alignment(Alignment::Lawful).unwrap();
    if character.class.map(|c| c.is_spellcaster()).unwrap_or(false) {
        character.set_spells(spells).unwrap();
    }
    character.set_name(name);
    character.finalize().unwrap();
    character
}

/// A finalized level-1 fighter: STR 16, DEX 13, CON 12. Derived stats
/// are HP 8/8, AC 8, THAC0 19, 10% XP bonus.
pub fn leveled_fighter() -> Character {
    let mut character = Character::new();
    character
        .set_abilities(AbilityScores::new(16, 9, 9, 13, 12, 9))
        .unwrap();
    let mut roller = ScriptedRoller::new([4, 4, 4]);
    character.set_class(ClassId::Fighter, &mut roller).unwrap();
    finish(character, "Morgan Ironhand", &[])
}

/// A finalized level-1 magic-user knowing the given spells, with one
/// first-level slot and no ability modifiers.
pub fn leveled_caster(spells: &[&str]) -> Character {
    let mut character = Character::new();
    character
        .set_abilities(AbilityScores::new(9, 16, 9, 9, 9, 9))
        .unwrap();
    let mut roller = ScriptedRoller::new([3, 3, 3]);
    character.set_class(ClassId::MagicUser, &mut roller).unwrap();
    finish(character, "Zanzer the Apprentice", spells)
}

/// A finalized level-1 thief, for trap-sense scenarios.
pub fn leveled_thief() -> Character {
    let mut character = Character::new();
    character
        .set_abilities(AbilityScores::new(9, 9, 9, 13, 9, 9))
        .unwrap();
    let mut roller = ScriptedRoller::new([3, 3, 3]);
    character.set_class(ClassId::Thief, &mut roller).unwrap();
    finish(character, "Whisper", &[])
}

/// The tutorial goblin's stat block.
pub fn goblin_template() -> Monster {
    Monster::new("goblin_1", "Goblin", "goblin")
        .with_hp(4, 4)
        .with_ac(6)
        .with_damage("1d6")
        .with_xp(5)
        .with_morale(7)
        .with_hit_dice(1)
        .with_defeated_text("The goblin falls with a final shriek. Its treasure is now yours!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_roller_replays_in_order() {
        let mut roller = ScriptedRoller::new([3, 1, 6]);
        assert_eq!(roller.roll(6), 3);
        assert_eq!(roller.roll(6), 1);
        assert_eq!(roller.roll(6), 6);
        assert_eq!(roller.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "ran out of results")]
    fn test_scripted_roller_panics_when_exhausted() {
        let mut roller = ScriptedRoller::new([2]);
        roller.roll(6);
        roller.roll(6);
    }

    #[test]
    fn test_leveled_fighter_stats() {
        let fighter = leveled_fighter();
        assert!(fighter.is_created);
        assert_eq!(fighter.hp.max, 8);
        assert_eq!(fighter.ac, 8);
        assert_eq!(fighter.thac0, 19);
        assert_eq!(fighter.xp_bonus_percent, 10);
    }

    #[test]
    fn test_leveled_caster_knows_requested_spells() {
        let caster = leveled_caster(&["magic_missile", "sleep"]);
        assert!(caster.knows_spell("magic_missile"));
        assert!(caster.knows_spell("sleep"));
        assert_eq!(caster.spell_slots.available(1), 1);
    }
}
