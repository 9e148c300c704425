//! The Basic Rules calculator.
//!
//! Pure derivations from the 1983 rulebook: ability modifiers, hit
//! points, descending armor class, THAC0, prime-requisite XP bonuses,
//! class eligibility, and encumbrance. Nothing here holds state; the
//! character aggregate calls in whenever a derived stat needs
//! recomputing.

use crate::character::AbilityScores;
use crate::class_data::ClassId;
use crate::dice::{roll_dice_sum, DiceRoller};
use crate::items::{ArmorKind, ItemInstance};
use thiserror::Error;

/// Error type for rule calculations.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Invalid ability score: {0} (must be 3-18)")]
    InvalidAbilityScore(u8),
}

/// Unarmored descending AC.
pub const BASE_ARMOR_CLASS: i32 = 9;

/// THAC0 for every first-level character.
pub const BASE_THAC0: i32 = 19;

/// The Basic ability modifier step table.
///
/// 3 gives -3, 4-5 give -2, 6-8 give -1, 9-12 give 0, 13-15 give +1,
/// 16-17 give +2, and 18 gives +3. Scores outside 3-18 cannot be
/// rolled on 3d6 and are rejected.
pub fn modifier(score: u8) -> Result<i8, RulesError> {
    match score {
        3 => Ok(-3),
        4..=5 => Ok(-2),
        6..=8 => Ok(-1),
        9..=12 => Ok(0),
        13..=15 => Ok(1),
        16..=17 => Ok(2),
        18 => Ok(3),
        other => Err(RulesError::InvalidAbilityScore(other)),
    }
}

/// Maximum hit points for a character of the given class and level.
///
/// Level 1 takes the full hit die plus the constitution modifier;
/// each further level rolls the class hit die, adds the modifier, and
/// floors the gain at 1. The total can never drop below 1.
pub fn max_hit_points(
    class: ClassId,
    constitution: u8,
    level: u8,
    roller: &mut dyn DiceRoller,
) -> Result<i32, RulesError> {
    let con_mod = modifier(constitution)? as i32;
    let die = class.hit_die() as i32;

    let mut hp = (die + con_mod).max(1);
    for _ in 1..level {
        let rolled = roller.roll(class.hit_die()) as i32;
        hp += (rolled + con_mod).max(1);
    }
    Ok(hp)
}

/// Descending armor class: lower is better.
///
/// Dexterity and armor bonuses both subtract from the base.
pub fn armor_class(base: i32, dexterity: u8, armor_bonus: i32) -> Result<i32, RulesError> {
    let dex_mod = modifier(dexterity)? as i32;
    Ok(base - dex_mod - armor_bonus)
}

/// AC granted by worn armor, before dexterity.
pub fn armor_ac(armor: ArmorKind, has_shield: bool) -> i32 {
    let base = match armor {
        ArmorKind::None => 9,
        ArmorKind::Leather => 7,
        ArmorKind::ChainMail => 5,
        ArmorKind::PlateMail => 3,
    };
    if has_shield {
        base - 1
    } else {
        base
    }
}

/// THAC0 for a class at a level.
///
/// Everyone starts at 19. Fighters and dwarves improve by 1 every
/// three levels, everyone else every four.
pub fn thac0(class: ClassId, level: u8) -> i32 {
    let step = class.thac0_step() as i32;
    BASE_THAC0 - (level.max(1) as i32 - 1) / step
}

/// The d20 result needed to hit a target with the given descending AC.
pub fn to_hit_target(thac0: i32, target_ac: i32) -> i32 {
    thac0 - target_ac
}

/// Prime-requisite XP bonus percentage.
///
/// Uses the lowest prime requisite: 16+ earns 10%, 13+ earns 5%.
pub fn xp_bonus(class: ClassId, scores: &AbilityScores) -> Result<u8, RulesError> {
    let mut lowest: Option<u8> = None;
    for &ability in class.data().prime_requisites {
        let score = scores.get(ability);
        modifier(score)?;
        lowest = Some(match lowest {
            Some(current) => current.min(score),
            None => score,
        });
    }
    Ok(match lowest {
        Some(score) if score >= 16 => 10,
        Some(score) if score >= 13 => 5,
        _ => 0,
    })
}

/// Whether a set of ability scores qualifies for a class.
#[derive(Debug, Clone)]
pub struct Eligibility {
    pub allowed: bool,
    /// Human-readable explanation when `allowed` is false.
    pub reason: Option<String>,
}

/// Check the class's minimum-score requirements.
pub fn class_eligibility(class: ClassId, scores: &AbilityScores) -> Eligibility {
    for &(ability, minimum) in class.data().requirements {
        let score = scores.get(ability);
        if score < minimum {
            return Eligibility {
                allowed: false,
                reason: Some(format!(
                    "{} requires {} {}+ (you have {})",
                    class.name(),
                    ability.name(),
                    minimum,
                    score
                )),
            };
        }
    }
    Eligibility {
        allowed: true,
        reason: None,
    }
}

/// Total carried weight in coins.
pub fn encumbrance(items: &[ItemInstance]) -> u32 {
    items.iter().map(|item| item.weight * item.quantity).sum()
}

/// Movement rate in feet per turn for a carried load.
///
/// Thresholds from the rulebook's encumbrance table, scaled off a
/// 120-foot base.
pub fn movement_rate(encumbrance: u32, base: u32) -> u32 {
    match encumbrance {
        0..=400 => base,
        401..=800 => base * 3 / 4,
        801..=1200 => base / 2,
        1201..=1600 => base / 4,
        _ => 0,
    }
}

/// Starting gold: 3d6 x 10 gold pieces.
pub fn starting_gold(roller: &mut dyn DiceRoller) -> u32 {
    roll_dice_sum(roller, 3, 6) * 10
}
