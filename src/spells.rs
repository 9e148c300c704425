//! The level-1 spell catalog and the casting engine.
//!
//! Spell effects are a closed tagged union rather than free-form
//! script: healing, auto-hit damage, timed buffs, utility, and
//! conditions. Casting spends the slot before any effect dice are
//! rolled; a bad roll never refunds the slot.

use crate::character::{BuffStat, Character, CharacterError, SpellSlots};
use crate::class_data::ClassId;
use crate::dice::{DiceError, DiceExpression, DiceRoller};
use crate::monster::{ConditionKind, EnemyInstance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

/// Error type for spellcasting.
#[derive(Debug, Error)]
pub enum SpellError {
    #[error("Unknown spell: {0}")]
    UnknownSpell(String),
    #[error("You don't know {0}")]
    NotKnown(String),
    #[error("{0} needs an enemy target")]
    NoTarget(String),
    #[error(transparent)]
    Character(#[from] CharacterError),
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// What a utility spell does when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    /// Conjured light; the adventure layer treats it as a lit source.
    Illumination,
    DetectMagic,
    ReadMagic,
}

/// The closed set of spell effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpellEffect {
    /// Restores hit points to the caster.
    Healing { formula: String },
    /// Damages an enemy; `auto_hit` bypasses attack resolution.
    Damage { formula: String, auto_hit: bool },
    /// Timed bonus on the caster, duration in combat rounds.
    Buff {
        stat: BuffStat,
        bonus: i32,
        duration: u32,
    },
    Utility { kind: UtilityKind },
    /// Imposes a condition; `hd_affected` is the dice pool of hit
    /// dice the spell can overcome (Sleep's 2d8).
    Condition {
        condition: ConditionKind,
        hd_affected: Option<String>,
    },
}

/// A spell definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub level: u8,
    pub classes: Vec<ClassId>,
    pub range: String,
    pub duration: String,
    pub description: String,
    pub flavor: String,
    pub effect: SpellEffect,
}

// ============================================================================
// Spell database
// ============================================================================

/// Global spell database, keyed by id.
static SPELL_DATABASE: LazyLock<HashMap<String, Spell>> = LazyLock::new(build_spell_database);

/// Look up a spell by id.
///
/// A miss is logged and returns `None`; callers decide whether that
/// is a hard error (casting) or a skip (creation).
pub fn get_spell(id: &str) -> Option<&'static Spell> {
    let found = SPELL_DATABASE.get(id);
    if found.is_none() {
        warn!(spell_id = id, "unknown spell id requested");
    }
    found
}

/// All spells a class can learn at a given spell level.
pub fn spells_for_class(class: ClassId, level: u8) -> Vec<&'static Spell> {
    let mut spells: Vec<&'static Spell> = SPELL_DATABASE
        .values()
        .filter(|s| s.level == level && s.classes.contains(&class))
        .collect();
    spells.sort_by(|a, b| a.id.cmp(&b.id));
    spells
}

/// Spell slots for a class at a character level.
///
/// Non-casters get none; casters follow the Basic progression (one
/// first-level slot at level 1, two at level 2, a second-level slot
/// joining at level 3).
pub fn starting_slots(class: ClassId, level: u8) -> SpellSlots {
    if !class.is_spellcaster() {
        return SpellSlots::none();
    }
    match level {
        0 | 1 => SpellSlots::with_max([1, 0, 0]),
        2 => SpellSlots::with_max([2, 0, 0]),
        _ => SpellSlots::with_max([2, 1, 0]),
    }
}

fn build_spell_database() -> HashMap<String, Spell> {
    let mut db = HashMap::new();

    let mut add = |spell: Spell| {
        db.insert(spell.id.clone(), spell);
    };

    // ========================================================================
    // Cleric spells
    // ========================================================================

    add(Spell {
        id: "cure_light_wounds".to_string(),
        name: "Cure Light Wounds".to_string(),
        level: 1,
        classes: vec![ClassId::Cleric],
        range: "Touch".to_string(),
        duration: "Instantaneous".to_string(),
        description: "You touch a creature and channel healing energy. The target regains hit points.".to_string(),
        flavor: "A warm golden light flows from your hand, mending wounds and restoring vitality.".to_string(),
        effect: SpellEffect::Healing {
            formula: "1d6+1".to_string(),
        },
    });

    add(Spell {
        id: "protection_from_evil".to_string(),
        name: "Protection from Evil".to_string(),
        level: 1,
        classes: vec![ClassId::Cleric],
        range: "Touch".to_string(),
        duration: "6 turns".to_string(),
        description: "You ward a creature against attacks from evil creatures. The target gains a bonus to armor class against evil opponents.".to_string(),
        flavor: "A shimmering barrier of holy light surrounds the target, repelling evil.".to_string(),
        effect: SpellEffect::Buff {
            stat: BuffStat::ArmorClass,
            bonus: 1,
            duration: 6,
        },
    });

    add(Spell {
        id: "light".to_string(),
        name: "Light".to_string(),
        level: 1,
        classes: vec![ClassId::Cleric, ClassId::MagicUser, ClassId::Elf],
        range: "120 feet".to_string(),
        duration: "6 turns plus 1 turn per level".to_string(),
        description: "You create a sphere of light that illuminates the area. The light is as bright as a torch and moves with the target object.".to_string(),
        flavor: "A soft, steady radiance springs forth, pushing back the darkness.".to_string(),
        effect: SpellEffect::Utility {
            kind: UtilityKind::Illumination,
        },
    });

    // ========================================================================
    // Magic-user spells (elves share the list)
    // ========================================================================

    add(Spell {
        id: "magic_missile".to_string(),
        name: "Magic Missile".to_string(),
        level: 1,
        classes: vec![ClassId::MagicUser, ClassId::Elf],
        range: "150 feet".to_string(),
        duration: "Instantaneous".to_string(),
        description: "You create a glowing dart of magical force that unerringly strikes its target. The missile automatically hits and deals damage.".to_string(),
        flavor: "A bolt of crackling energy streaks from your fingertip and strikes true.".to_string(),
        effect: SpellEffect::Damage {
            formula: "1d4+1".to_string(),
            auto_hit: true,
        },
    });

    add(Spell {
        id: "shield".to_string(),
        name: "Shield".to_string(),
        level: 1,
        classes: vec![ClassId::MagicUser, ClassId::Elf],
        range: "Self".to_string(),
        duration: "2 turns".to_string(),
        description: "An invisible barrier of magical force appears and protects you. You gain a bonus to armor class.".to_string(),
        flavor: "An invisible wall of force shimmers into existence around you.".to_string(),
        effect: SpellEffect::Buff {
            stat: BuffStat::ArmorClass,
            bonus: 4,
            duration: 2,
        },
    });

    add(Spell {
        id: "sleep".to_string(),
        name: "Sleep".to_string(),
        level: 1,
        classes: vec![ClassId::MagicUser, ClassId::Elf],
        range: "240 feet".to_string(),
        duration: "4d4 turns".to_string(),
        description: "You send creatures into a magical slumber. Affects 2d8 hit dice of creatures, starting with the weakest. No saving throw.".to_string(),
        flavor: "You weave a subtle pattern of drowsiness that settles over your foes.".to_string(),
        effect: SpellEffect::Condition {
            condition: ConditionKind::Asleep,
            hd_affected: Some("2d8".to_string()),
        },
    });

    add(Spell {
        id: "charm_person".to_string(),
        name: "Charm Person".to_string(),
        level: 1,
        classes: vec![ClassId::MagicUser, ClassId::Elf],
        range: "120 feet".to_string(),
        duration: "Special".to_string(),
        description: "You make a humanoid creature regard you as a trusted friend. The target must save vs spells or be charmed.".to_string(),
        flavor: "You reach out with your mind, planting seeds of friendship and trust.".to_string(),
        effect: SpellEffect::Condition {
            condition: ConditionKind::Charmed,
            hd_affected: None,
        },
    });

    add(Spell {
        id: "detect_magic".to_string(),
        name: "Detect Magic".to_string(),
        level: 1,
        classes: vec![ClassId::Cleric, ClassId::MagicUser, ClassId::Elf],
        range: "60 feet".to_string(),
        duration: "2 turns".to_string(),
        description: "You sense the presence of magic within range. You can detect magical auras through barriers, but cannot identify specific spells.".to_string(),
        flavor: "Your senses attune to the ethereal, revealing the shimmer of enchantment.".to_string(),
        effect: SpellEffect::Utility {
            kind: UtilityKind::DetectMagic,
        },
    });

    add(Spell {
        id: "read_magic".to_string(),
        name: "Read Magic".to_string(),
        level: 1,
        classes: vec![ClassId::MagicUser, ClassId::Elf],
        range: "Self".to_string(),
        duration: "1 turn".to_string(),
        description: "You decipher magical inscriptions that would otherwise be unintelligible. This allows you to read scrolls and spellbooks.".to_string(),
        flavor: "Ancient symbols rearrange themselves into comprehensible patterns.".to_string(),
        effect: SpellEffect::Utility {
            kind: UtilityKind::ReadMagic,
        },
    });

    db
}

// ============================================================================
// Casting
// ============================================================================

/// What happened when a spell resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpellOutcome {
    Healed { amount: i32, message: String },
    Damaged {
        amount: i32,
        auto_hit: bool,
        message: String,
    },
    Buffed {
        stat: BuffStat,
        bonus: i32,
        duration: u32,
        message: String,
    },
    Utility { kind: UtilityKind, message: String },
    Slept { hd_rolled: i32, message: String },
    NoEffect { message: String },
}

/// Validate a cast without changing anything.
///
/// Checks, in order: the spell exists, the caster knows it, a slot of
/// its level is free.
pub fn can_cast(character: &Character, spell_id: &str) -> Result<&'static Spell, SpellError> {
    let spell = get_spell(spell_id).ok_or_else(|| SpellError::UnknownSpell(spell_id.to_string()))?;
    if !character.knows_spell(spell_id) {
        return Err(SpellError::NotKnown(spell.name.clone()));
    }
    if character.spell_slots.available(spell.level) == 0 {
        return Err(SpellError::Character(
            CharacterError::InsufficientSpellSlots { level: spell.level },
        ));
    }
    Ok(spell)
}

/// Cast a spell: validate, spend the slot, then apply the effect.
///
/// The slot is consumed before any effect dice are rolled. Damage and
/// condition spells need an enemy; everything else ignores it.
pub fn cast_spell(
    caster: &mut Character,
    enemy: Option<&mut EnemyInstance>,
    spell_id: &str,
    roller: &mut dyn DiceRoller,
) -> Result<SpellOutcome, SpellError> {
    let spell = can_cast(caster, spell_id)?;
    caster.use_spell_slot(spell.level)?;
    apply_spell_effect(spell, caster, enemy, roller)
}

/// Apply a spell's effect, assuming the slot is already spent.
pub fn apply_spell_effect(
    spell: &Spell,
    caster: &mut Character,
    enemy: Option<&mut EnemyInstance>,
    roller: &mut dyn DiceRoller,
) -> Result<SpellOutcome, SpellError> {
    match &spell.effect {
        SpellEffect::Healing { formula } => {
            let rolled = DiceExpression::parse(formula)?.roll(roller).max(0);
            let amount = caster.heal(rolled);
            Ok(SpellOutcome::Healed {
                amount,
                message: format!("{} heals {} hit points!", spell.name, amount),
            })
        }
        SpellEffect::Damage { formula, auto_hit } => {
            let enemy = enemy.ok_or_else(|| SpellError::NoTarget(spell.name.clone()))?;
            let amount = DiceExpression::parse(formula)?.roll(roller).max(0);
            enemy.take_damage(amount);
            let hit_message = if *auto_hit {
                format!("{} strikes unerringly!", spell.name)
            } else {
                format!("{} hits!", spell.name)
            };
            Ok(SpellOutcome::Damaged {
                amount,
                auto_hit: *auto_hit,
                message: format!("{hit_message} {amount} damage!"),
            })
        }
        SpellEffect::Buff {
            stat,
            bonus,
            duration,
        } => {
            caster.add_buff(crate::character::ActiveBuff {
                source: spell.id.clone(),
                stat: *stat,
                bonus: *bonus,
                rounds_remaining: *duration,
            });
            let stat_name = match stat {
                BuffStat::ArmorClass => "AC",
                BuffStat::AttackBonus => "attack",
            };
            Ok(SpellOutcome::Buffed {
                stat: *stat,
                bonus: *bonus,
                duration: *duration,
                message: format!("{} grants +{} {}!", spell.name, bonus, stat_name),
            })
        }
        SpellEffect::Utility { kind } => {
            let message = match kind {
                UtilityKind::Illumination => format!(
                    "{} creates a bright light! The area is now illuminated.",
                    spell.name
                ),
                UtilityKind::DetectMagic => format!(
                    "{} reveals magical auras! You sense the presence of enchantment.",
                    spell.name
                ),
                UtilityKind::ReadMagic => {
                    format!("{} allows you to decipher magical writing!", spell.name)
                }
            };
            Ok(SpellOutcome::Utility {
                kind: *kind,
                message,
            })
        }
        SpellEffect::Condition {
            condition,
            hd_affected,
        } => match condition {
            ConditionKind::Asleep => {
                let enemy = enemy.ok_or_else(|| SpellError::NoTarget(spell.name.clone()))?;
                let pool = hd_affected.as_deref().unwrap_or("2d8");
                let hd_rolled = DiceExpression::parse(pool)?.roll(roller).max(0);
                if enemy.template.hit_dice as i32 <= hd_rolled {
                    enemy.fall_asleep();
                    Ok(SpellOutcome::Slept {
                        hd_rolled,
                        message: format!(
                            "{} takes hold! The {} slumps into slumber.",
                            spell.name, enemy.template.name
                        ),
                    })
                } else {
                    Ok(SpellOutcome::NoEffect {
                        message: format!(
                            "{} washes over the {} without effect.",
                            spell.name, enemy.template.name
                        ),
                    })
                }
            }
            ConditionKind::Charmed => Ok(SpellOutcome::NoEffect {
                message: format!("{} has no effect here.", spell.name),
            }),
        },
    }
}
