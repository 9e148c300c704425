//! The player character aggregate.
//!
//! Holds identity, rolled abilities, derived stats, inventory, spells,
//! and the creation-progress machine. All mutation goes through the
//! command methods here; each validates its preconditions and leaves
//! state untouched on failure, so a failed command never half-applies.

use crate::class_data::{Alignment, ClassId};
use crate::dice::DiceRoller;
use crate::items::{starting_items, ArmorKind, ItemInstance};
use crate::rules;
use crate::rules::RulesError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Error type for character commands.
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("Abilities must be rolled before this step")]
    AbilitiesNotSet,
    #[error("A class must be chosen before this step")]
    ClassNotSet,
    #[error("{reason}")]
    NotEligible { reason: String },
    #[error("{0} cannot cast spells")]
    NotASpellcaster(ClassId),
    #[error("No level {level} spell slots remaining")]
    InsufficientSpellSlots { level: u8 },
    #[error("A name is required before the character is finalized")]
    NameRequired,
    #[error("Creation is not complete (currently at {0:?})")]
    CreationIncomplete(CreationStep),
}

/// The six abilities, in the order the rulebook lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Intelligence,
    Wisdom,
    Dexterity,
    Constitution,
    Charisma,
}

impl Ability {
    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Charisma,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Charisma => "Charisma",
        }
    }
}

/// The six rolled ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    pub strength: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub charisma: u8,
}

impl AbilityScores {
    pub fn new(
        strength: u8,
        intelligence: u8,
        wisdom: u8,
        dexterity: u8,
        constitution: u8,
        charisma: u8,
    ) -> Self {
        AbilityScores {
            strength,
            intelligence,
            wisdom,
            dexterity,
            constitution,
            charisma,
        }
    }

    pub fn get(&self, ability: Ability) -> u8 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, score: u8) {
        match ability {
            Ability::Strength => self.strength = score,
            Ability::Intelligence => self.intelligence = score,
            Ability::Wisdom => self.wisdom = score,
            Ability::Dexterity => self.dexterity = score,
            Ability::Constitution => self.constitution = score,
            Ability::Charisma => self.charisma = score,
        }
    }

    /// Validate every score against the 3-18 range.
    pub fn validate(&self) -> Result<(), RulesError> {
        for ability in Ability::all() {
            rules::modifier(self.get(ability))?;
        }
        Ok(())
    }
}

/// Current and maximum hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

impl HitPoints {
    pub fn new(max: i32) -> Self {
        HitPoints { current: max, max }
    }

    /// Reduce current HP, clamping at zero.
    pub fn take_damage(&mut self, amount: i32) {
        self.current = (self.current - amount.max(0)).max(0);
    }

    /// Restore HP, clamping at max. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.max);
        self.current - before
    }

    pub fn is_down(&self) -> bool {
        self.current <= 0
    }
}

/// Spell slots by spell level (Basic covers levels 1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SpellSlots {
    pub max: [u32; 3],
    pub used: [u32; 3],
}

impl SpellSlots {
    pub fn none() -> Self {
        SpellSlots::default()
    }

    pub fn with_max(max: [u32; 3]) -> Self {
        SpellSlots { max, used: [0; 3] }
    }

    pub fn available(&self, level: u8) -> u32 {
        match level {
            1..=3 => {
                let idx = (level - 1) as usize;
                self.max[idx].saturating_sub(self.used[idx])
            }
            _ => 0,
        }
    }

    /// Spend one slot of the given level.
    pub fn spend(&mut self, level: u8) -> Result<(), CharacterError> {
        if self.available(level) == 0 {
            return Err(CharacterError::InsufficientSpellSlots { level });
        }
        self.used[(level - 1) as usize] += 1;
        Ok(())
    }

    pub fn restore_all(&mut self) {
        self.used = [0; 3];
    }
}

/// Which stat a temporary buff improves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffStat {
    ArmorClass,
    AttackBonus,
}

/// A temporary bonus with a remaining duration in combat rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveBuff {
    /// What granted the buff (spell id, "defend", etc).
    pub source: String,
    pub stat: BuffStat,
    pub bonus: i32,
    pub rounds_remaining: u32,
}

/// Steps of the character creation flow, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreationStep {
    RollAbilities,
    ChooseClass,
    ChooseAlignment,
    ChooseSpells,
    Finalize,
}

/// A Basic Rules player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub class: Option<ClassId>,
    pub level: u8,
    pub xp: u32,
    /// Prime-requisite XP bonus percent, fixed when the class is chosen.
    pub xp_bonus_percent: u8,
    pub alignment: Option<Alignment>,
    pub abilities: Option<AbilityScores>,
    pub hp: HitPoints,
    /// Descending armor class, before temporary buffs.
    pub ac: i32,
    pub thac0: i32,
    pub armor: ArmorKind,
    pub has_shield: bool,
    pub inventory: Vec<ItemInstance>,
    pub gold: u32,
    pub known_spells: Vec<String>,
    pub spell_slots: SpellSlots,
    pub active_buffs: Vec<ActiveBuff>,
    pub is_created: bool,
    pub creation_step: CreationStep,
}

impl Default for Character {
    fn default() -> Self {
        Character::new()
    }
}

impl Character {
    pub fn new() -> Self {
        Character {
            name: String::new(),
            class: None,
            level: 1,
            xp: 0,
            xp_bonus_percent: 0,
            alignment: None,
            abilities: None,
            hp: HitPoints::default(),
            ac: rules::BASE_ARMOR_CLASS,
            thac0: rules::BASE_THAC0,
            armor: ArmorKind::None,
            has_shield: false,
            inventory: Vec::new(),
            gold: 0,
            known_spells: Vec::new(),
            spell_slots: SpellSlots::none(),
            active_buffs: Vec::new(),
            is_created: false,
            creation_step: CreationStep::RollAbilities,
        }
    }

    /// Wipe everything back to a fresh sheet.
    pub fn reset(&mut self) {
        *self = Character::new();
    }

    // ========================================================================
    // Creation commands
    // ========================================================================

    pub fn set_name(&mut self, name: &str) {
        self.name = name.trim().to_string();
    }

    /// Record the rolled abilities and advance to class selection.
    pub fn set_abilities(&mut self, scores: AbilityScores) -> Result<(), CharacterError> {
        scores.validate()?;
        self.abilities = Some(scores);
        self.creation_step = CreationStep::ChooseClass;
        Ok(())
    }

    /// Choose a class and derive everything that hangs off it: hit
    /// points, armor class, THAC0, XP bonus, starting gold, gear, and
    /// spell slots.
    pub fn set_class(
        &mut self,
        class: ClassId,
        roller: &mut dyn DiceRoller,
    ) -> Result<(), CharacterError> {
        let abilities = self.abilities.ok_or(CharacterError::AbilitiesNotSet)?;

        let eligibility = rules::class_eligibility(class, &abilities);
        if !eligibility.allowed {
            return Err(CharacterError::NotEligible {
                reason: eligibility
                    .reason
                    .unwrap_or_else(|| format!("Your scores do not qualify for {class}")),
            });
        }

        let max_hp = rules::max_hit_points(class, abilities.constitution, self.level, roller)?;
        let ac = rules::armor_class(
            rules::armor_ac(self.armor, self.has_shield),
            abilities.dexterity,
            0,
        )?;

        self.class = Some(class);
        self.hp = HitPoints::new(max_hp);
        self.ac = ac;
        self.thac0 = rules::thac0(class, self.level);
        self.xp_bonus_percent = rules::xp_bonus(class, &abilities)?;
        self.gold = rules::starting_gold(roller);
        self.inventory = starting_items(class);
        self.known_spells.clear();
        self.spell_slots = crate::spells::starting_slots(class, self.level);
        self.creation_step = CreationStep::ChooseAlignment;
        Ok(())
    }

    pub fn set_alignment(&mut self, alignment: Alignment) -> Result<(), CharacterError> {
        let class = self.class.ok_or(CharacterError::ClassNotSet)?;
        self.alignment = Some(alignment);
        self.creation_step = if class.is_spellcaster() {
            CreationStep::ChooseSpells
        } else {
            CreationStep::Finalize
        };
        Ok(())
    }

    /// Record the spells chosen at creation.
    ///
    /// Unknown spell ids are skipped with a warning rather than
    /// aborting the step.
    pub fn set_spells(&mut self, spell_ids: &[&str]) -> Result<(), CharacterError> {
        let class = self.class.ok_or(CharacterError::ClassNotSet)?;
        if !class.is_spellcaster() {
            return Err(CharacterError::NotASpellcaster(class));
        }

        self.known_spells = spell_ids
            .iter()
            .filter(|id| {
                let known = crate::spells::get_spell(id).is_some();
                if !known {
                    warn!(spell_id = **id, "unknown spell id chosen at creation, skipping");
                }
                known
            })
            .map(|id| id.to_string())
            .collect();
        self.creation_step = CreationStep::Finalize;
        Ok(())
    }

    /// Lock the sheet: the character is ready to play.
    pub fn finalize(&mut self) -> Result<(), CharacterError> {
        if self.creation_step != CreationStep::Finalize {
            return Err(CharacterError::CreationIncomplete(self.creation_step));
        }
        if self.name.is_empty() {
            return Err(CharacterError::NameRequired);
        }
        self.is_created = true;
        Ok(())
    }

    // ========================================================================
    // Play commands
    // ========================================================================

    pub fn take_damage(&mut self, amount: i32) {
        self.hp.take_damage(amount);
    }

    /// Heal, clamped at max HP. Returns the amount actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        self.hp.heal(amount)
    }

    pub fn is_down(&self) -> bool {
        self.hp.is_down()
    }

    /// Award XP, with the prime-requisite bonus applied.
    pub fn add_xp(&mut self, amount: u32) {
        let bonus = amount * self.xp_bonus_percent as u32 / 100;
        self.xp += amount + bonus;
    }

    /// Adjust gold by a signed delta, clamping at zero.
    pub fn update_gold(&mut self, delta: i64) {
        let total = self.gold as i64 + delta;
        self.gold = total.max(0) as u32;
    }

    /// Add an item, merging quantities when the id is already carried.
    pub fn add_item(&mut self, item: ItemInstance) {
        if let Some(existing) = self.inventory.iter_mut().find(|i| i.id == item.id) {
            existing.quantity += item.quantity;
        } else {
            self.inventory.push(item);
        }
    }

    /// Remove an item stack entirely.
    pub fn remove_item(&mut self, item_id: &str) -> Option<ItemInstance> {
        let pos = self.inventory.iter().position(|i| i.id == item_id)?;
        Some(self.inventory.remove(pos))
    }

    /// Spend one charge of an item; the stack is dropped at zero.
    pub fn decrement_item(&mut self, item_id: &str) {
        if let Some(item) = self.inventory.iter_mut().find(|i| i.id == item_id) {
            item.quantity = item.quantity.saturating_sub(1);
            if item.quantity == 0 {
                self.remove_item(item_id);
            }
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&ItemInstance> {
        self.inventory.iter().find(|i| i.id == item_id)
    }

    /// Spend a spell slot of the given level.
    pub fn use_spell_slot(&mut self, level: u8) -> Result<(), CharacterError> {
        self.spell_slots.spend(level)
    }

    pub fn knows_spell(&self, spell_id: &str) -> bool {
        self.known_spells.iter().any(|s| s == spell_id)
    }

    /// Overnight recovery: 4 + CON modifier hit points (at least 1)
    /// and all spell slots back.
    pub fn recover(&mut self) -> u32 {
        let healed = self.heal((4 + self.modifier_of(Ability::Constitution) as i32).max(1));
        self.spell_slots.restore_all();
        healed.max(0) as u32
    }

    /// Swap worn armor and shield, recomputing AC.
    pub fn set_equipment(
        &mut self,
        armor: ArmorKind,
        has_shield: bool,
    ) -> Result<(), CharacterError> {
        let abilities = self.abilities.ok_or(CharacterError::AbilitiesNotSet)?;
        let ac = rules::armor_class(rules::armor_ac(armor, has_shield), abilities.dexterity, 0)?;
        self.armor = armor;
        self.has_shield = has_shield;
        self.ac = ac;
        Ok(())
    }

    // ========================================================================
    // Buffs
    // ========================================================================

    pub fn add_buff(&mut self, buff: ActiveBuff) {
        self.active_buffs.push(buff);
    }

    /// Decrement every buff's remaining rounds, dropping the expired.
    pub fn tick_buffs(&mut self) {
        for buff in &mut self.active_buffs {
            buff.rounds_remaining = buff.rounds_remaining.saturating_sub(1);
        }
        self.active_buffs.retain(|b| b.rounds_remaining > 0);
    }

    fn buff_bonus(&self, stat: BuffStat) -> i32 {
        self.active_buffs
            .iter()
            .filter(|b| b.stat == stat)
            .map(|b| b.bonus)
            .sum()
    }

    /// AC with active buffs applied (bonuses lower it).
    pub fn effective_ac(&self) -> i32 {
        self.ac - self.buff_bonus(BuffStat::ArmorClass)
    }

    /// Attack-roll bonus from active buffs.
    pub fn attack_buff_bonus(&self) -> i32 {
        self.buff_bonus(BuffStat::AttackBonus)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Modifier for an ability; zero when abilities are not yet rolled.
    ///
    /// Stored scores were validated on the way in, so the fallback
    /// only covers the pre-creation sheet.
    pub fn modifier_of(&self, ability: Ability) -> i8 {
        self.abilities
            .map(|scores| rules::modifier(scores.get(ability)).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn has_infravision(&self) -> bool {
        self.class.map(|c| c.has_infravision()).unwrap_or(false)
    }

    /// Total carried weight in coins.
    pub fn encumbrance(&self) -> u32 {
        rules::encumbrance(&self.inventory)
    }

    /// Movement rate in feet per turn under the current load.
    pub fn movement_rate(&self) -> u32 {
        let base = self
            .class
            .map(|c| c.data().base_movement)
            .unwrap_or(120);
        rules::movement_rate(self.encumbrance(), base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRoller;

    fn rolled_scores() -> AbilityScores {
        AbilityScores::new(16, 9, 9, 13, 12, 9)
    }

    #[test]
    fn test_creation_flow_fighter() {
        let mut character = Character::new();
        assert_eq!(character.creation_step, CreationStep::RollAbilities);

        character.set_abilities(rolled_scores()).unwrap();
        assert_eq!(character.creation_step, CreationStep::ChooseClass);

        // Gold roll: 3d6 = 12 -> 120 gp.
        let mut roller = ScriptedRoller::new([4, 4, 4]);
        character.set_class(ClassId::Fighter, &mut roller).unwrap();
        assert_eq!(character.hp.max, 8); // d8, con 12 adds nothing
        assert_eq!(character.ac, 8); // dex 13 improves base 9
        assert_eq!(character.thac0, 19);
        assert_eq!(character.gold, 120);
        assert_eq!(character.xp_bonus_percent, 10); // str 16
        assert!(!character.inventory.is_empty());

        character.set_alignment(Alignment::Lawful).unwrap();
        // Fighters skip spell selection.
        assert_eq!(character.creation_step, CreationStep::Finalize);

        character.set_name("Morgan Ironhand");
        character.finalize().unwrap();
        assert!(character.is_created);
    }

    #[test]
    fn test_caster_creation_includes_spell_step() {
        let mut character = Character::new();
        character
            .set_abilities(AbilityScores::new(9, 16, 9, 9, 9, 9))
            .unwrap();
        let mut roller = ScriptedRoller::new([3, 3, 3]);
        character.set_class(ClassId::MagicUser, &mut roller).unwrap();
        character.set_alignment(Alignment::Neutral).unwrap();
        assert_eq!(character.creation_step, CreationStep::ChooseSpells);

        character.set_spells(&["magic_missile"]).unwrap();
        assert!(character.knows_spell("magic_missile"));
        assert_eq!(character.spell_slots.available(1), 1);
    }

    #[test]
    fn test_set_spells_skips_unknown_ids() {
        let mut character = Character::new();
        character
            .set_abilities(AbilityScores::new(9, 16, 9, 9, 9, 9))
            .unwrap();
        let mut roller = ScriptedRoller::new([3, 3, 3]);
        character.set_class(ClassId::MagicUser, &mut roller).unwrap();
        character.set_alignment(Alignment::Neutral).unwrap();
        character
            .set_spells(&["magic_missile", "wish"])
            .unwrap();
        assert_eq!(character.known_spells, vec!["magic_missile"]);
    }

    #[test]
    fn test_set_class_requires_abilities() {
        let mut character = Character::new();
        let mut roller = ScriptedRoller::new([]);
        assert!(matches!(
            character.set_class(ClassId::Fighter, &mut roller),
            Err(CharacterError::AbilitiesNotSet)
        ));
    }

    #[test]
    fn test_ineligible_class_rejected_without_side_effects() {
        let mut character = Character::new();
        character
            .set_abilities(AbilityScores::new(8, 9, 9, 9, 9, 9))
            .unwrap();
        let mut roller = ScriptedRoller::new([]);
        let err = character.set_class(ClassId::Fighter, &mut roller);
        assert!(matches!(err, Err(CharacterError::NotEligible { .. })));
        assert!(character.class.is_none());
        assert_eq!(character.gold, 0);
        assert_eq!(character.creation_step, CreationStep::ChooseClass);
    }

    #[test]
    fn test_finalize_requires_name() {
        let mut character = Character::new();
        character.set_abilities(rolled_scores()).unwrap();
        let mut roller = ScriptedRoller::new([3, 3, 3]);
        character.set_class(ClassId::Fighter, &mut roller).unwrap();
        character.set_alignment(Alignment::Lawful).unwrap();
        assert!(matches!(
            character.finalize(),
            Err(CharacterError::NameRequired)
        ));
        assert!(!character.is_created);
    }

    #[test]
    fn test_hit_points_clamp() {
        let mut hp = HitPoints::new(10);
        hp.take_damage(3);
        assert_eq!(hp.current, 7);
        hp.take_damage(100);
        assert_eq!(hp.current, 0);
        assert!(hp.is_down());
        assert_eq!(hp.heal(4), 4);
        assert_eq!(hp.heal(100), 6);
        assert_eq!(hp.current, 10);
    }

    #[test]
    fn test_spell_slots_spend_and_restore() {
        let mut slots = SpellSlots::with_max([1, 0, 0]);
        assert_eq!(slots.available(1), 1);
        slots.spend(1).unwrap();
        assert!(matches!(
            slots.spend(1),
            Err(CharacterError::InsufficientSpellSlots { level: 1 })
        ));
        slots.restore_all();
        assert_eq!(slots.available(1), 1);
    }

    #[test]
    fn test_gold_clamps_at_zero() {
        let mut character = Character::new();
        character.gold = 10;
        character.update_gold(-25);
        assert_eq!(character.gold, 0);
        character.update_gold(7);
        assert_eq!(character.gold, 7);
    }

    #[test]
    fn test_xp_bonus_applied_on_award() {
        let mut character = Character::new();
        character.xp_bonus_percent = 10;
        character.add_xp(100);
        assert_eq!(character.xp, 110);
        character.xp_bonus_percent = 5;
        character.add_xp(10);
        // 5% of 10 rounds down to 0.
        assert_eq!(character.xp, 120);
    }

    #[test]
    fn test_item_stacking_and_decrement() {
        let mut character = Character::new();
        let potion = crate::items::catalog_item("healing_potion").unwrap();
        character.add_item(potion.clone());
        character.add_item(potion);
        assert_eq!(character.item("healing_potion").unwrap().quantity, 2);
        character.decrement_item("healing_potion");
        assert_eq!(character.item("healing_potion").unwrap().quantity, 1);
        character.decrement_item("healing_potion");
        assert!(character.item("healing_potion").is_none());
    }

    #[test]
    fn test_buffs_tick_and_expire() {
        let mut character = Character::new();
        character.ac = 7;
        character.add_buff(ActiveBuff {
            source: "shield".to_string(),
            stat: BuffStat::ArmorClass,
            bonus: 4,
            rounds_remaining: 2,
        });
        assert_eq!(character.effective_ac(), 3);
        character.tick_buffs();
        assert_eq!(character.effective_ac(), 3);
        character.tick_buffs();
        assert_eq!(character.effective_ac(), 7);
        assert!(character.active_buffs.is_empty());
    }

    #[test]
    fn test_recover_restores_hp_and_slots() {
        let mut character = Character::new();
        character
            .set_abilities(AbilityScores::new(9, 9, 16, 9, 13, 9))
            .unwrap();
        let mut roller = ScriptedRoller::new([3, 3, 3]);
        character.set_class(ClassId::Cleric, &mut roller).unwrap();
        character.take_damage(6);
        character.use_spell_slot(1).unwrap();

        let healed = character.recover();
        assert_eq!(healed, 5); // 4 + con mod (+1)
        assert_eq!(character.spell_slots.available(1), 1);
    }

    #[test]
    fn test_set_equipment_recomputes_ac() {
        let mut character = Character::new();
        character.set_abilities(rolled_scores()).unwrap();
        let mut roller = ScriptedRoller::new([3, 3, 3]);
        character.set_class(ClassId::Fighter, &mut roller).unwrap();
        character
            .set_equipment(ArmorKind::ChainMail, true)
            .unwrap();
        // Chain 5, shield -1, dex 13 -> 3.
        assert_eq!(character.ac, 3);
        assert_eq!(character.armor, ArmorKind::ChainMail);
    }

    #[test]
    fn test_reset_wipes_sheet() {
        let mut character = Character::new();
        character.set_abilities(rolled_scores()).unwrap();
        character.set_name("Doomed");
        character.reset();
        assert!(character.abilities.is_none());
        assert!(character.name.is_empty());
        assert_eq!(character.creation_step, CreationStep::RollAbilities);
    }
}
