//! Monster templates and live encounter instances.
//!
//! Adventure definitions carry immutable `Monster` templates; combat
//! works on an `EnemyInstance` copy so fighting one never mutates the
//! definition. Templates may start wounded (current HP below max).

use crate::character::HitPoints;
use crate::class_data::Alignment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Transient conditions an enemy can suffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Asleep,
    Charmed,
}

/// A special ability tag on a monster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAbility {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// An immutable monster definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monster {
    pub id: String,
    pub name: String,
    /// Type tag used for treasure-table lookup ("goblin", "snake", ...).
    pub kind: String,
    pub hp: HitPoints,
    /// Descending armor class.
    pub ac: i32,
    pub thac0: i32,
    /// Damage formula: dice notation or a fixed number.
    pub damage: String,
    pub xp: u32,
    /// Morale score on 2d6; 12 never flees.
    pub morale: u32,
    pub hit_dice: u32,
    pub alignment: Alignment,
    pub special_abilities: Vec<SpecialAbility>,
    pub description: String,
    pub tactics: String,
    pub defeated_text: String,
}

impl Monster {
    pub fn new(id: &str, name: &str, kind: &str) -> Self {
        Monster {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            hp: HitPoints::new(1),
            ac: 9,
            thac0: 19,
            damage: "1d6".to_string(),
            xp: 5,
            morale: 7,
            hit_dice: 1,
            alignment: Alignment::Chaotic,
            special_abilities: Vec::new(),
            description: String::new(),
            tactics: String::new(),
            defeated_text: String::new(),
        }
    }

    pub fn with_hp(mut self, current: i32, max: i32) -> Self {
        self.hp = HitPoints { current, max };
        self
    }

    pub fn with_ac(mut self, ac: i32) -> Self {
        self.ac = ac;
        self
    }

    pub fn with_thac0(mut self, thac0: i32) -> Self {
        self.thac0 = thac0;
        self
    }

    pub fn with_damage(mut self, damage: &str) -> Self {
        self.damage = damage.to_string();
        self
    }

    pub fn with_xp(mut self, xp: u32) -> Self {
        self.xp = xp;
        self
    }

    pub fn with_morale(mut self, morale: u32) -> Self {
        self.morale = morale;
        self
    }

    pub fn with_hit_dice(mut self, hit_dice: u32) -> Self {
        self.hit_dice = hit_dice;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_special_ability(mut self, id: &str, name: &str, description: &str) -> Self {
        self.special_abilities.push(SpecialAbility {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        });
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_tactics(mut self, tactics: &str) -> Self {
        self.tactics = tactics.to_string();
        self
    }

    pub fn with_defeated_text(mut self, text: &str) -> Self {
        self.defeated_text = text.to_string();
        self
    }
}

/// Basic XP award for a monster: base by hit dice, plus the base again
/// for each special ability.
pub fn monster_xp(hit_dice: u32, special_abilities: u32) -> u32 {
    let base = match hit_dice {
        0 => 5,
        1 => 10,
        2 => 20,
        3 => 35,
        4 => 75,
        5 => 175,
        6 => 275,
        7 => 450,
        8 => 650,
        _ => 900,
    };
    base + special_abilities * base
}

/// A live copy of a monster inside one encounter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyInstance {
    pub template: Monster,
    pub hp: HitPoints,
    pub conditions: BTreeSet<ConditionKind>,
}

impl EnemyInstance {
    /// Instantiate from a template, copying its (possibly wounded) HP.
    pub fn from_template(template: &Monster) -> Self {
        EnemyInstance {
            template: template.clone(),
            hp: template.hp,
            conditions: BTreeSet::new(),
        }
    }

    /// Apply damage. Any damage wakes a sleeping enemy.
    pub fn take_damage(&mut self, amount: i32) {
        self.hp.take_damage(amount);
        if amount > 0 {
            self.conditions.remove(&ConditionKind::Asleep);
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp.is_down()
    }

    pub fn is_asleep(&self) -> bool {
        self.conditions.contains(&ConditionKind::Asleep)
    }

    pub fn fall_asleep(&mut self) {
        self.conditions.insert(ConditionKind::Asleep);
    }

    /// HP below a quarter of max forces morale checks.
    pub fn is_bloodied(&self) -> bool {
        self.hp.current * 4 < self.hp.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xp_table() {
        assert_eq!(monster_xp(0, 0), 5);
        assert_eq!(monster_xp(1, 0), 10);
        assert_eq!(monster_xp(2, 1), 40);
        assert_eq!(monster_xp(5, 0), 175);
        assert_eq!(monster_xp(9, 0), 900);
        assert_eq!(monster_xp(14, 0), 900);
    }

    #[test]
    fn test_instance_leaves_template_untouched() {
        let template = Monster::new("goblin_1", "Goblin", "goblin").with_hp(4, 4);
        let mut enemy = EnemyInstance::from_template(&template);
        enemy.take_damage(3);
        assert_eq!(enemy.hp.current, 1);
        assert_eq!(template.hp.current, 4);
    }

    #[test]
    fn test_wounded_template_copies_current_hp() {
        let template = Monster::new("rust_monster_1", "Rust Monster", "rust_monster")
            .with_hp(1, 10);
        let enemy = EnemyInstance::from_template(&template);
        assert_eq!(enemy.hp.current, 1);
        assert_eq!(enemy.hp.max, 10);
        assert!(enemy.is_bloodied());
    }

    #[test]
    fn test_damage_wakes_sleeper() {
        let template = Monster::new("goblin_1", "Goblin", "goblin").with_hp(4, 4);
        let mut enemy = EnemyInstance::from_template(&template);
        enemy.fall_asleep();
        assert!(enemy.is_asleep());
        enemy.take_damage(0);
        assert!(enemy.is_asleep());
        enemy.take_damage(1);
        assert!(!enemy.is_asleep());
    }
}
