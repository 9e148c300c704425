//! Equipment and item effects.
//!
//! Items carry a tagged effect (healing, light, utility, equipment)
//! and a list of contexts they may be used in. The catalog holds every
//! predefined item; starting gear is assembled from it per class.

use crate::character::Character;
use crate::dice::{DiceError, DiceExpression, DiceRoller};
use crate::class_data::ClassId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Error type for item usage.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Cannot use {item} in {context}")]
    NotUsableHere { item: String, context: UseContext },
    #[error("No charges remaining on {0}")]
    Exhausted(String),
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// Where an item may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseContext {
    Exploration,
    Combat,
}

impl fmt::Display for UseContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseContext::Exploration => write!(f, "exploration"),
            UseContext::Combat => write!(f, "combat"),
        }
    }
}

/// Broad item categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Armor,
    Consumable,
    Tool,
    Container,
    Ammunition,
}

/// What happens when an item is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Restores hit points per the dice formula.
    Healing {
        formula: String,
        narrative: Option<String>,
    },
    /// Provides light for a number of rooms explored.
    Light {
        duration: u32,
        narrative: Option<String>,
    },
    /// Flavor only.
    Utility { narrative: Option<String> },
    /// Weapons and armor; readying them is handled by equipment commands.
    Equipment,
}

/// An item in a character's inventory (or a catalog template).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    /// Weight in coins, the Basic encumbrance unit.
    pub weight: u32,
    pub quantity: u32,
    pub effect: ItemEffect,
    pub usable_in: Vec<UseContext>,
}

impl ItemInstance {
    pub fn new(id: &str, name: &str, kind: ItemKind) -> Self {
        ItemInstance {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            weight: 1,
            quantity: 1,
            effect: ItemEffect::Utility { narrative: None },
            usable_in: vec![UseContext::Exploration, UseContext::Combat],
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_effect(mut self, effect: ItemEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn usable_in(mut self, contexts: &[UseContext]) -> Self {
        self.usable_in = contexts.to_vec();
        self
    }

    fn healing(mut self, formula: &str, narrative: &str) -> Self {
        self.effect = ItemEffect::Healing {
            formula: formula.to_string(),
            narrative: Some(narrative.to_string()),
        };
        self
    }

    fn light(mut self, duration: u32, narrative: &str) -> Self {
        self.effect = ItemEffect::Light {
            duration,
            narrative: Some(narrative.to_string()),
        };
        self
    }

    fn flavor(mut self, narrative: &str) -> Self {
        self.effect = ItemEffect::Utility {
            narrative: Some(narrative.to_string()),
        };
        self
    }
}

/// Check whether an item can be used right now.
pub fn can_use_item(item: &ItemInstance, context: UseContext) -> Result<(), ItemError> {
    if !item.usable_in.contains(&context) {
        return Err(ItemError::NotUsableHere {
            item: item.name.clone(),
            context,
        });
    }
    if item.kind == ItemKind::Consumable && item.quantity == 0 {
        return Err(ItemError::Exhausted(item.name.clone()));
    }
    Ok(())
}

/// Result of using an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemUseOutcome {
    Healed { amount: i32, message: String },
    LightKindled { duration: u32, message: String },
    Narrated { message: String },
    Equipped { message: String },
}

/// A resolved item use: the outcome plus whether a charge was spent.
#[derive(Debug, Clone)]
pub struct ItemUse {
    pub outcome: ItemUseOutcome,
    pub consumed: bool,
}

/// Apply an item's effect to the character.
///
/// Validates context and charges first; on failure nothing changes.
/// Healing clamps at the character's maximum and reports the amount
/// actually restored. The caller decrements quantity when `consumed`
/// is set and routes light effects to the adventure session.
pub fn apply_item_effect(
    item: &ItemInstance,
    character: &mut Character,
    context: UseContext,
    roller: &mut dyn DiceRoller,
) -> Result<ItemUse, ItemError> {
    can_use_item(item, context)?;
    let consumable = item.kind == ItemKind::Consumable;

    match &item.effect {
        ItemEffect::Healing { formula, narrative } => {
            let rolled = DiceExpression::parse(formula)?.roll(roller).max(0);
            let amount = character.heal(rolled);
            let message = narrative.clone().unwrap_or_else(|| {
                format!("{} restores {} hit points!", item.name, amount)
            });
            Ok(ItemUse {
                outcome: ItemUseOutcome::Healed { amount, message },
                consumed: consumable,
            })
        }
        ItemEffect::Light {
            duration,
            narrative,
        } => {
            let message = narrative.clone().unwrap_or_else(|| {
                format!("You light the {}. Warm light pushes back the darkness.", item.name)
            });
            Ok(ItemUse {
                outcome: ItemUseOutcome::LightKindled {
                    duration: *duration,
                    message,
                },
                consumed: consumable,
            })
        }
        ItemEffect::Utility { narrative } => {
            let message = narrative.clone().unwrap_or_else(|| {
                format!(
                    "You hold the {}. Nothing significant happens right now.",
                    item.name
                )
            });
            Ok(ItemUse {
                outcome: ItemUseOutcome::Narrated { message },
                consumed: false,
            })
        }
        ItemEffect::Equipment => Ok(ItemUse {
            outcome: ItemUseOutcome::Equipped {
                message: format!("You ready the {}.", item.name),
            },
            consumed: false,
        }),
    }
}

/// Worn body armor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArmorKind {
    #[default]
    None,
    Leather,
    ChainMail,
    PlateMail,
}

// ============================================================================
// Item catalog
// ============================================================================

const TORCH_NARRATIVE: &str =
    "You light a torch. Flickering flames cast dancing shadows on the walls.";
const LANTERN_NARRATIVE: &str =
    "You light the lantern. Steady light illuminates the area, casting fewer shadows than a torch.";
const POTION_NARRATIVE: &str =
    "You drink the potion and feel your wounds close. The liquid tastes of honey and herbs.";

lazy_static::lazy_static! {
    /// Every predefined item, one template each.
    pub static ref CATALOG: Vec<ItemInstance> = vec![
        ItemInstance::new("backpack", "Backpack", ItemKind::Container)
            .with_weight(2)
            .usable_in(&[]),
        ItemInstance::new("waterskin", "Waterskin", ItemKind::Consumable)
            .flavor("You take a refreshing drink of water.")
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("ration", "Iron Ration", ItemKind::Consumable)
            .healing("1d4", "You eat a ration. The dried food restores some vitality.")
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("healing_potion", "Healing Potion", ItemKind::Consumable)
            .healing("1d8", POTION_NARRATIVE),
        ItemInstance::new("torch", "Torch", ItemKind::Consumable)
            .light(6, TORCH_NARRATIVE)
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("lantern", "Lantern", ItemKind::Tool)
            .with_weight(2)
            .light(24, LANTERN_NARRATIVE)
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("holy_symbol", "Holy Symbol", ItemKind::Tool)
            .flavor("You clutch your holy symbol. Its familiar weight brings comfort."),
        ItemInstance::new("spellbook", "Spellbook", ItemKind::Tool)
            .with_weight(3)
            .flavor("You page through your spellbook, reviewing arcane formulas.")
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("thieves_tools", "Thieves' Tools", ItemKind::Tool)
            .flavor("You examine your lockpicks and tools. Everything is in order.")
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("rope", "Rope (50 feet)", ItemKind::Tool)
            .with_weight(5)
            .flavor("You coil the rope. Useful for climbing, but not much use here right now.")
            .usable_in(&[UseContext::Exploration]),
        ItemInstance::new("sling_stones", "Sling Stones (20)", ItemKind::Ammunition)
            .with_quantity(20)
            .usable_in(&[]),
        ItemInstance::new("dagger", "Rusty Dagger", ItemKind::Weapon)
            .with_effect(ItemEffect::Equipment),
        ItemInstance::new("silver_dagger", "Silver Dagger", ItemKind::Weapon)
            .with_effect(ItemEffect::Equipment),
        ItemInstance::new("wooden_shield", "Wooden Shield", ItemKind::Armor)
            .with_weight(10)
            .with_effect(ItemEffect::Equipment),
    ];
}

/// Look up a catalog item by id, cloning the template.
///
/// Unknown ids are a data problem, not a crash: a warning is logged
/// and callers treat the miss as a no-op.
pub fn catalog_item(id: &str) -> Option<ItemInstance> {
    let found = CATALOG.iter().find(|item| item.id == id).cloned();
    if found.is_none() {
        warn!(item_id = id, "unknown item id requested from catalog");
    }
    found
}

/// Starting gear for a newly created character of the given class.
pub fn starting_items(class: ClassId) -> Vec<ItemInstance> {
    let base = ["backpack", "waterskin"];
    let mut items: Vec<ItemInstance> = base.iter().filter_map(|id| catalog_item(id)).collect();
    if let Some(rations) = catalog_item("ration") {
        // One week of iron rations.
        items.push(rations.with_quantity(7));
    }

    let class_kit: &[(&str, u32)] = match class {
        ClassId::Fighter => &[("healing_potion", 1), ("torch", 6)],
        ClassId::Cleric => &[("holy_symbol", 1), ("torch", 6)],
        ClassId::MagicUser => &[("spellbook", 1), ("torch", 5), ("lantern", 1)],
        ClassId::Thief => &[("thieves_tools", 1), ("rope", 1), ("torch", 5)],
        ClassId::Dwarf => &[("healing_potion", 1), ("torch", 6)],
        ClassId::Elf => &[("lantern", 1), ("rope", 1)],
        ClassId::Halfling => &[("healing_potion", 1), ("torch", 6), ("sling_stones", 20)],
    };

    for &(id, quantity) in class_kit {
        if let Some(item) = catalog_item(id) {
            items.push(item.with_quantity(quantity));
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{leveled_fighter, ScriptedRoller};

    #[test]
    fn test_can_use_item_context_gate() {
        let torch = catalog_item("torch").unwrap();
        assert!(can_use_item(&torch, UseContext::Exploration).is_ok());
        assert!(matches!(
            can_use_item(&torch, UseContext::Combat),
            Err(ItemError::NotUsableHere { .. })
        ));
    }

    #[test]
    fn test_can_use_item_charges() {
        let potion = catalog_item("healing_potion").unwrap().with_quantity(0);
        assert!(matches!(
            can_use_item(&potion, UseContext::Combat),
            Err(ItemError::Exhausted(_))
        ));
    }

    #[test]
    fn test_healing_item_clamps_at_max() {
        let mut character = leveled_fighter();
        character.hp.current = character.hp.max - 2;
        let potion = catalog_item("healing_potion").unwrap();
        let mut roller = ScriptedRoller::new([8]);
        let result =
            apply_item_effect(&potion, &mut character, UseContext::Combat, &mut roller).unwrap();
        assert!(result.consumed);
        match result.outcome {
            ItemUseOutcome::Healed { amount, .. } => assert_eq!(amount, 2),
            other => panic!("expected healing, got {other:?}"),
        }
        assert_eq!(character.hp.current, character.hp.max);
    }

    #[test]
    fn test_light_item_reports_duration() {
        let mut character = leveled_fighter();
        let torch = catalog_item("torch").unwrap();
        let mut roller = ScriptedRoller::new([]);
        let result =
            apply_item_effect(&torch, &mut character, UseContext::Exploration, &mut roller)
                .unwrap();
        assert!(result.consumed);
        assert!(matches!(
            result.outcome,
            ItemUseOutcome::LightKindled { duration: 6, .. }
        ));
    }

    #[test]
    fn test_unknown_catalog_id_is_none() {
        assert!(catalog_item("vorpal_sword").is_none());
    }

    #[test]
    fn test_starting_items_per_class() {
        let fighter = starting_items(ClassId::Fighter);
        let ids: Vec<&str> = fighter.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["backpack", "waterskin", "ration", "healing_potion", "torch"]
        );
        let rations = fighter.iter().find(|i| i.id == "ration").unwrap();
        assert_eq!(rations.quantity, 7);
        let torches = fighter.iter().find(|i| i.id == "torch").unwrap();
        assert_eq!(torches.quantity, 6);

        let thief = starting_items(ClassId::Thief);
        assert!(thief.iter().any(|i| i.id == "thieves_tools"));
        assert!(thief.iter().any(|i| i.id == "rope"));

        let elf = starting_items(ClassId::Elf);
        assert!(elf.iter().any(|i| i.id == "lantern"));
        assert!(!elf.iter().any(|i| i.id == "torch"));
    }
}
