//! Treasure generation.
//!
//! Each monster type maps to a loot table: a gold dice formula plus a
//! list of possible item drops, each with an independent percent
//! chance. Unknown monster types fall back to the default table.

use crate::dice::{DiceExpression, DiceRoller};
use crate::items::{catalog_item, ItemInstance};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A possible item drop: catalog id plus percent chance.
#[derive(Debug, Clone)]
pub struct ItemDrop {
    pub item_id: &'static str,
    pub percent: u32,
}

/// Loot table for one monster type.
#[derive(Debug, Clone)]
pub struct TreasureTable {
    pub gold: &'static str,
    pub drops: &'static [ItemDrop],
}

lazy_static::lazy_static! {
    static ref TABLES: Vec<(&'static str, TreasureTable)> = vec![
        ("goblin", TreasureTable {
            gold: "1d6",
            drops: &[ItemDrop { item_id: "dagger", percent: 10 }],
        }),
        ("snake", TreasureTable {
            gold: "2d6",
            drops: &[ItemDrop { item_id: "healing_potion", percent: 5 }],
        }),
        ("rust_monster", TreasureTable {
            gold: "3d10",
            drops: &[
                ItemDrop { item_id: "wooden_shield", percent: 20 },
                ItemDrop { item_id: "healing_potion", percent: 15 },
            ],
        }),
    ];

    static ref DEFAULT_TABLE: TreasureTable = TreasureTable {
        gold: "1d10",
        drops: &[],
    };
}

/// Look up a loot table; unknown types get the default.
pub fn treasure_table(monster_kind: &str) -> &'static TreasureTable {
    match TABLES.iter().find(|(kind, _)| *kind == monster_kind) {
        Some((_, table)) => table,
        None => {
            warn!(monster_kind, "no treasure table for monster type, using default");
            &DEFAULT_TABLE
        }
    }
}

/// Treasure dropped by a defeated monster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treasure {
    pub gold: u32,
    pub items: Vec<ItemInstance>,
    pub monster_id: String,
    pub monster_kind: String,
}

impl Treasure {
    pub fn is_empty(&self) -> bool {
        self.gold == 0 && self.items.is_empty()
    }
}

/// Roll treasure for a defeated monster.
///
/// Gold comes from the table's dice formula (floored at 0); each
/// listed item is an independent percent roll.
pub fn generate_treasure(
    monster_id: &str,
    monster_kind: &str,
    roller: &mut dyn DiceRoller,
) -> Treasure {
    let table = treasure_table(monster_kind);

    // Table formulas are static data, checked by tests; a bad one
    // degrades to zero gold rather than poisoning the kill.
    let gold = match DiceExpression::parse(table.gold) {
        Ok(expr) => expr.roll(roller).max(0) as u32,
        Err(err) => {
            warn!(monster_kind, %err, "bad gold formula in treasure table");
            0
        }
    };

    let mut items = Vec::new();
    for drop in table.drops {
        if roller.roll(100) <= drop.percent {
            if let Some(item) = catalog_item(drop.item_id) {
                items.push(item);
            }
        }
    }

    Treasure {
        gold,
        items,
        monster_id: monster_id.to_string(),
        monster_kind: monster_kind.to_string(),
    }
}
