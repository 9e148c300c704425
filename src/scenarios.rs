//! Built-in adventures.
//!
//! "Your First Adventure" is the beginner dungeon from the 1983 Basic
//! Rules Players Manual: three encounters across five rooms, teaching
//! movement, combat, and treasure collection. "The Goblin Warren" is
//! the follow-up delve: clear out a goblin nest and bring down its
//! chieftain.

use crate::adventure::{
    Adventure, Direction, Exit, Room, TreasureCache, VictoryCondition,
};
use crate::class_data::Alignment;
use crate::monster::{monster_xp, Monster};
use std::collections::BTreeMap;

/// The tutorial dungeon: goblin, giant snake, and a wounded rust
/// monster guarding the treasure chamber.
pub fn your_first_adventure() -> Adventure {
    let mut rooms = BTreeMap::new();

    rooms.insert(
        "tutorial_entrance".to_string(),
        Room::new(
            "tutorial_entrance",
            "Dungeon Entrance",
            (1, 1),
            "You stand at the entrance to your first dungeon. The stone walls \
             are damp and covered in moss. A narrow corridor stretches ahead \
             into darkness.\n\nThis is where your adventure begins!",
        )
        .with_exit(Exit::open(Direction::East, "tutorial_corridor"))
        .checkpoint(),
    );

    rooms.insert(
        "tutorial_corridor".to_string(),
        Room::new(
            "tutorial_corridor",
            "Dark Corridor",
            (2, 1),
            "A long, dark corridor stretches before you. You hear the faint \
             sound of dripping water echoing off the stone walls. The air is \
             musty and stale.\n\nIn the dim light, you see passages leading \
             north and south.",
        )
        .with_exit(Exit::open(Direction::West, "tutorial_entrance"))
        .with_exit(Exit::hidden(Direction::North, "goblin_room"))
        .with_exit(Exit::hidden(Direction::South, "snake_room")),
    );

    rooms.insert(
        "goblin_room".to_string(),
        Room::new(
            "goblin_room",
            "Goblin's Lair",
            (2, 0),
            "You enter a small chamber littered with bones and refuse. The \
             stench is overwhelming.\n\nA GOBLIN crouches in the corner, its \
             yellow eyes gleaming with malice. It notices you and reaches for \
             its crude weapon!",
        )
        .with_exit(Exit::open(Direction::South, "tutorial_corridor"))
        .with_monster("goblin_1")
        .with_treasure(TreasureCache {
            id: "goblin_treasure".to_string(),
            description: "10 gold pieces scattered among the refuse".to_string(),
            gold: 10,
            item_ids: Vec::new(),
        }),
    );

    rooms.insert(
        "snake_room".to_string(),
        Room::new(
            "snake_room",
            "Snake Pit",
            (2, 2),
            "You step into a dank chamber. The floor is slick with moisture, \
             and you hear a low hissing sound.\n\nCoiled in the center of the \
             room is a large SNAKE, its forked tongue tasting the air. It \
             regards you with cold, unblinking eyes!",
        )
        .with_exit(Exit::open(Direction::North, "tutorial_corridor"))
        .with_exit(Exit::hidden(Direction::East, "treasure_room"))
        .with_monster("snake_1"),
    );

    rooms.insert(
        "treasure_room".to_string(),
        Room::new(
            "treasure_room",
            "Treasure Chamber",
            (3, 2),
            "You enter a small chamber with higher ceilings than the previous \
             rooms. Against the far wall sits an old wooden chest.\n\nBut \
             wait! A bizarre creature scuttles toward you, a RUST MONSTER! \
             Its antennae wave menacingly, seeking metal to corrode!",
        )
        .with_exit(Exit::open(Direction::West, "snake_room"))
        .with_monster("rust_monster_1")
        .with_treasure(TreasureCache {
            id: "wooden_chest".to_string(),
            description: "An old wooden chest bound with iron straps".to_string(),
            gold: 50,
            item_ids: vec!["healing_potion".to_string()],
        }),
    );

    let mut monsters = BTreeMap::new();
    monsters.insert(
        "goblin_1".to_string(),
        Monster::new("goblin_1", "Goblin", "goblin")
            .with_hp(4, 4)
            .with_ac(6)
            .with_damage("1d6")
            .with_xp(5)
            .with_morale(7)
            .with_hit_dice(1)
            .with_description("A small, evil humanoid with yellowed skin and sharp teeth")
            .with_tactics(
                "The goblin attacks with its short sword, fighting to the \
                 death to protect its lair.",
            )
            .with_defeated_text(
                "The goblin falls with a final shriek. Its treasure is now yours!",
            ),
    );
    monsters.insert(
        "snake_1".to_string(),
        Monster::new("snake_1", "Giant Snake", "snake")
            .with_hp(6, 6)
            .with_ac(7)
            .with_damage("1d4")
            .with_xp(10)
            .with_morale(8)
            .with_hit_dice(2)
            .with_special_ability(
                "poison",
                "Poison Bite",
                "On a successful hit, save vs. Poison or take 1d4 additional damage",
            )
            .with_description("A large constrictor snake, over 8 feet long")
            .with_tactics(
                "The snake strikes with its venomous bite, then tries to coil \
                 around its prey.",
            )
            .with_defeated_text(
                "The snake goes limp and slides to the floor. The path east is \
                 now clear.",
            ),
    );
    monsters.insert(
        "rust_monster_1".to_string(),
        // Already wounded when found: 1 HP of 10.
        Monster::new("rust_monster_1", "Rust Monster", "rust_monster")
            .with_hp(1, 10)
            .with_ac(2)
            .with_damage("0")
            .with_xp(50)
            .with_morale(12)
            .with_hit_dice(5)
            .with_special_ability(
                "rust_metal",
                "Rust Metal",
                "Any metal that touches the antennae turns to rust. Save \
                 armor/weapons each hit!",
            )
            .with_description(
                "A wounded rust monster with armadillo-like plating and long, \
                 feathery antennae. It appears badly injured.",
            )
            .with_tactics("The rust monster, already near death, desperately tries to survive.")
            .with_defeated_text(
                "The wounded rust monster collapses! The treasure chest is safe!",
            ),
    );

    Adventure {
        id: "tutorial".to_string(),
        title: "Your First Adventure".to_string(),
        description: "A beginner adventure to learn the basics of dungeon exploration."
            .to_string(),
        starting_room: "tutorial_entrance".to_string(),
        rooms,
        monsters,
        victory_conditions: vec![
            VictoryCondition::DefeatMonster {
                monster_id: "goblin_1".to_string(),
                description: "Defeat the goblin".to_string(),
            },
            VictoryCondition::DefeatMonster {
                monster_id: "snake_1".to_string(),
                description: "Defeat the snake".to_string(),
            },
            VictoryCondition::DefeatMonster {
                monster_id: "rust_monster_1".to_string(),
                description: "Defeat the rust monster".to_string(),
            },
        ],
    }
}

/// A level-1 goblin nest: two guards, a rat-infested storeroom, and
/// the chieftain's hall. Victory needs only the chieftain's head.
pub fn goblin_warren() -> Adventure {
    let mut rooms = BTreeMap::new();

    rooms.insert(
        "warren_entrance".to_string(),
        Room::new(
            "warren_entrance",
            "Warren Entrance",
            (1, 1),
            "You stand at the mouth of a dark cave. The smell of unwashed \
             goblin-kind wafts out from within. Crude symbols are scratched \
             into the stone around the entrance.\n\nTunnels lead deeper into \
             the warren to the north and east.",
        )
        .with_exit(Exit::hidden(Direction::North, "guard_post"))
        .with_exit(Exit::hidden(Direction::East, "storage_cave")),
    );

    rooms.insert(
        "guard_post".to_string(),
        Room::new(
            "guard_post",
            "Guard Post",
            (1, 0),
            "A crude guard chamber. Sleeping mats and gnawed bones litter the \
             floor. An old barrel serves as a table, with dice and coppers \
             scattered across it.\n\nA tunnel continues north, and you can \
             return south to the entrance.",
        )
        .with_exit(Exit::open(Direction::South, "warren_entrance"))
        .with_exit(Exit::closed(Direction::North, "chieftain_hall"))
        .with_monster("goblin_guard_1")
        .with_monster("goblin_guard_2")
        .with_treasure(TreasureCache {
            id: "goblin_coppers".to_string(),
            description: "A small pile of copper pieces and gaming dice".to_string(),
            gold: 5,
            item_ids: Vec::new(),
        }),
    );

    rooms.insert(
        "storage_cave".to_string(),
        Room::new(
            "storage_cave",
            "Storage Cave",
            (2, 1),
            "A natural cave used as a storage area. Crates and barrels are \
             stacked haphazardly. Most contain spoiled food and worthless \
             junk, but something might be worth salvaging.\n\nA passage leads \
             north, and you can return west to the entrance.",
        )
        .with_exit(Exit::open(Direction::West, "warren_entrance"))
        .with_exit(Exit::hidden(Direction::North, "rat_den"))
        .with_treasure(TreasureCache {
            id: "storage_goods".to_string(),
            description: "Salvageable goods from the storage".to_string(),
            gold: 10,
            item_ids: vec!["healing_potion".to_string()],
        }),
    );

    rooms.insert(
        "rat_den".to_string(),
        Room::new(
            "rat_den",
            "Rat Den",
            (2, 0),
            "The stench here is overwhelming. Giant rats have made a nest in \
             this cave, gnawing through the goblins' supplies. Their \
             chittering echoes off the walls.\n\nPassages lead south and west.",
        )
        .with_exit(Exit::open(Direction::South, "storage_cave"))
        .with_exit(Exit::hidden(Direction::West, "chieftain_hall"))
        .with_monster("giant_rat_pack"),
    );

    rooms.insert(
        "chieftain_hall".to_string(),
        Room::new(
            "chieftain_hall",
            "Chieftain's Hall",
            (1, -1),
            "A larger chamber that serves as the goblin chieftain's throne \
             room. A crude wooden throne sits on a raised platform. Trophies \
             from raids hang on the walls.\n\nThe chieftain and his best \
             warriors are here! Exits lead south and east.",
        )
        .with_exit(Exit::open(Direction::South, "guard_post"))
        .with_exit(Exit::hidden(Direction::East, "rat_den"))
        .with_monster("goblin_chieftain")
        .with_treasure(TreasureCache {
            id: "chieftain_hoard".to_string(),
            description: "The chieftain's treasure hoard".to_string(),
            gold: 50,
            item_ids: vec!["silver_dagger".to_string()],
        }),
    );

    fn goblin_guard(id: &str) -> Monster {
        Monster::new(id, "Goblin Guard", "goblin")
            .with_hp(4, 4)
            .with_ac(6)
            .with_damage("1d6")
            .with_xp(5)
            .with_morale(7)
            .with_hit_dice(1)
    }

    let mut monsters = BTreeMap::new();
    monsters.insert("goblin_guard_1".to_string(), goblin_guard("goblin_guard_1"));
    monsters.insert("goblin_guard_2".to_string(), goblin_guard("goblin_guard_2"));
    monsters.insert(
        "giant_rat_pack".to_string(),
        // Under 1 hit die; the book table sets the award.
        Monster::new("giant_rat_pack", "Giant Rat Pack", "rat")
            .with_hp(3, 3)
            .with_ac(7)
            .with_damage("1d3")
            .with_xp(monster_xp(0, 0))
            .with_morale(8)
            .with_hit_dice(0)
            .with_alignment(Alignment::Neutral),
    );
    monsters.insert(
        "goblin_chieftain".to_string(),
        Monster::new("goblin_chieftain", "Goblin Chieftain", "goblin")
            .with_hp(7, 7)
            .with_ac(5)
            .with_thac0(18)
            .with_damage("1d6+1")
            .with_xp(15)
            .with_morale(9)
            .with_hit_dice(1)
            .with_special_ability("leader", "Leader", "+1 morale to nearby goblins")
            .with_special_ability("equipment", "Better Equipment", "Fights with stolen steel"),
    );

    Adventure {
        id: "goblin_warren".to_string(),
        title: "The Goblin Warren".to_string(),
        description: "A network of tunnels infested with goblins and their \
                      kin. The local village has offered a reward for \
                      clearing out this menace."
            .to_string(),
        starting_room: "warren_entrance".to_string(),
        rooms,
        monsters,
        victory_conditions: vec![VictoryCondition::DefeatMonster {
            monster_id: "goblin_chieftain".to_string(),
            description: "Defeat the goblin chieftain".to_string(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adventure::{AdventureSession, RoomState};
    use crate::combat::CombatPhase;
    use crate::testing::{leveled_fighter, ScriptedRoller};

    #[test]
    fn test_builtin_graphs_are_consistent() {
        for adventure in [your_first_adventure(), goblin_warren()] {
            assert!(adventure.rooms.contains_key(&adventure.starting_room));
            // Every exit leads to a real room.
            for room in adventure.rooms.values() {
                for exit in &room.exits {
                    assert!(
                        adventure.rooms.contains_key(&exit.target_room),
                        "{} exits to unknown room {}",
                        room.id,
                        exit.target_room
                    );
                }
            }
            // Every placed monster and victory target is defined.
            for room in adventure.rooms.values() {
                for monster_id in &room.contents.monsters {
                    assert!(adventure.monsters.contains_key(monster_id));
                }
            }
        }
    }

    #[test]
    fn test_tutorial_monster_stats() {
        let adventure = your_first_adventure();
        let goblin = &adventure.monsters["goblin_1"];
        assert_eq!((goblin.hp.current, goblin.hp.max, goblin.ac), (4, 4, 6));
        let snake = &adventure.monsters["snake_1"];
        assert_eq!(snake.damage, "1d4");
        assert_eq!(snake.special_abilities.len(), 1);
        let rust_monster = &adventure.monsters["rust_monster_1"];
        assert_eq!((rust_monster.hp.current, rust_monster.hp.max), (1, 10));
        assert_eq!(rust_monster.damage, "0");
        assert_eq!(rust_monster.morale, 12);
    }

    #[test]
    fn test_warren_monster_stats() {
        let adventure = goblin_warren();
        let chieftain = &adventure.monsters["goblin_chieftain"];
        assert_eq!((chieftain.hp.max, chieftain.ac, chieftain.thac0), (7, 5, 18));
        assert_eq!(chieftain.damage, "1d6+1");
        assert_eq!(chieftain.morale, 9);
        let rats = &adventure.monsters["giant_rat_pack"];
        assert_eq!(rats.xp, monster_xp(0, 0));
        assert_eq!(rats.alignment, Alignment::Neutral);
        assert_eq!(rats.damage, "1d3");
    }

    #[test]
    fn test_warren_guard_post_reengages_second_guard() {
        let mut session = AdventureSession::new(goblin_warren());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);

        let outcome = session
            .enter_room("guard_post", &mut character, &mut roller)
            .unwrap();
        assert_eq!(outcome.combat_started.as_deref(), Some("goblin_guard_1"));

        let mut encounter = session.begin_encounter(&character).unwrap();
        encounter.phase = CombatPhase::Victory;
        session.conclude_encounter(&encounter).unwrap();
        // One guard still stands: the room is not cleared.
        assert!(!session.is_room_cleared("guard_post"));
        assert!(!session.victorious);

        session
            .enter_room("warren_entrance", &mut character, &mut roller)
            .unwrap();
        let outcome = session
            .enter_room("guard_post", &mut character, &mut roller)
            .unwrap();
        assert_eq!(outcome.combat_started.as_deref(), Some("goblin_guard_2"));

        let mut encounter = session.begin_encounter(&character).unwrap();
        encounter.phase = CombatPhase::Victory;
        session.conclude_encounter(&encounter).unwrap();
        assert!(session.is_room_cleared("guard_post"));
        // The chieftain still rules: no victory yet.
        assert!(!session.victorious);
    }

    #[test]
    fn test_warren_victory_needs_only_the_chieftain() {
        let mut session = AdventureSession::new(goblin_warren());
        session.defeated.insert("goblin_guard_1".to_string());
        session.defeated.insert("goblin_guard_2".to_string());
        session.defeated.insert("giant_rat_pack".to_string());
        assert!(!session.check_victory());
        session.defeated.insert("goblin_chieftain".to_string());
        assert!(session.check_victory());
    }

    #[test]
    fn test_tutorial_session_starts_entered() {
        let session = AdventureSession::new(your_first_adventure());
        assert_eq!(session.current_room, "tutorial_entrance");
        assert_eq!(
            session.room_states.get("tutorial_entrance"),
            Some(&RoomState::Entered)
        );
        assert_eq!(
            session.room_states.get("goblin_room"),
            Some(&RoomState::Unexplored)
        );
    }
}
