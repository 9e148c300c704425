//! Adventure definitions and the exploration state machine.
//!
//! An [`Adventure`] is an immutable-by-convention bundle of rooms,
//! monsters, and victory conditions. An [`AdventureSession`] owns its
//! working copy and tracks everything that changes during play:
//! position, room states, defeated monsters, collected treasure, the
//! light clock, the rest flag, and the narration log.
//!
//! Progress flags only ever move forward: rooms stay visited, traps
//! stay triggered, defeats stay recorded. Victory is terminal and
//! idempotent.

use crate::character::Character;
use crate::combat::{CombatPhase, Encounter};
use crate::dice::{DiceExpression, DiceRoller};
use crate::items::catalog_item;
use crate::monster::Monster;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Error type for adventure commands.
#[derive(Debug, Error)]
pub enum AdventureError {
    #[error("Unknown room: {0}")]
    UnknownRoom(String),
    #[error("Unknown monster: {0}")]
    UnknownMonster(String),
    #[error("You cannot do that while in combat")]
    InCombat,
    #[error("There is no fight to resolve")]
    NotInCombat,
    #[error("You have already rested on this adventure")]
    AlreadyRested,
    #[error("The adventure is already over")]
    AdventureOver,
    #[error("There is no room to retreat to")]
    NoPreviousRoom,
    #[error("No such treasure here: {0}")]
    TreasureNotHere(String),
    #[error("You already collected that: {0}")]
    AlreadyCollected(String),
}

/// Compass directions used by room exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

/// Whether a doorway is open or shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Closed,
}

/// A connection out of a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exit {
    pub direction: Direction,
    pub target_room: String,
    pub door: DoorState,
    /// Hidden exits stay off the map until found by searching.
    pub discovered: bool,
}

impl Exit {
    pub fn open(direction: Direction, target_room: &str) -> Self {
        Exit {
            direction,
            target_room: target_room.to_string(),
            door: DoorState::Open,
            discovered: true,
        }
    }

    /// An exit that stays hidden until the room is searched.
    pub fn hidden(direction: Direction, target_room: &str) -> Self {
        Exit {
            discovered: false,
            ..Exit::open(direction, target_room)
        }
    }

    /// A shut door, not yet spotted on the map.
    pub fn closed(direction: Direction, target_room: &str) -> Self {
        Exit {
            door: DoorState::Closed,
            discovered: false,
            ..Exit::open(direction, target_room)
        }
    }
}

/// A trap waiting in a room.
///
/// `detected` and `triggered` are per-session flags, mutated in place
/// on the session's copy of the adventure; both are monotonic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trap {
    pub id: String,
    pub description: String,
    /// Damage formula dealt on a failed save.
    pub damage: String,
    /// The d20 result needed to avoid the trap.
    pub save_target: i32,
    /// Percent detection chance override; falls back to the class table.
    pub detect_chance: Option<u32>,
    pub detected: bool,
    pub triggered: bool,
}

impl Trap {
    pub fn new(id: &str, description: &str, damage: &str) -> Self {
        Trap {
            id: id.to_string(),
            description: description.to_string(),
            damage: damage.to_string(),
            save_target: 12,
            detect_chance: None,
            detected: false,
            triggered: false,
        }
    }
}

/// A treasure cache placed in a room (loose coins or a chest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasureCache {
    pub id: String,
    pub description: String,
    pub gold: u32,
    /// Catalog ids of any contained items.
    pub item_ids: Vec<String>,
}

/// Everything a room contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomContents {
    pub monsters: Vec<String>,
    pub npcs: Vec<String>,
    pub treasure: Vec<TreasureCache>,
    pub traps: Vec<Trap>,
}

/// A single room in the dungeon graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    /// Map grid position.
    pub coordinates: (i32, i32),
    pub description: String,
    pub exits: Vec<Exit>,
    pub contents: RoomContents,
    /// Combat begins the moment the room is entered with live monsters.
    pub auto_start_combat: bool,
    /// Safe areas suitable for resting.
    pub is_checkpoint: bool,
}

impl Room {
    pub fn new(id: &str, name: &str, coordinates: (i32, i32), description: &str) -> Self {
        Room {
            id: id.to_string(),
            name: name.to_string(),
            coordinates,
            description: description.to_string(),
            exits: Vec::new(),
            contents: RoomContents::default(),
            auto_start_combat: false,
            is_checkpoint: false,
        }
    }

    pub fn with_exit(mut self, exit: Exit) -> Self {
        self.exits.push(exit);
        self
    }

    pub fn with_monster(mut self, monster_id: &str) -> Self {
        self.contents.monsters.push(monster_id.to_string());
        self.auto_start_combat = true;
        self
    }

    pub fn with_treasure(mut self, cache: TreasureCache) -> Self {
        self.contents.treasure.push(cache);
        self
    }

    pub fn with_trap(mut self, trap: Trap) -> Self {
        self.contents.traps.push(trap);
        self
    }

    pub fn checkpoint(mut self) -> Self {
        self.is_checkpoint = true;
        self
    }
}

/// What must happen for the adventure to be won.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VictoryCondition {
    DefeatMonster { monster_id: String, description: String },
}

/// A complete adventure definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adventure {
    pub id: String,
    pub title: String,
    pub description: String,
    pub starting_room: String,
    pub rooms: BTreeMap<String, Room>,
    pub monsters: BTreeMap<String, Monster>,
    pub victory_conditions: Vec<VictoryCondition>,
}

impl Adventure {
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        let found = self.rooms.get(room_id);
        if found.is_none() {
            warn!(room_id, adventure = %self.id, "unknown room requested");
        }
        found
    }

    pub fn monster(&self, monster_id: &str) -> Option<&Monster> {
        let found = self.monsters.get(monster_id);
        if found.is_none() {
            warn!(monster_id, adventure = %self.id, "unknown monster requested");
        }
        found
    }
}

/// How much of a room the player has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomState {
    Unexplored,
    /// Seen on the map but never entered.
    Revealed,
    Entered,
    /// Entered and emptied of threats.
    Cleared,
}

/// Voice of a narration entry, for display styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationStyle {
    Room,
    Combat,
    System,
    Dm,
}

/// One append-only narration log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationEntry {
    pub id: Uuid,
    pub style: NarrationStyle,
    pub text: String,
    pub emphasis: bool,
}

/// An active light source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Torch,
    Lantern,
    Spell,
}

/// The party's light clock: what burns and for how many more rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LightState {
    pub source: Option<LightKind>,
    pub remaining: u32,
}

impl LightState {
    pub fn is_lit(&self) -> bool {
        self.source.is_some() && self.remaining > 0
    }
}

const LIGHT_OUT_TEXT: &str = "Your light gutters and dies. Darkness closes in.";

/// A sprung (or dodged) trap during movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrapEvent {
    pub trap_id: String,
    pub description: String,
    pub save_roll: u32,
    pub avoided: bool,
    pub damage: i32,
}

/// Everything that happened while entering a room.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnterOutcome {
    pub trap: Option<TrapEvent>,
    /// Monster id when combat auto-started.
    pub combat_started: Option<String>,
    pub light_went_out: bool,
}

/// Result of searching the current room.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub traps_found: Vec<String>,
    pub exits_found: Vec<Direction>,
}

/// Live state of one play-through of an adventure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdventureSession {
    /// Working copy of the definition; trap flags mutate in place.
    pub adventure: Adventure,
    pub current_room: String,
    /// Where the player came from, for fleeing.
    pub previous_room: Option<String>,
    pub room_states: BTreeMap<String, RoomState>,
    pub visited: BTreeSet<String>,
    pub defeated: BTreeSet<String>,
    pub collected: BTreeSet<String>,
    pub in_combat: bool,
    pub current_enemy: Option<String>,
    pub narration: Vec<NarrationEntry>,
    pub victorious: bool,
    pub player_defeated: bool,
    pub has_rested: bool,
    pub light: LightState,
}

impl AdventureSession {
    /// Start a session at the adventure's starting room.
    pub fn new(adventure: Adventure) -> Self {
        let starting_room = adventure.starting_room.clone();
        let mut room_states: BTreeMap<String, RoomState> = adventure
            .rooms
            .keys()
            .map(|id| (id.clone(), RoomState::Unexplored))
            .collect();
        room_states.insert(starting_room.clone(), RoomState::Entered);

        let mut session = AdventureSession {
            adventure,
            current_room: starting_room.clone(),
            previous_room: None,
            room_states,
            visited: BTreeSet::from([starting_room]),
            defeated: BTreeSet::new(),
            collected: BTreeSet::new(),
            in_combat: false,
            current_enemy: None,
            narration: Vec::new(),
            victorious: false,
            player_defeated: false,
            has_rested: false,
            light: LightState::default(),
        };
        let opening = session.adventure.description.clone();
        session.narrate(NarrationStyle::Dm, &opening, true);
        if let Some(room) = session.adventure.rooms.get(&session.current_room) {
            let text = room.description.clone();
            session.narrate(NarrationStyle::Room, &text, false);
        }
        session
    }

    /// Throw away all progress and restart the same adventure.
    pub fn reset(&mut self) {
        let mut fresh = self.adventure.clone();
        // Trap flags live on the working copy; scrub them.
        for room in fresh.rooms.values_mut() {
            for trap in &mut room.contents.traps {
                trap.detected = false;
                trap.triggered = false;
            }
        }
        *self = AdventureSession::new(fresh);
    }

    fn check_playable(&self) -> Result<(), AdventureError> {
        if self.victorious || self.player_defeated {
            return Err(AdventureError::AdventureOver);
        }
        Ok(())
    }

    // ========================================================================
    // Movement
    // ========================================================================

    /// Move into a room.
    ///
    /// Order of operations: the destination is validated first (an
    /// unknown id changes nothing), then any undetected trap springs,
    /// then the move completes, the light clock ticks, and finally
    /// combat auto-starts if live monsters are present.
    pub fn enter_room(
        &mut self,
        room_id: &str,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<EnterOutcome, AdventureError> {
        self.check_playable()?;
        if self.in_combat {
            return Err(AdventureError::InCombat);
        }
        if self.adventure.room(room_id).is_none() {
            return Err(AdventureError::UnknownRoom(room_id.to_string()));
        }

        let mut outcome = EnterOutcome::default();

        // Traps spring on movement, before anything else in the room.
        outcome.trap = self.spring_trap(room_id, character, roller);
        if character.is_down() {
            self.record_defeat();
        }

        self.previous_room = Some(std::mem::replace(
            &mut self.current_room,
            room_id.to_string(),
        ));
        self.visited.insert(room_id.to_string());
        let state = self
            .room_states
            .entry(room_id.to_string())
            .or_insert(RoomState::Unexplored);
        if *state != RoomState::Cleared {
            *state = RoomState::Entered;
        }

        outcome.light_went_out = self.tick_light();

        let room = match self.adventure.rooms.get(room_id) {
            Some(room) => room.clone(),
            None => return Ok(outcome),
        };
        self.narrate(NarrationStyle::Room, &room.description, false);
        if outcome.light_went_out {
            self.narrate(NarrationStyle::System, LIGHT_OUT_TEXT, true);
        }

        if self.player_defeated {
            return Ok(outcome);
        }

        if room.auto_start_combat {
            let live = room
                .contents
                .monsters
                .iter()
                .find(|id| !self.defeated.contains(*id))
                .cloned();
            if let Some(enemy_id) = live {
                self.in_combat = true;
                self.current_enemy = Some(enemy_id.clone());
                outcome.combat_started = Some(enemy_id);
            }
        }
        Ok(outcome)
    }

    /// Mark a room as visible on the map without entering it (peeking
    /// through a doorway). Never regresses a room that was entered.
    pub fn reveal_room(&mut self, room_id: &str) {
        if let Some(state) = self.room_states.get_mut(room_id) {
            if *state == RoomState::Unexplored {
                *state = RoomState::Revealed;
            }
        }
    }

    fn spring_trap(
        &mut self,
        room_id: &str,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Option<TrapEvent> {
        let room = self.adventure.rooms.get_mut(room_id)?;
        let trap = room
            .contents
            .traps
            .iter_mut()
            .find(|t| !t.triggered && !t.detected)?;
        trap.triggered = true;

        let save_roll = roller.roll(20);
        let avoided = save_roll as i32 >= trap.save_target;
        let damage = if avoided {
            0
        } else {
            match DiceExpression::parse(&trap.damage) {
                Ok(expr) => expr.roll(roller).max(0),
                Err(err) => {
                    warn!(trap_id = %trap.id, %err, "bad trap damage formula");
                    0
                }
            }
        };
        let event = TrapEvent {
            trap_id: trap.id.clone(),
            description: trap.description.clone(),
            save_roll,
            avoided,
            damage,
        };
        let text = if avoided {
            format!("A trap springs! {} You leap aside unharmed!", event.description)
        } else {
            format!(
                "A trap springs! {} You take {} damage!",
                event.description, event.damage
            )
        };
        self.narrate(NarrationStyle::System, &text, true);
        if !avoided {
            character.take_damage(damage);
        }
        Some(event)
    }

    // ========================================================================
    // Searching
    // ========================================================================

    /// Search the current room for traps and hidden exits.
    ///
    /// Detection chance comes from the trap's override or the class
    /// table, quartered when searching in the dark.
    pub fn search(
        &mut self,
        character: &Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<SearchOutcome, AdventureError> {
        self.check_playable()?;
        if self.in_combat {
            return Err(AdventureError::InCombat);
        }

        let dark = self.is_dark(character);
        let class_chance = character
            .class
            .map(|c| c.trap_detect_percent())
            .unwrap_or(17);

        let mut outcome = SearchOutcome::default();
        let current = self.current_room.clone();
        if let Some(room) = self.adventure.rooms.get_mut(&current) {
            for trap in room
                .contents
                .traps
                .iter_mut()
                .filter(|t| !t.detected && !t.triggered)
            {
                let mut chance = trap.detect_chance.unwrap_or(class_chance);
                if dark {
                    chance /= 4;
                }
                if roller.roll(100) <= chance {
                    trap.detected = true;
                    outcome.traps_found.push(trap.id.clone());
                }
            }
            for exit in room.exits.iter_mut().filter(|e| !e.discovered) {
                exit.discovered = true;
                outcome.exits_found.push(exit.direction);
            }
        }

        for trap_id in &outcome.traps_found {
            let text = format!("You spot a trap before it springs! ({trap_id})");
            self.narrate(NarrationStyle::System, &text, true);
        }
        if outcome.traps_found.is_empty() && outcome.exits_found.is_empty() {
            self.narrate(
                NarrationStyle::System,
                "You search the room carefully but find nothing unusual.",
                false,
            );
        }
        Ok(outcome)
    }

    // ========================================================================
    // Combat bridge
    // ========================================================================

    /// Build the encounter for the pending fight.
    pub fn begin_encounter(&self, character: &Character) -> Result<Encounter, AdventureError> {
        let enemy_id = self
            .current_enemy
            .as_deref()
            .ok_or(AdventureError::NotInCombat)?;
        let monster = self
            .adventure
            .monster(enemy_id)
            .ok_or_else(|| AdventureError::UnknownMonster(enemy_id.to_string()))?;
        Ok(Encounter::new(monster, self.is_dark(character)))
    }

    /// Engage a specific monster (non-automatic fights).
    pub fn start_combat(&mut self, enemy_id: &str) -> Result<(), AdventureError> {
        self.check_playable()?;
        if self.adventure.monster(enemy_id).is_none() {
            return Err(AdventureError::UnknownMonster(enemy_id.to_string()));
        }
        self.in_combat = true;
        self.current_enemy = Some(enemy_id.to_string());
        Ok(())
    }

    /// Fold a finished encounter back into the session.
    pub fn conclude_encounter(&mut self, encounter: &Encounter) -> Result<(), AdventureError> {
        match encounter.phase {
            CombatPhase::Victory => {
                let enemy_id = encounter.enemy.template.id.clone();
                self.record_victory_over(&enemy_id);
                Ok(())
            }
            CombatPhase::Defeat => {
                self.record_defeat();
                Ok(())
            }
            CombatPhase::Fled => self.record_flight(),
            _ => Err(AdventureError::NotInCombat),
        }
    }

    /// Record a won fight: the monster stays dead, the room may clear,
    /// and the adventure's victory conditions are re-checked.
    pub fn record_victory_over(&mut self, enemy_id: &str) {
        self.defeated.insert(enemy_id.to_string());
        self.in_combat = false;
        self.current_enemy = None;

        let cleared = self
            .adventure
            .rooms
            .get(&self.current_room)
            .map(|room| {
                room.contents
                    .monsters
                    .iter()
                    .all(|id| self.defeated.contains(id))
            })
            .unwrap_or(false);
        if cleared {
            self.room_states
                .insert(self.current_room.clone(), RoomState::Cleared);
        }
        self.check_victory();
    }

    /// The player went down; the adventure ends.
    pub fn record_defeat(&mut self) {
        self.in_combat = false;
        self.current_enemy = None;
        if !self.player_defeated {
            self.player_defeated = true;
            self.narrate(
                NarrationStyle::System,
                "Your wounds overcome you. The dungeon claims another adventurer.",
                true,
            );
        }
    }

    /// A successful flee: retreat to the previous room.
    pub fn record_flight(&mut self) -> Result<(), AdventureError> {
        let retreat = self
            .previous_room
            .clone()
            .ok_or(AdventureError::NoPreviousRoom)?;
        self.in_combat = false;
        self.current_enemy = None;
        self.previous_room = Some(std::mem::replace(&mut self.current_room, retreat));
        self.narrate(
            NarrationStyle::System,
            "You scramble back the way you came, heart pounding.",
            false,
        );
        Ok(())
    }

    /// Re-evaluate the victory conditions. Idempotent: the flag sets
    /// once and the celebration narrates once.
    pub fn check_victory(&mut self) -> bool {
        if self.victorious {
            return true;
        }
        let done = self
            .adventure
            .victory_conditions
            .iter()
            .all(|condition| match condition {
                VictoryCondition::DefeatMonster { monster_id, .. } => {
                    self.defeated.contains(monster_id)
                }
            });
        if done {
            self.victorious = true;
            let title = self.adventure.title.clone();
            self.narrate(
                NarrationStyle::Dm,
                &format!("Congratulations! You have completed {title}!"),
                true,
            );
        }
        done
    }

    // ========================================================================
    // Treasure, rest, light
    // ========================================================================

    /// Pick up a treasure cache from the current room.
    ///
    /// Still allowed after victory: the final guardian may die with
    /// its hoard unopened.
    pub fn collect_treasure(
        &mut self,
        treasure_id: &str,
        character: &mut Character,
    ) -> Result<(), AdventureError> {
        if self.player_defeated {
            return Err(AdventureError::AdventureOver);
        }
        if self.collected.contains(treasure_id) {
            return Err(AdventureError::AlreadyCollected(treasure_id.to_string()));
        }
        let cache = self
            .adventure
            .rooms
            .get(&self.current_room)
            .and_then(|room| {
                room.contents
                    .treasure
                    .iter()
                    .find(|cache| cache.id == treasure_id)
            })
            .cloned()
            .ok_or_else(|| AdventureError::TreasureNotHere(treasure_id.to_string()))?;

        self.collected.insert(cache.id.clone());
        character.update_gold(cache.gold as i64);
        for item_id in &cache.item_ids {
            if let Some(item) = catalog_item(item_id) {
                character.add_item(item);
            }
        }
        let text = if cache.gold > 0 {
            format!("{} You gain {} gold pieces!", cache.description, cache.gold)
        } else {
            cache.description.clone()
        };
        self.narrate(NarrationStyle::System, &text, false);
        Ok(())
    }

    /// Take a night's rest. Allowed once per adventure, never mid-fight.
    pub fn rest(&mut self, character: &mut Character) -> Result<u32, AdventureError> {
        self.check_playable()?;
        if self.in_combat {
            return Err(AdventureError::InCombat);
        }
        if self.has_rested {
            return Err(AdventureError::AlreadyRested);
        }
        self.has_rested = true;
        let healed = character.recover();
        self.narrate(
            NarrationStyle::System,
            &format!("You make camp and rest. You recover {healed} hit points."),
            false,
        );
        Ok(healed)
    }

    /// Kindle a light source. Duration is counted in rooms entered.
    pub fn kindle_light(&mut self, kind: LightKind, duration: u32) {
        self.light = LightState {
            source: Some(kind),
            remaining: duration,
        };
    }

    pub fn extinguish_light(&mut self) {
        self.light = LightState::default();
    }

    /// Burn one unit of light outside normal movement, for clients
    /// that tick a burning source on their own cadence (a Light spell
    /// counting down combat rounds). Returns true when it just died.
    pub fn decrement_light(&mut self) -> bool {
        let went_out = self.tick_light();
        if went_out {
            self.narrate(NarrationStyle::System, LIGHT_OUT_TEXT, true);
        }
        went_out
    }

    /// Burn one room's worth of light. Returns true when it just died.
    fn tick_light(&mut self) -> bool {
        if !self.light.is_lit() {
            return false;
        }
        self.light.remaining -= 1;
        if self.light.remaining == 0 {
            self.light.source = None;
            true
        } else {
            false
        }
    }

    /// Darkness matters only to characters without infravision.
    pub fn is_dark(&self, character: &Character) -> bool {
        !self.light.is_lit() && !character.has_infravision()
    }

    // ========================================================================
    // Narration and queries
    // ========================================================================

    pub fn narrate(&mut self, style: NarrationStyle, text: &str, emphasis: bool) {
        self.narration.push(NarrationEntry {
            id: Uuid::new_v4(),
            style,
            text: text.to_string(),
            emphasis,
        });
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.adventure.rooms.get(&self.current_room)
    }

    pub fn has_visited(&self, room_id: &str) -> bool {
        self.visited.contains(room_id)
    }

    pub fn is_room_cleared(&self, room_id: &str) -> bool {
        matches!(self.room_states.get(room_id), Some(RoomState::Cleared))
    }

    pub fn has_defeated(&self, monster_id: &str) -> bool {
        self.defeated.contains(monster_id)
    }

    pub fn current_enemy(&self) -> Option<&str> {
        self.current_enemy.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_data::ClassId;
    use crate::testing::{leveled_fighter, leveled_thief, ScriptedRoller};

    fn two_room_adventure() -> Adventure {
        let mut rooms = BTreeMap::new();
        rooms.insert(
            "entry".to_string(),
            Room::new("entry", "Entry", (0, 0), "A bare stone entry hall.")
                .with_exit(Exit::open(Direction::East, "lair"))
                .checkpoint(),
        );
        rooms.insert(
            "lair".to_string(),
            Room::new("lair", "Lair", (1, 0), "Bones litter the floor.")
                .with_exit(Exit::open(Direction::West, "entry"))
                .with_monster("goblin_1"),
        );
        let mut monsters = BTreeMap::new();
        monsters.insert(
            "goblin_1".to_string(),
            Monster::new("goblin_1", "Goblin", "goblin").with_hp(4, 4),
        );
        Adventure {
            id: "test".to_string(),
            title: "Test Delve".to_string(),
            description: "A short test delve.".to_string(),
            starting_room: "entry".to_string(),
            rooms,
            monsters,
            victory_conditions: vec![VictoryCondition::DefeatMonster {
                monster_id: "goblin_1".to_string(),
                description: "Defeat the goblin".to_string(),
            }],
        }
    }

    fn trapped_adventure() -> Adventure {
        let mut adventure = two_room_adventure();
        let room = adventure.rooms.get_mut("lair").unwrap();
        room.contents.monsters.clear();
        room.auto_start_combat = false;
        room.contents
            .traps
            .push(Trap::new("pit", "The floor gives way!", "1d6"));
        adventure
    }

    #[test]
    fn test_session_starts_at_starting_room() {
        let session = AdventureSession::new(two_room_adventure());
        assert_eq!(session.current_room, "entry");
        assert!(session.has_visited("entry"));
        assert_eq!(
            session.room_states.get("entry"),
            Some(&RoomState::Entered)
        );
        assert!(!session.narration.is_empty());
    }

    #[test]
    fn test_enter_room_tracks_previous_and_starts_combat() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);
        let outcome = session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        assert_eq!(session.current_room, "lair");
        assert_eq!(session.previous_room.as_deref(), Some("entry"));
        assert!(session.in_combat);
        assert_eq!(outcome.combat_started.as_deref(), Some("goblin_1"));
        assert!(session.has_visited("lair"));
    }

    #[test]
    fn test_enter_unknown_room_changes_nothing() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);
        let err = session.enter_room("vault", &mut character, &mut roller);
        assert!(matches!(err, Err(AdventureError::UnknownRoom(_))));
        assert_eq!(session.current_room, "entry");
        assert!(session.previous_room.is_none());
    }

    #[test]
    fn test_defeated_monster_does_not_restart_combat() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);
        session.defeated.insert("goblin_1".to_string());
        session.check_victory();
        // Victory was declared; exploring further is over.
        assert!(session.victorious);
        assert!(matches!(
            session.enter_room("lair", &mut character, &mut roller),
            Err(AdventureError::AdventureOver)
        ));
    }

    #[test]
    fn test_trap_triggers_once_and_save_avoids() {
        let mut session = AdventureSession::new(trapped_adventure());
        let mut character = leveled_fighter();
        // Save roll 15 >= 12: avoided, no damage dice consumed.
        let mut roller = ScriptedRoller::new([15]);
        let outcome = session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        let trap = outcome.trap.unwrap();
        assert!(trap.avoided);
        assert_eq!(trap.damage, 0);
        // Movement completed despite the trap.
        assert_eq!(session.current_room, "lair");

        // Leaving and re-entering does not spring it again.
        let mut roller = ScriptedRoller::new([]);
        session
            .enter_room("entry", &mut character, &mut roller)
            .unwrap();
        let outcome = session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        assert!(outcome.trap.is_none());
    }

    #[test]
    fn test_trap_failed_save_deals_damage() {
        let mut session = AdventureSession::new(trapped_adventure());
        let mut character = leveled_fighter();
        let hp_before = character.hp.current;
        // Save roll 5 < 12, then 1d6 shows 4.
        let mut roller = ScriptedRoller::new([5, 4]);
        let outcome = session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        let trap = outcome.trap.unwrap();
        assert!(!trap.avoided);
        assert_eq!(trap.damage, 4);
        assert_eq!(character.hp.current, hp_before - 4);
    }

    #[test]
    fn test_detected_trap_never_springs() {
        let mut session = AdventureSession::new(trapped_adventure());
        let mut character = leveled_thief();
        session.adventure.rooms.get_mut("lair").unwrap().contents.traps[0].detected = true;
        let mut roller = ScriptedRoller::new([]);
        let outcome = session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        assert!(outcome.trap.is_none());
    }

    #[test]
    fn test_search_finds_trap_by_class_chance() {
        let mut session = AdventureSession::new(trapped_adventure());
        let character = leveled_thief();
        session.kindle_light(LightKind::Torch, 6);
        session.current_room = "lair".to_string();
        // Thief searches at 33%: a 30 finds it.
        let mut roller = ScriptedRoller::new([30]);
        let outcome = session.search(&character, &mut roller).unwrap();
        assert_eq!(outcome.traps_found, vec!["pit".to_string()]);

        // Found traps stay found.
        let trap = &session.adventure.rooms["lair"].contents.traps[0];
        assert!(trap.detected);
    }

    #[test]
    fn test_search_in_darkness_is_quartered() {
        let mut session = AdventureSession::new(trapped_adventure());
        let character = leveled_thief();
        session.current_room = "lair".to_string();
        assert!(session.is_dark(&character));
        // 33 / 4 = 8 percent: a 30 now misses, an 8 still finds it.
        let mut roller = ScriptedRoller::new([30]);
        let outcome = session.search(&character, &mut roller).unwrap();
        assert!(outcome.traps_found.is_empty());
        let mut roller = ScriptedRoller::new([8]);
        let outcome = session.search(&character, &mut roller).unwrap();
        assert_eq!(outcome.traps_found.len(), 1);
    }

    #[test]
    fn test_victory_is_terminal_and_idempotent() {
        let mut session = AdventureSession::new(two_room_adventure());
        session.defeated.insert("goblin_1".to_string());
        assert!(session.check_victory());
        let narration_len = session.narration.len();
        // Checking again neither duplicates the celebration nor
        // un-wins the adventure.
        assert!(session.check_victory());
        assert_eq!(session.narration.len(), narration_len);
        assert!(session.victorious);
    }

    #[test]
    fn test_reveal_room_is_monotonic() {
        let mut session = AdventureSession::new(two_room_adventure());
        session.reveal_room("lair");
        assert_eq!(session.room_states.get("lair"), Some(&RoomState::Revealed));
        // Revealing the room you already stand in changes nothing.
        session.reveal_room("entry");
        assert_eq!(
            session.room_states.get("entry"),
            Some(&RoomState::Entered)
        );
    }

    #[test]
    fn test_rest_only_once() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        character.take_damage(5);
        let healed = session.rest(&mut character).unwrap();
        assert!(healed > 0);
        assert!(matches!(
            session.rest(&mut character),
            Err(AdventureError::AlreadyRested)
        ));
    }

    #[test]
    fn test_light_burns_per_room() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        session.kindle_light(LightKind::Torch, 2);
        let mut roller = ScriptedRoller::new([]);
        session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        assert_eq!(session.light.remaining, 1);
        session.in_combat = false; // sidestep the goblin for the clock test
        let outcome = session
            .enter_room("entry", &mut character, &mut roller)
            .unwrap();
        assert!(outcome.light_went_out);
        assert!(!session.light.is_lit());
        assert!(session.is_dark(&character));
    }

    #[test]
    fn test_decrement_light_outside_movement() {
        let mut session = AdventureSession::new(two_room_adventure());
        let character = leveled_fighter();
        session.kindle_light(LightKind::Spell, 2);

        assert!(!session.decrement_light());
        assert_eq!(session.light.remaining, 1);

        let narration_len = session.narration.len();
        assert!(session.decrement_light());
        assert!(!session.light.is_lit());
        assert!(session.is_dark(&character));
        assert_eq!(session.narration.len(), narration_len + 1);

        // Ticking an already-dead light is a no-op.
        assert!(!session.decrement_light());
    }

    #[test]
    fn test_dwarf_sees_in_the_dark() {
        let session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        character.class = Some(ClassId::Dwarf);
        assert!(!session.is_dark(&character));
    }

    #[test]
    fn test_collect_treasure_once() {
        let mut adventure = two_room_adventure();
        adventure
            .rooms
            .get_mut("entry")
            .unwrap()
            .contents
            .treasure
            .push(TreasureCache {
                id: "chest".to_string(),
                description: "An old wooden chest creaks open.".to_string(),
                gold: 50,
                item_ids: vec!["healing_potion".to_string()],
            });
        let mut session = AdventureSession::new(adventure);
        let mut character = leveled_fighter();
        let gold_before = character.gold;

        session.collect_treasure("chest", &mut character).unwrap();
        assert_eq!(character.gold, gold_before + 50);
        assert!(character.item("healing_potion").is_some());
        assert!(matches!(
            session.collect_treasure("chest", &mut character),
            Err(AdventureError::AlreadyCollected(_))
        ));
    }

    #[test]
    fn test_conclude_flight_retreats() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);
        session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        let mut encounter = session.begin_encounter(&character).unwrap();
        encounter.phase = CombatPhase::Fled;
        session.conclude_encounter(&encounter).unwrap();
        assert_eq!(session.current_room, "entry");
        assert!(!session.in_combat);
    }

    #[test]
    fn test_conclude_victory_clears_room_and_wins() {
        let mut session = AdventureSession::new(two_room_adventure());
        let mut character = leveled_fighter();
        let mut roller = ScriptedRoller::new([]);
        session
            .enter_room("lair", &mut character, &mut roller)
            .unwrap();
        let mut encounter = session.begin_encounter(&character).unwrap();
        encounter.phase = CombatPhase::Victory;
        session.conclude_encounter(&encounter).unwrap();
        assert!(session.has_defeated("goblin_1"));
        assert!(session.is_room_cleared("lair"));
        assert!(session.victorious);
    }
}
