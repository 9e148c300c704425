//! The encounter state machine.
//!
//! One character against one enemy, THAC0 style. Phases run
//! Initiative -> PlayerTurn <-> EnemyTurn until Victory, Defeat, or
//! Fled. The enemy turn is a synchronous step the caller invokes
//! explicitly, so the whole exchange is deterministic under a
//! scripted roller.
//!
//! Victory and defeat are checked after every HP change. Victory pays
//! out XP and rolled treasure exactly once, no matter how many times
//! the state is poked afterwards.

use crate::character::{Ability, ActiveBuff, BuffStat, Character, CharacterError};
use crate::dice::{DiceError, DiceExpression, DiceRoller};
use crate::monster::{EnemyInstance, Monster};
use crate::rules;
use crate::spells::{self, SpellError, SpellOutcome};
use crate::treasure::{generate_treasure, Treasure};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for combat actions.
#[derive(Debug, Error)]
pub enum CombatError {
    #[error("Initiative has already been rolled")]
    InitiativeAlreadyRolled,
    #[error("Initiative has not been rolled yet")]
    InitiativeNotRolled,
    #[error("It is not the player's turn")]
    NotPlayerTurn,
    #[error("It is not the enemy's turn")]
    NotEnemyTurn,
    #[error("The encounter is already over")]
    EncounterOver,
    #[error(transparent)]
    Spell(#[from] SpellError),
    #[error(transparent)]
    Character(#[from] CharacterError),
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// Where the encounter stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    Initiative,
    PlayerTurn,
    EnemyTurn,
    Victory,
    Defeat,
    Fled,
}

/// A resolved d20 attack roll.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AttackRoll {
    /// The raw d20 face.
    pub roll: u32,
    pub total: i32,
    /// THAC0 minus target AC.
    pub needed: i32,
    pub hit: bool,
    pub critical: bool,
    pub fumble: bool,
}

/// Resolve an attack against THAC0. A natural 20 always hits; a
/// natural 1 always misses.
pub fn roll_attack(
    thac0: i32,
    target_ac: i32,
    attack_bonus: i32,
    roller: &mut dyn DiceRoller,
) -> AttackRoll {
    let roll = roller.roll(20);
    let total = roll as i32 + attack_bonus;
    let needed = rules::to_hit_target(thac0, target_ac);
    let critical = roll == 20;
    let fumble = roll == 1;
    AttackRoll {
        roll,
        total,
        needed,
        hit: !fumble && (critical || total >= needed),
        critical,
        fumble,
    }
}

/// Morale check: 2d6 over the score means the monster flees.
/// A morale of 12 can never fail.
pub fn check_morale(morale: u32, roller: &mut dyn DiceRoller) -> bool {
    roller.roll(6) + roller.roll(6) > morale
}

/// What the player's weapon swing did.
#[derive(Debug, Clone)]
pub struct AttackReport {
    pub attack: AttackRoll,
    /// Zero on a miss.
    pub damage: i32,
    pub enemy_defeated: bool,
}

/// What the enemy did on its turn.
#[derive(Debug, Clone)]
pub enum EnemyAction {
    Attacked { attack: AttackRoll, damage: i32 },
    /// Asleep enemies lose the turn; the round still advances.
    SleptThrough,
    /// Broke and ran; resolves as a victory.
    Fled,
}

/// Outcome of a flee attempt.
#[derive(Debug, Clone)]
pub struct FleeReport {
    pub roll: u32,
    pub escaped: bool,
    /// A failed flee hands the enemy one free swing.
    pub free_attack: Option<(AttackRoll, i32)>,
}

/// One combat encounter against a single enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub enemy: EnemyInstance,
    pub phase: CombatPhase,
    pub round: u32,
    pub player_initiative: u32,
    pub enemy_initiative: u32,
    /// True when the player fights blind: no light and no infravision.
    pub in_darkness: bool,
    /// Damage formula for the player's readied weapon.
    pub weapon_damage: String,
    pub log: Vec<String>,
    xp_awarded: bool,
    pub treasure: Option<Treasure>,
}

/// Attack penalty for fighting in total darkness.
const DARKNESS_PENALTY: i32 = 4;

impl Encounter {
    pub fn new(template: &Monster, in_darkness: bool) -> Self {
        Encounter {
            enemy: EnemyInstance::from_template(template),
            phase: CombatPhase::Initiative,
            round: 1,
            player_initiative: 0,
            enemy_initiative: 0,
            in_darkness,
            weapon_damage: "1d8".to_string(),
            log: vec![format!("{} blocks your path!", template.name)],
            xp_awarded: false,
            treasure: None,
        }
    }

    pub fn with_weapon_damage(mut self, damage: &str) -> Self {
        self.weapon_damage = damage.to_string();
        self
    }

    /// Roll 1d6 each; the higher side acts first and the player wins
    /// ties.
    pub fn roll_initiative(
        &mut self,
        roller: &mut dyn DiceRoller,
    ) -> Result<(u32, u32), CombatError> {
        if self.phase != CombatPhase::Initiative {
            return Err(CombatError::InitiativeAlreadyRolled);
        }
        self.player_initiative = roller.roll(6);
        self.enemy_initiative = roller.roll(6);
        self.phase = if self.player_initiative >= self.enemy_initiative {
            self.log.push("You act first!".to_string());
            CombatPhase::PlayerTurn
        } else {
            self.log
                .push(format!("The {} acts first!", self.enemy.template.name));
            CombatPhase::EnemyTurn
        };
        Ok((self.player_initiative, self.enemy_initiative))
    }

    pub fn is_over(&self) -> bool {
        matches!(
            self.phase,
            CombatPhase::Victory | CombatPhase::Defeat | CombatPhase::Fled
        )
    }

    fn require_player_turn(&self) -> Result<(), CombatError> {
        match self.phase {
            CombatPhase::PlayerTurn => Ok(()),
            CombatPhase::Initiative => Err(CombatError::InitiativeNotRolled),
            CombatPhase::EnemyTurn => Err(CombatError::NotPlayerTurn),
            _ => Err(CombatError::EncounterOver),
        }
    }

    // ========================================================================
    // Player actions
    // ========================================================================

    /// Swing the readied weapon.
    pub fn player_attack(
        &mut self,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<AttackReport, CombatError> {
        self.require_player_turn()?;

        let str_mod = character.modifier_of(Ability::Strength) as i32;
        let mut bonus = str_mod + character.attack_buff_bonus();
        if self.in_darkness {
            bonus -= DARKNESS_PENALTY;
        }

        let attack = roll_attack(character.thac0, self.enemy.template.ac, bonus, roller);
        let name = self.enemy.template.name.clone();

        if !attack.hit {
            self.log.push(format!(
                "You swing at the {} and miss! (rolled {}, needed {})",
                name, attack.total, attack.needed
            ));
            self.phase = CombatPhase::EnemyTurn;
            return Ok(AttackReport {
                attack,
                damage: 0,
                enemy_defeated: false,
            });
        }

        let weapon = DiceExpression::parse(&self.weapon_damage)?;
        let rolled = weapon.roll(roller);
        let mut damage = if weapon.is_fixed() {
            rolled.max(0)
        } else {
            (rolled + str_mod).max(1)
        };
        if attack.critical {
            damage *= 2;
            self.log.push(format!("A critical hit on the {name}!"));
        }
        self.enemy.take_damage(damage);
        self.log
            .push(format!("You hit the {name} for {damage} damage!"));

        if self.enemy.is_defeated() {
            self.resolve_victory(character, roller);
        } else {
            self.phase = CombatPhase::EnemyTurn;
        }
        Ok(AttackReport {
            attack,
            damage,
            enemy_defeated: self.enemy.is_defeated(),
        })
    }

    /// Cast a spell at the enemy (or on yourself).
    ///
    /// A rejected cast (unknown, unlearned, no slots) leaves the turn
    /// with the player.
    pub fn cast_spell(
        &mut self,
        character: &mut Character,
        spell_id: &str,
        roller: &mut dyn DiceRoller,
    ) -> Result<SpellOutcome, CombatError> {
        self.require_player_turn()?;

        let outcome = spells::cast_spell(character, Some(&mut self.enemy), spell_id, roller)?;
        let message = match &outcome {
            SpellOutcome::Healed { message, .. }
            | SpellOutcome::Damaged { message, .. }
            | SpellOutcome::Buffed { message, .. }
            | SpellOutcome::Utility { message, .. }
            | SpellOutcome::Slept { message, .. }
            | SpellOutcome::NoEffect { message } => message.clone(),
        };
        self.log.push(message);

        if self.enemy.is_defeated() {
            self.resolve_victory(character, roller);
        } else {
            self.phase = CombatPhase::EnemyTurn;
        }
        Ok(outcome)
    }

    /// Fight defensively: +2 AC until the start of the next player turn.
    pub fn defend(&mut self, character: &mut Character) -> Result<(), CombatError> {
        self.require_player_turn()?;
        character.add_buff(ActiveBuff {
            source: "defend".to_string(),
            stat: BuffStat::ArmorClass,
            bonus: 2,
            rounds_remaining: 1,
        });
        self.log
            .push("You raise your guard and fight defensively.".to_string());
        self.phase = CombatPhase::EnemyTurn;
        Ok(())
    }

    /// Try to run: 1-3 on 1d6 escapes to the previous room. Failure
    /// gives the enemy one free swing and the turn comes back to the
    /// player.
    pub fn flee(
        &mut self,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<FleeReport, CombatError> {
        self.require_player_turn()?;

        let roll = roller.roll(6);
        if roll <= 3 {
            self.phase = CombatPhase::Fled;
            self.log
                .push("You turn and run, escaping the fight!".to_string());
            return Ok(FleeReport {
                roll,
                escaped: true,
                free_attack: None,
            });
        }

        self.log.push(format!(
            "You try to flee, but the {} blocks your escape!",
            self.enemy.template.name
        ));
        let free_attack = if self.enemy.is_asleep() {
            None
        } else {
            Some(self.enemy_strike(character, roller)?)
        };

        if character.is_down() {
            self.resolve_defeat();
        } else {
            self.advance_to_player_turn(character);
        }
        Ok(FleeReport {
            roll,
            escaped: false,
            free_attack,
        })
    }

    // ========================================================================
    // Enemy turn
    // ========================================================================

    /// Resolve the enemy's turn. The caller invokes this whenever the
    /// phase says `EnemyTurn`.
    pub fn enemy_turn(
        &mut self,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<EnemyAction, CombatError> {
        match self.phase {
            CombatPhase::EnemyTurn => {}
            CombatPhase::Initiative => return Err(CombatError::InitiativeNotRolled),
            CombatPhase::PlayerTurn => return Err(CombatError::NotEnemyTurn),
            _ => return Err(CombatError::EncounterOver),
        }
        let name = self.enemy.template.name.clone();

        if self.enemy.is_asleep() {
            self.log.push(format!("The {name} is fast asleep."));
            self.advance_to_player_turn(character);
            return Ok(EnemyAction::SleptThrough);
        }

        if self.enemy.is_bloodied() && check_morale(self.enemy.template.morale, roller) {
            self.log
                .push(format!("The {name} loses its nerve and flees the battle!"));
            self.resolve_victory(character, roller);
            return Ok(EnemyAction::Fled);
        }

        let (attack, damage) = self.enemy_strike(character, roller)?;
        if character.is_down() {
            self.resolve_defeat();
        } else {
            self.advance_to_player_turn(character);
        }
        Ok(EnemyAction::Attacked { attack, damage })
    }

    /// One enemy swing against the player's buffed AC.
    fn enemy_strike(
        &mut self,
        character: &mut Character,
        roller: &mut dyn DiceRoller,
    ) -> Result<(AttackRoll, i32), CombatError> {
        let name = self.enemy.template.name.clone();
        let attack = roll_attack(
            self.enemy.template.thac0,
            character.effective_ac(),
            0,
            roller,
        );
        if !attack.hit {
            self.log.push(format!("The {name} attacks you and misses!"));
            return Ok((attack, 0));
        }

        let formula = DiceExpression::parse(&self.enemy.template.damage)?;
        let rolled = formula.roll(roller);
        // Fixed-damage monsters (the rust monster's "0") deal exactly
        // that; rolled damage has a floor of 1.
        let mut damage = if formula.is_fixed() {
            rolled.max(0)
        } else {
            rolled.max(1)
        };
        if attack.critical {
            damage *= 2;
        }
        character.take_damage(damage);
        self.log
            .push(format!("The {name} hits you for {damage} damage!"));
        Ok((attack, damage))
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    fn advance_to_player_turn(&mut self, character: &mut Character) {
        self.round += 1;
        character.tick_buffs();
        self.phase = CombatPhase::PlayerTurn;
    }

    /// Enter Victory and pay out XP and treasure. Safe to reach more
    /// than once; the award only ever happens the first time.
    fn resolve_victory(&mut self, character: &mut Character, roller: &mut dyn DiceRoller) {
        self.phase = CombatPhase::Victory;
        if self.xp_awarded {
            return;
        }
        self.xp_awarded = true;

        let template = &self.enemy.template;
        if !template.defeated_text.is_empty() {
            self.log.push(template.defeated_text.clone());
        }
        character.add_xp(template.xp);
        self.log.push(format!("You gain {} XP!", template.xp));

        let treasure = generate_treasure(&template.id, &template.kind, roller);
        if treasure.gold > 0 {
            character.update_gold(treasure.gold as i64);
            self.log
                .push(format!("You find {} gold pieces!", treasure.gold));
        }
        for item in &treasure.items {
            self.log.push(format!("You find: {}!", item.name));
            character.add_item(item.clone());
        }
        self.treasure = Some(treasure);
    }

    fn resolve_defeat(&mut self) {
        self.phase = CombatPhase::Defeat;
        self.log
            .push("You collapse to the ground. Your adventure ends here...".to_string());
    }
}
