//! Basic Rules dice system.
//!
//! Supports the notation the 1983 rulebook uses: `NdM`, `NdM+K`,
//! `NdM-K`, and plain fixed numbers (a few monsters deal flat damage).
//! Every roll in the crate flows through the [`DiceRoller`] trait so
//! tests can substitute scripted die faces.

use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing and rolling.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Source of individual die faces.
///
/// Production code uses [`RandomRoller`]; tests feed exact sequences
/// through `testing::ScriptedRoller`.
pub trait DiceRoller {
    /// Roll one die with the given number of sides, returning 1..=sides.
    fn roll(&mut self, sides: u32) -> u32;
}

/// The default roller, backed by a rand RNG.
pub struct RandomRoller<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomRoller<R> {
    pub fn new(rng: R) -> Self {
        RandomRoller { rng }
    }
}

impl<R: Rng> DiceRoller for RandomRoller<R> {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }
}

/// Convenience constructor for the thread-local RNG roller.
pub fn default_roller() -> RandomRoller<ThreadRng> {
    RandomRoller::new(rand::thread_rng())
}

/// Roll a single die.
pub fn roll_die(roller: &mut dyn DiceRoller, sides: u32) -> u32 {
    roller.roll(sides)
}

/// Roll several dice of the same size, returning the individual faces.
pub fn roll_dice(roller: &mut dyn DiceRoller, count: u32, sides: u32) -> Vec<u32> {
    (0..count).map(|_| roller.roll(sides)).collect()
}

/// Roll several dice of the same size and sum them.
pub fn roll_dice_sum(roller: &mut dyn DiceRoller, count: u32, sides: u32) -> u32 {
    roll_dice(roller, count, sides).iter().sum()
}

/// A 3d6 ability-score roll: the individual faces plus their total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityRoll {
    pub rolls: Vec<u32>,
    pub total: u32,
}

/// Roll 3d6 straight down, as the Basic Rules demand.
pub fn roll_3d6(roller: &mut dyn DiceRoller) -> AbilityRoll {
    let rolls = roll_dice(roller, 3, 6);
    let total = rolls.iter().sum();
    AbilityRoll { rolls, total }
}

/// One 3d6 roll for each of the six abilities, in rulebook order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityScoreRolls {
    pub strength: AbilityRoll,
    pub intelligence: AbilityRoll,
    pub wisdom: AbilityRoll,
    pub dexterity: AbilityRoll,
    pub constitution: AbilityRoll,
    pub charisma: AbilityRoll,
}

impl AbilityScoreRolls {
    /// Collapse the rolls into a plain score block.
    pub fn scores(&self) -> crate::character::AbilityScores {
        crate::character::AbilityScores::new(
            self.strength.total as u8,
            self.intelligence.total as u8,
            self.wisdom.total as u8,
            self.dexterity.total as u8,
            self.constitution.total as u8,
            self.charisma.total as u8,
        )
    }
}

pub fn roll_ability_scores(roller: &mut dyn DiceRoller) -> AbilityScoreRolls {
    AbilityScoreRolls {
        strength: roll_3d6(roller),
        intelligence: roll_3d6(roller),
        wisdom: roll_3d6(roller),
        dexterity: roll_3d6(roller),
        constitution: roll_3d6(roller),
        charisma: roll_3d6(roller),
    }
}

/// A parsed dice expression (e.g. `2d6+1`).
///
/// A `count` of zero means the expression was a plain number carried
/// entirely in `modifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpression {
    /// Parse a dice notation string.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let Some(d_pos) = notation.find('d') else {
            // Plain number, used for fixed damage values like "0".
            let value: i32 = notation
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
            return Ok(DiceExpression {
                count: 0,
                sides: 0,
                modifier: value,
            });
        };

        let count_str = &notation[..d_pos];
        let rest = &notation[d_pos + 1..];

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?
        };

        let (sides_str, modifier) = if let Some(plus_pos) = rest.find('+') {
            let value: i32 = rest[plus_pos + 1..]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
            (&rest[..plus_pos], value)
        } else if let Some(minus_pos) = rest.find('-') {
            let value: i32 = rest[minus_pos + 1..]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
            (&rest[..minus_pos], -value)
        } else {
            (rest, 0)
        };

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
        if sides == 0 {
            return Err(DiceError::InvalidDieSize(sides));
        }

        Ok(DiceExpression {
            count,
            sides,
            modifier,
        })
    }

    /// True if this expression involves no dice at all.
    pub fn is_fixed(&self) -> bool {
        self.count == 0
    }

    /// Roll the expression.
    pub fn roll(&self, roller: &mut dyn DiceRoller) -> i32 {
        let dice_total: i32 = (0..self.count).map(|_| roller.roll(self.sides) as i32).sum();
        dice_total + self.modifier
    }

    /// Lowest possible result.
    pub fn min_value(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// Highest possible result.
    pub fn max_value(&self) -> i32 {
        (self.count * self.sides) as i32 + self.modifier
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fixed() {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)?;
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)?;
        }
        Ok(())
    }
}

/// Parse and roll a notation string in one step.
pub fn roll_notation(notation: &str, roller: &mut dyn DiceRoller) -> Result<i32, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.roll(roller))
}
