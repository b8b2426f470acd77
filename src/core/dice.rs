//! Dice Expressions
//!
//! Parses and rolls damage expressions of the form `NdS+M` ("1d8+2", "2d6",
//! "d20", or a bare constant "3"). Parsed once at catalog load, rolled many
//! times during combat.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize, Serializer, Deserializer};
use serde::de::Error as _;

use super::rng::DeterministicRng;

/// A parsed dice expression: `count` dice of `sides` sides plus `modifier`.
///
/// A bare constant like "3" parses as zero dice with modifier 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiceExpr {
    /// Number of dice rolled.
    pub count: u32,
    /// Sides per die.
    pub sides: u32,
    /// Flat modifier added after the dice.
    pub modifier: i32,
}

/// Error parsing a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiceParseError {
    /// Expression was empty or whitespace.
    #[error("empty dice expression")]
    Empty,

    /// Expression did not match `NdS+M` or a bare integer.
    #[error("malformed dice expression: {0:?}")]
    Malformed(String),

    /// A die with zero sides or an absurd die count.
    #[error("dice expression out of range: {0:?}")]
    OutOfRange(String),
}

/// Upper bound on dice count and sides. Catalog data within these bounds
/// cannot overflow i32 damage totals.
const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

impl DiceExpr {
    /// A constant expression with no dice.
    pub const fn flat(modifier: i32) -> Self {
        Self { count: 0, sides: 0, modifier }
    }

    /// Roll the expression.
    pub fn roll(&self, rng: &mut DeterministicRng) -> i32 {
        let mut total = self.modifier;
        for _ in 0..self.count {
            total += rng.roll_die(self.sides);
        }
        total
    }

    /// Roll as a critical hit: dice count is doubled, modifier is not.
    pub fn roll_crit(&self, rng: &mut DeterministicRng) -> i32 {
        let mut total = self.modifier;
        for _ in 0..self.count * 2 {
            total += rng.roll_die(self.sides);
        }
        total
    }

    /// Minimum possible result.
    pub fn min(&self) -> i32 {
        self.modifier + self.count as i32
    }

    /// Maximum possible result.
    pub fn max(&self) -> i32 {
        self.modifier + (self.count * self.sides) as i32
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier.cmp(&0) {
            std::cmp::Ordering::Greater => write!(f, "+{}", self.modifier),
            std::cmp::Ordering::Less => write!(f, "{}", self.modifier),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }
}

impl FromStr for DiceExpr {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let malformed = || DiceParseError::Malformed(s.to_string());

        let Some(d_pos) = trimmed.find(['d', 'D']) else {
            // Bare constant
            let modifier = trimmed.parse::<i32>().map_err(|_| malformed())?;
            return Ok(Self::flat(modifier));
        };

        let (count_str, rest) = trimmed.split_at(d_pos);
        let rest = &rest[1..]; // skip the 'd'

        // "d8" means "1d8"
        let count = if count_str.is_empty() {
            1
        } else {
            count_str.parse::<u32>().map_err(|_| malformed())?
        };

        // Split off the modifier, if any
        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(sign_pos) => {
                let (sides_str, mod_str) = rest.split_at(sign_pos);
                let modifier = mod_str.parse::<i32>().map_err(|_| malformed())?;
                (sides_str, modifier)
            }
            None => (rest, 0),
        };

        let sides = sides_str.parse::<u32>().map_err(|_| malformed())?;

        if count == 0 || count > MAX_DICE || sides == 0 || sides > MAX_SIDES {
            return Err(DiceParseError::OutOfRange(s.to_string()));
        }

        Ok(Self { count, sides, modifier })
    }
}

impl Serialize for DiceExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DiceExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================
