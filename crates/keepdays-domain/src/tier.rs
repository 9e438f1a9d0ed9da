//! Tier module - calendar significance of an archive

use crate::date_parts::DatePart;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Retention tier of an archive
///
/// The tier is the number of leading calendar levels an archive shares with
/// an earlier archive of its group:
/// - 0: first archive of a year (kept longest)
/// - 1: first archive of a quarter
/// - 2: first archive of a month
/// - 3: first archive of an ISO week
/// - 4: first archive of a day
/// - 5: every other archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tier(u8);

impl Tier {
    /// First archive of a year
    pub const YEARLY: Tier = Tier(0);
    /// First archive of a quarter
    pub const QUARTERLY: Tier = Tier(1);
    /// First archive of a month
    pub const MONTHLY: Tier = Tier(2);
    /// First archive of an ISO week
    pub const WEEKLY: Tier = Tier(3);
    /// First archive of a day
    pub const DAILY: Tier = Tier(4);
    /// Any other archive
    pub const ORDINARY: Tier = Tier(5);

    /// Number of distinct tiers
    pub const COUNT: usize = DatePart::COUNT;

    /// All tiers, coarsest first
    pub const ALL: [Tier; Tier::COUNT] = [
        Tier::YEARLY,
        Tier::QUARTERLY,
        Tier::MONTHLY,
        Tier::WEEKLY,
        Tier::DAILY,
        Tier::ORDINARY,
    ];

    /// Build a tier from a matched-level count, clamping to [`Tier::ORDINARY`]
    pub fn clamped(matched_levels: usize) -> Self {
        Tier(matched_levels.min(Tier::ORDINARY.index()) as u8)
    }

    /// Build a tier from an index, rejecting anything past [`Tier::ORDINARY`]
    pub fn from_index(index: usize) -> Option<Self> {
        (index <= Tier::ORDINARY.index()).then_some(Tier(index as u8))
    }

    /// Position in a retention table
    pub fn index(&self) -> usize {
        usize::from(self.0)
    }

    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self.0 {
            0 => "yearly",
            1 => "quarterly",
            2 => "monthly",
            3 => "weekly",
            4 => "daily",
            _ => "ordinary",
        }
    }

    /// Parse a tier from its name or index
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "yearly" => Some(Tier::YEARLY),
            "quarterly" => Some(Tier::QUARTERLY),
            "monthly" => Some(Tier::MONTHLY),
            "weekly" => Some(Tier::WEEKLY),
            "daily" => Some(Tier::DAILY),
            "ordinary" => Some(Tier::ORDINARY),
            other => other.parse().ok().and_then(Self::from_index),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}
