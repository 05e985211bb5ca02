//! Lepton scopes and pair categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which subset of an event's leptons a quantity is computed over.
///
/// `All` is the full lepton collection; `A` and `B` are the two hemispheres
/// ("sides") obtained by gathering the `All` arrays through per-event index
/// lists supplied by the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scope {
    /// Every lepton in the event.
    #[default]
    #[serde(rename = "", alias = "all")]
    All,
    /// Side A.
    #[serde(rename = "a", alias = "A")]
    A,
    /// Side B.
    #[serde(rename = "b", alias = "B")]
    B,
}

impl Scope {
    /// All scopes, in definition order.
    pub const ALL: [Scope; 3] = [Scope::All, Scope::A, Scope::B];

    /// Prefix used by pair lists and pair counts (`""`, `"A_"`, `"B_"`).
    pub fn pair_prefix(self) -> &'static str {
        match self {
            Scope::All => "",
            Scope::A => "A_",
            Scope::B => "B_",
        }
    }

    /// Prefix used inside per-pair kinematic names, where the full collection
    /// is spelled out (`"All_"`, `"A_"`, `"B_"`).
    pub fn kinematics_prefix(self) -> &'static str {
        match self {
            Scope::All => "All_",
            Scope::A => "A_",
            Scope::B => "B_",
        }
    }

    /// Suffix appended to per-lepton arrays (`""`, `"_a"`, `"_b"`).
    pub fn lepton_suffix(self) -> &'static str {
        match self {
            Scope::All => "",
            Scope::A => "_a",
            Scope::B => "_b",
        }
    }

    /// The scope token accepted at the string boundary (`""`, `"a"`, `"b"`).
    pub fn token(self) -> &'static str {
        match self {
            Scope::All => "",
            Scope::A => "a",
            Scope::B => "b",
        }
    }

    /// `true` for the two sides.
    pub fn is_side(self) -> bool {
        !matches!(self, Scope::All)
    }
}

impl FromStr for Scope {
    type Err = Error;

    /// Parse a boundary scope token. The empty string (and `all`) is the full
    /// collection; `a`/`b` are accepted in either case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "all" | "All" => Ok(Scope::All),
            "a" | "A" => Ok(Scope::A),
            "b" | "B" => Ok(Scope::B),
            other => Err(Error::Parse(format!("unknown scope '{other}' (expected '', 'a' or 'b')"))),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => f.write_str("All"),
            Scope::A => f.write_str("A"),
            Scope::B => f.write_str("B"),
        }
    }
}

/// Classification of a two-lepton combination by sign and flavor agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PairCategory {
    /// Opposite sign, same flavor.
    Ossf,
    /// Opposite sign, opposite flavor.
    Osof,
    /// Same sign, same flavor.
    Sssf,
    /// Same sign, opposite flavor.
    Ssof,
}

impl PairCategory {
    /// All categories, in the order their lists are produced.
    pub const ALL: [PairCategory; 4] =
        [PairCategory::Ossf, PairCategory::Osof, PairCategory::Sssf, PairCategory::Ssof];

    /// Classify a pair from its flavor and charge agreement.
    #[inline]
    pub fn classify(same_flavor: bool, same_charge: bool) -> Self {
        match (same_flavor, same_charge) {
            (true, false) => PairCategory::Ossf,
            (false, false) => PairCategory::Osof,
            (true, true) => PairCategory::Sssf,
            (false, true) => PairCategory::Ssof,
        }
    }

    /// Position of this category in [`PairCategory::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Upper-case short name (`"OSSF"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            PairCategory::Ossf => "OSSF",
            PairCategory::Osof => "OSOF",
            PairCategory::Sssf => "SSSF",
            PairCategory::Ssof => "SSOF",
        }
    }
}

impl FromStr for PairCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OSSF" => Ok(PairCategory::Ossf),
            "OSOF" => Ok(PairCategory::Osof),
            "SSSF" => Ok(PairCategory::Sssf),
            "SSOF" => Ok(PairCategory::Ssof),
            other => Err(Error::Parse(format!("unknown pair category '{other}'"))),
        }
    }
}

impl fmt::Display for PairCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
