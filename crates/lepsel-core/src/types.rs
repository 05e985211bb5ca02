//! Lepton codes and derived-variable requests.

use serde::{Deserialize, Serialize};

/// Lepton identification quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Tightest identification (code 0).
    Gold,
    /// Intermediate identification (code 1).
    Silver,
    /// Loosest identification (code 2).
    Bronze,
}

impl Quality {
    /// Numeric code stored in `Quality_lep*` arrays.
    pub fn code(self) -> i32 {
        match self {
            Quality::Gold => 0,
            Quality::Silver => 1,
            Quality::Bronze => 2,
        }
    }

    /// Parse the shorthand keyword (`Gold`, `Silver`, `Bronze`).
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "Gold" => Some(Quality::Gold),
            "Silver" => Some(Quality::Silver),
            "Bronze" => Some(Quality::Bronze),
            _ => None,
        }
    }
}

/// Lepton electric charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Charge {
    /// +1
    Pos,
    /// -1
    Neg,
}

impl Charge {
    /// Value stored in `Charge_lep*` arrays.
    pub fn value(self) -> i32 {
        match self {
            Charge::Pos => 1,
            Charge::Neg => -1,
        }
    }

    /// Parse the shorthand keyword (`Pos`, `Neg`).
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "Pos" => Some(Charge::Pos),
            "Neg" => Some(Charge::Neg),
            _ => None,
        }
    }
}

/// Lepton flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flavor {
    /// Electron: code 0, |PDG id| 11.
    Electron,
    /// Muon: code 1, |PDG id| 13.
    Muon,
}

impl Flavor {
    /// Numeric code stored in `Flavor_lep*` arrays.
    pub fn code(self) -> i32 {
        match self {
            Flavor::Electron => 0,
            Flavor::Muon => 1,
        }
    }

    /// Absolute PDG id.
    pub fn pdg_id(self) -> i32 {
        match self {
            Flavor::Electron => 11,
            Flavor::Muon => 13,
        }
    }

    /// Flavor code for a signed PDG id. Anything that is not a muon is
    /// treated as an electron, matching the two-flavor convention.
    pub fn code_from_pdg_id(pdg_id: i32) -> i32 {
        if pdg_id.abs() == 13 { Flavor::Muon.code() } else { Flavor::Electron.code() }
    }

    /// Parse the shorthand keyword (`Elec`, `Muon`, `Mu`).
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "Elec" => Some(Flavor::Electron),
            "Muon" | "Mu" => Some(Flavor::Muon),
            _ => None,
        }
    }
}

/// A request to extend the column schema with `name := expr`.
///
/// Nothing guarantees the expression is valid until it has been type-checked
/// against a concrete node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedVar {
    /// Column name to create.
    pub name: String,
    /// Expression defining it.
    pub expr: String,
}

impl DerivedVar {
    /// Create a new derived-variable request.
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self { name: name.into(), expr: expr.into() }
    }

    /// Request that re-checks an existing column under its own name.
    pub fn existing(column: impl Into<String>) -> Self {
        let column = column.into();
        Self { name: column.clone(), expr: column }
    }
}
