//! Column naming contract shared by the pair machinery, the cut compiler and
//! downstream selection plans.
//!
//! | quantity            | name                                   | example               |
//! |---------------------|----------------------------------------|-----------------------|
//! | lepton array        | `<Field>_lep<suffix>`                  | `Charge_lep_a`        |
//! | side index list     | `Index_lep<suffix>`                    | `Index_lep_b`         |
//! | pair list           | `<prefix><Category>Pairs`              | `A_OSSFPairs`         |
//! | pair count          | `<prefix>Num<Category>Pairs`           | `NumSSOFPairs`        |
//! | per-pair mass       | `Mass_<kin-prefix><Category>Pairs`     | `Mass_All_OSSFPairs`  |
//! | per-pair ΔR         | `DeltaR_<kin-prefix><Category>Pairs`   | `DeltaR_B_OSOFPairs`  |

use crate::scope::{PairCategory, Scope};

/// Per-lepton arrays that make up a lepton side-view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeptonField {
    /// Transverse momentum.
    Pt,
    /// Pseudorapidity.
    Eta,
    /// Azimuthal angle.
    Phi,
    /// Mass.
    Mass,
    /// Electric charge (±1).
    Charge,
    /// Flavor code (0 = electron, 1 = muon).
    Flavor,
    /// Identification quality (0 = gold .. 2 = bronze).
    Quality,
    /// Signed PDG id. Only present for the full collection.
    PdgId,
}

impl LeptonField {
    /// Fields carried by every side-view, in gather order.
    pub const VIEW: [LeptonField; 7] = [
        LeptonField::Pt,
        LeptonField::Eta,
        LeptonField::Phi,
        LeptonField::Mass,
        LeptonField::Charge,
        LeptonField::Flavor,
        LeptonField::Quality,
    ];

    /// Column stem (`PT`, `Eta`, ...).
    pub fn stem(self) -> &'static str {
        match self {
            LeptonField::Pt => "PT",
            LeptonField::Eta => "Eta",
            LeptonField::Phi => "Phi",
            LeptonField::Mass => "M",
            LeptonField::Charge => "Charge",
            LeptonField::Flavor => "Flavor",
            LeptonField::Quality => "Quality",
            LeptonField::PdgId => "PDGID",
        }
    }

    /// `true` for the floating-point kinematic fields.
    pub fn is_kinematic(self) -> bool {
        matches!(self, LeptonField::Pt | LeptonField::Eta | LeptonField::Phi | LeptonField::Mass)
    }
}

/// Name of a per-lepton array in `scope`.
pub fn lepton(field: LeptonField, scope: Scope) -> String {
    format!("{}_lep{}", field.stem(), scope.lepton_suffix())
}

/// Name of the externally supplied index list selecting a side, `None` for
/// the full collection.
pub fn side_index(scope: Scope) -> Option<String> {
    scope.is_side().then(|| format!("Index_lep{}", scope.lepton_suffix()))
}

/// Name of the pair list for `category` in `scope`.
pub fn pair_list(scope: Scope, category: PairCategory) -> String {
    format!("{}{}Pairs", scope.pair_prefix(), category.name())
}

/// Name of the pair count for `category` in `scope`.
pub fn pair_count(scope: Scope, category: PairCategory) -> String {
    format!("{}Num{}Pairs", scope.pair_prefix(), category.name())
}

/// Name of the per-pair invariant-mass sequence.
pub fn pair_mass(scope: Scope, category: PairCategory) -> String {
    format!("Mass_{}{}Pairs", scope.kinematics_prefix(), category.name())
}

/// Name of the per-pair ΔR sequence.
pub fn pair_delta_r(scope: Scope, category: PairCategory) -> String {
    format!("DeltaR_{}{}Pairs", scope.kinematics_prefix(), category.name())
}
