//! # lepsel-pairs
//!
//! Per-event lepton pairing for three scopes (all leptons, side A, side B):
//!
//! - [`pairs`]: enumerate index pairs `(i, j)`, `i < j`, into the four
//!   disjoint sign/flavor categories;
//! - [`kinematics`]: invariant mass and ΔR per pair, computed from
//!   `pt/eta/phi/mass` arrays without building four-vectors;
//! - [`sides`]: side views gathered from the full collection through index
//!   lists;
//! - [`attach`]: register all of the above on an event graph node as lazily
//!   defined columns named per [`lepsel_core::naming`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attach;
pub mod kinematics;
pub mod pairs;
pub mod sides;

pub use attach::{attach_all, attach_flavor, attach_kinematics, attach_pairs, attach_side_view, skipped_sides};
pub use kinematics::{LeptonKinematics, delta_r, delta_rs, invariant_mass, masses};
pub use pairs::{PairLists, category_pairs, generate};
pub use sides::gather;
