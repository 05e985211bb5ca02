//! # lepsel-core
//!
//! Shared vocabulary for the lepsel crates.
//!
//! Every quantity the selection core produces is computed over one of three
//! lepton [`Scope`]s and, for pair quantities, one of four [`PairCategory`]s.
//! The [`naming`] module turns those into the column names the event store
//! sees; nothing outside it should spell a column name by hand.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod naming;
pub mod scope;
pub mod types;

pub use error::{Error, Result};
pub use naming::LeptonField;
pub use scope::{PairCategory, Scope};
pub use types::{Charge, DerivedVar, Flavor, Quality};
