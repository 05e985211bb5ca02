//! # lepsel-select
//!
//! Turning human-authored selections into filters over the event graph.
//!
//! - [`cut`]: the shorthand lepton-cut compiler (`">=1OSSF|mass<65"`), which
//!   builds a small [`cut::CutExpr`] tree and serializes it to the expression
//!   dialect;
//! - [`macros`]: textual function-call aliasing (`SUM(..)` to
//!   `ROOT::VecOps::Sum(..)`);
//! - [`validate`]: type probing of derived-variable expressions against a
//!   schema-less node;
//! - [`config`] and [`plan`]: YAML selection plans, node preparation,
//!   per-region filter lists, cut-flows and yields.
//!
//! Per-predicate failures never abort a run. They are returned as
//! [`Diagnostic`]s (and logged) so callers can drop the offending cut,
//! variable or region and carry on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod cut;
pub mod diagnostic;
pub mod error;
pub mod macros;
pub mod plan;
pub mod validate;

pub use config::{RegionConfig, SelectionConfig, UserCut, ValidationConfig, split_top_level};
pub use cut::{CompiledCut, CutExpr, compile, compile_cut};
pub use diagnostic::{Component, Diagnostic, Level};
pub use error::{Error, Result};
pub use macros::MacroExpander;
pub use plan::{
    CutFlow, CutFlowEntry, FilterKind, FilterStep, PreparedNode, RegionPlan, RegionReport,
    SelectionReport, Yield, cutflow, prepare_node, region_yield, run_regions,
};
pub use validate::{TrialOutcome, Validation, Validator, validate};
