//! Type discovery for derived-variable expressions.
//!
//! The event graph has no static schema for expressions, so the validator
//! defines the expression as a temporary column and tries to materialize it
//! as each candidate type in turn (`f64, f32, i32, u32, i64, u64, bool`, then
//! the same as sequences). The first type the graph accepts wins. Attempts
//! read a bounded prefix of rows; when the result is degenerate (no finite
//! float, or nothing at all) the prefix is doubled up to `max_check` before
//! the type is accepted with a sparse-data warning.

use lepsel_core::DerivedVar;
use lepsel_frame::{ColumnType, DType, FrameError, Node, ScalarType};
use serde::Serialize;

use crate::config::ValidationConfig;
use crate::diagnostic::{Component, Diagnostic};

/// Candidate types, in preference order.
pub const CANDIDATES: [DType; 14] = [
    DType::Scalar(ScalarType::F64),
    DType::Scalar(ScalarType::F32),
    DType::Scalar(ScalarType::I32),
    DType::Scalar(ScalarType::U32),
    DType::Scalar(ScalarType::I64),
    DType::Scalar(ScalarType::U64),
    DType::Scalar(ScalarType::Bool),
    DType::Seq(ScalarType::F64),
    DType::Seq(ScalarType::F32),
    DType::Seq(ScalarType::I32),
    DType::Seq(ScalarType::U32),
    DType::Seq(ScalarType::I64),
    DType::Seq(ScalarType::U64),
    DType::Seq(ScalarType::Bool),
];

/// Outcome of probing one candidate type.
#[derive(Debug)]
pub enum TrialOutcome {
    /// The column materializes as this type.
    Compatible {
        /// No meaningful value was seen in the rows checked.
        sparse: bool,
        /// Size of the last prefix read.
        checked: usize,
    },
    /// The column is some other type.
    TypeMismatch,
    /// Materialization failed for a reason other than the type.
    Fault(FrameError),
}

/// Values whose degeneracy can be judged after a typed read.
trait Sample: ColumnType + Sized {
    fn degenerate(rows: &[Self]) -> bool;
}

macro_rules! sample_float {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            fn degenerate(rows: &[Self]) -> bool {
                !rows.iter().any(|v| v.is_finite())
            }
        }
        impl Sample for Vec<$t> {
            fn degenerate(rows: &[Self]) -> bool {
                !rows.iter().flatten().any(|v| v.is_finite())
            }
        }
    )*};
}

macro_rules! sample_other {
    ($($t:ty),*) => {$(
        impl Sample for $t {
            fn degenerate(rows: &[Self]) -> bool {
                rows.is_empty()
            }
        }
        impl Sample for Vec<$t> {
            fn degenerate(rows: &[Self]) -> bool {
                rows.is_empty()
            }
        }
    )*};
}

sample_float!(f64, f32);
sample_other!(i32, u32, i64, u64, bool);

/// Try `column` as `dtype` over the first `n_check` rows, growing the
/// prefix while the result is degenerate.
pub fn try_type(node: &Node, column: &str, dtype: DType, n_check: usize, max_check: usize) -> TrialOutcome {
    match dtype {
        DType::Scalar(ScalarType::F64) => try_as::<f64>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::F32) => try_as::<f32>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::I32) => try_as::<i32>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::U32) => try_as::<u32>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::I64) => try_as::<i64>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::U64) => try_as::<u64>(node, column, n_check, max_check),
        DType::Scalar(ScalarType::Bool) => try_as::<bool>(node, column, n_check, max_check),
        DType::Seq(ScalarType::F64) => try_as::<Vec<f64>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::F32) => try_as::<Vec<f32>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::I32) => try_as::<Vec<i32>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::U32) => try_as::<Vec<u32>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::I64) => try_as::<Vec<i64>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::U64) => try_as::<Vec<u64>>(node, column, n_check, max_check),
        DType::Seq(ScalarType::Bool) => try_as::<Vec<bool>>(node, column, n_check, max_check),
        DType::Pairs => TrialOutcome::TypeMismatch,
    }
}

fn try_as<T: Sample>(node: &Node, column: &str, n_check: usize, max_check: usize) -> TrialOutcome {
    let mut n = n_check.max(1);
    let max_check = max_check.max(n);
    loop {
        match node.range(0, n).take::<T>(column) {
            Ok(rows) => {
                let sparse = T::degenerate(&rows);
                if sparse && n < max_check {
                    n = n.saturating_mul(2).min(max_check);
                    continue;
                }
                return TrialOutcome::Compatible { sparse, checked: n };
            }
            Err(e) if e.is_type_mismatch() => return TrialOutcome::TypeMismatch,
            Err(e) => return TrialOutcome::Fault(e),
        }
    }
}

/// Verdict for one derived variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    /// Requested column name.
    pub name: String,
    /// Expression that was tried.
    pub expr: String,
    /// Whether the variable may be defined.
    pub accepted: bool,
    /// Accepted type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,
    /// Accepted, but degenerate over every row checked.
    pub sparse: bool,
    /// Rows in the last attempt.
    pub checked: usize,
    /// Warnings and errors, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl Validation {
    pub(crate) fn rejected(dv: &DerivedVar, diagnostic: Diagnostic) -> Self {
        Self {
            name: dv.name.clone(),
            expr: dv.expr.clone(),
            accepted: false,
            dtype: None,
            sparse: false,
            checked: 0,
            diagnostics: vec![diagnostic],
        }
    }

    /// Turn an accepted verdict into a rejection carrying `diagnostic`.
    pub(crate) fn reject(&mut self, diagnostic: Diagnostic) {
        self.accepted = false;
        self.dtype = None;
        self.sparse = false;
        self.diagnostics.push(diagnostic);
    }
}

/// Derived-variable validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Validator with the given sampling limits.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Sampling limits in use.
    pub fn config(&self) -> ValidationConfig {
        self.config
    }

    /// Accept or reject `dv`, logging diagnostics.
    pub fn validate(&self, node: &Node, dv: &DerivedVar) -> bool {
        let report = self.report(node, dv);
        crate::diagnostic::emit_all(&report.diagnostics);
        report.accepted
    }

    /// Accept or reject `dv`, returning diagnostics instead of logging them.
    pub fn report(&self, node: &Node, dv: &DerivedVar) -> Validation {
        let trial_column = format!("{}_test", dv.name);
        let trial_node = match node.define(&trial_column, &dv.expr) {
            Ok(n) => n,
            Err(e) => return Validation::rejected(dv, rejection(dv, &e.to_string())),
        };

        let ValidationConfig { n_check, max_check } = self.config;
        for dtype in CANDIDATES {
            match try_type(&trial_node, &trial_column, dtype, n_check, max_check) {
                TrialOutcome::TypeMismatch => continue,
                TrialOutcome::Fault(e) => return Validation::rejected(dv, rejection(dv, &e.to_string())),
                TrialOutcome::Compatible { sparse, checked } => {
                    log::debug!("[validate] '{}' is {dtype} ({checked} rows checked)", dv.name);
                    let mut diagnostics = Vec::new();
                    if sparse {
                        diagnostics.push(Diagnostic::warning(
                            Component::Validate,
                            &dv.expr,
                            format!(
                                "'{}' evaluated as {dtype} but produced no {} in the first {checked} events (sparse data)",
                                dv.name,
                                meaningful(dtype),
                            ),
                        ));
                    }
                    return Validation {
                        name: dv.name.clone(),
                        expr: dv.expr.clone(),
                        accepted: true,
                        dtype: Some(dtype),
                        sparse,
                        checked,
                        diagnostics,
                    };
                }
            }
        }
        Validation::rejected(dv, rejection(dv, "no candidate type matches"))
    }
}

/// [`Validator::validate`] with explicit sampling limits.
pub fn validate(node: &Node, dv: &DerivedVar, n_check: usize, max_check: usize) -> bool {
    Validator::new(ValidationConfig { n_check, max_check }).validate(node, dv)
}

fn meaningful(dtype: DType) -> &'static str {
    match dtype {
        DType::Scalar(t) if t.is_float() => "finite values",
        DType::Seq(t) if t.is_float() => "finite inner values",
        _ => "rows",
    }
}

fn rejection(dv: &DerivedVar, reason: &str) -> Diagnostic {
    let mut d = Diagnostic::error(
        Component::Validate,
        &dv.expr,
        format!("cannot validate '{}' from expression: {} ({reason})", dv.name, dv.expr),
    );
    if dv.expr.contains('/') && !dv.expr.contains("SafeDiv") {
        d = d.with_hint("Expression contains '/', consider using SafeDiv(num, den, def)");
    }
    if dv.expr.contains('[') && !dv.expr.contains("SafeIndex") {
        d = d.with_hint("Expression uses indexing '[]', consider using SafeIndex(vec, idx, defaultVal)");
    }
    d
}
