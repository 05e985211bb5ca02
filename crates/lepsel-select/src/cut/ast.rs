//! Compiled cut trees and their serialization to the expression dialect.
//!
//! Aggregates are written with the `SUM`/`SIZE` macros, so a compiled cut
//! reads like hand-written selection text and is normalized by the same
//! [`crate::MacroExpander`] pass as user-authored cuts.

use std::fmt;

/// Comparison operator of a shorthand token or pair predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==` (written `=` in shorthand)
    Eq,
    /// `>=`
    Ge,
    /// `>`
    Gt,
}

impl CmpOp {
    /// Parse the shorthand spelling (`<`, `<=`, `=`, `==`, `>=`, `>`).
    pub fn from_shorthand(s: &str) -> Option<Self> {
        match s {
            "<" => Some(CmpOp::Lt),
            "<=" => Some(CmpOp::Le),
            "=" | "==" => Some(CmpOp::Eq),
            ">=" => Some(CmpOp::Ge),
            ">" => Some(CmpOp::Gt),
            _ => None,
        }
    }

    /// Operator in the expression dialect.
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Eq => "==",
            CmpOp::Ge => ">=",
            CmpOp::Gt => ">",
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal on the right of a per-lepton or per-pair comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integer code (charge, quality, flavor, PDG id).
    Int(i32),
    /// Kinematic threshold.
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{}", Threshold(*v)),
        }
    }
}

/// A float literal as the expression dialect reads it back: whole values
/// that fit an `i32` stay bare (`65`), anything else keeps a fraction or an
/// exponent (`0.4`, `1e20`).
struct Threshold(f64);

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.fract() == 0.0 && v.abs() <= f64::from(i32::MAX) { write!(f, "{v}") } else { write!(f, "{v:?}") }
    }
}

/// Elementwise boolean mask over a sequence column.
#[derive(Debug, Clone, PartialEq)]
pub enum Mask {
    /// `column <op> value`, optionally on `abs(column)`.
    Compare {
        /// Sequence column.
        column: String,
        /// Compare `abs(column)` instead of the raw values.
        abs: bool,
        /// Operator.
        op: CmpOp,
        /// Right-hand side.
        value: Number,
    },
    /// `!(column >= low && column <= high)`.
    Veto {
        /// Sequence column.
        column: String,
        /// Lower edge, inclusive.
        low: f64,
        /// Upper edge, inclusive.
        high: f64,
    },
    /// Elementwise conjunction.
    And(Vec<Mask>),
}

impl Mask {
    /// Plain comparison of a sequence column against a value.
    pub fn compare(column: impl Into<String>, op: CmpOp, value: Number) -> Self {
        Mask::Compare { column: column.into(), abs: false, op, value }
    }

    /// Conjunction, collapsing a single element to itself.
    pub fn all(mut masks: Vec<Mask>) -> Self {
        if masks.len() == 1 { masks.remove(0) } else { Mask::And(masks) }
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mask::Compare { column, abs: true, op, value } => write!(f, "abs({column}) {op} {value}"),
            Mask::Compare { column, abs: false, op, value } => write!(f, "{column} {op} {value}"),
            Mask::Veto { column, low, high } => {
                write!(f, "!({column} >= {} && {column} <= {})", Threshold(*low), Threshold(*high))
            }
            Mask::And(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" && ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Per-event quantity a cut compares.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A scalar column, e.g. a pair count.
    Column(String),
    /// Number of elements passing a mask.
    Sum(Mask),
    /// Length of a sequence column.
    Size(String),
    /// Literal count.
    Const(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(c) => f.write_str(c),
            Operand::Sum(mask) => write!(f, "SUM({mask})"),
            Operand::Size(c) => write!(f, "SIZE({c})"),
            Operand::Const(n) => write!(f, "{n}"),
        }
    }
}

/// A compiled event-level cut.
#[derive(Debug, Clone, PartialEq)]
pub enum CutExpr {
    /// `lhs <op> rhs`.
    Compare {
        /// Left-hand side.
        lhs: Operand,
        /// Operator.
        op: CmpOp,
        /// Right-hand side.
        rhs: Operand,
    },
    /// True when any branch is true.
    Any {
        /// Alternatives.
        branches: Vec<CutExpr>,
    },
}

impl CutExpr {
    /// `lhs <op> N`.
    pub fn count(lhs: Operand, op: CmpOp, n: u32) -> Self {
        CutExpr::Compare { lhs, op, rhs: Operand::Const(n) }
    }

    fn fmt_bare(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CutExpr::Compare { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            CutExpr::Any { branches } => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    match branch {
                        CutExpr::Compare { .. } => branch.fmt_bare(f)?,
                        CutExpr::Any { .. } => write!(f, "{branch}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for CutExpr {
    /// Always wrapped in one pair of parentheses, so the result can be
    /// conjoined with other filters as is.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        self.fmt_bare(f)?;
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_on_column() {
        let cut = CutExpr::count(Operand::Column("NumOSSFPairs".into()), CmpOp::Ge, 1);
        assert_eq!(cut.to_string(), "(NumOSSFPairs >= 1)");
    }

    #[test]
    fn masked_sum_with_veto() {
        let mask = Mask::all(vec![
            Mask::compare("Mass_All_OSSFPairs", CmpOp::Gt, Number::Float(12.0)),
            Mask::Veto { column: "Mass_All_OSSFPairs".into(), low: 81.0, high: 101.5 },
        ]);
        let cut = CutExpr::count(Operand::Sum(mask), CmpOp::Eq, 0);
        assert_eq!(
            cut.to_string(),
            "(SUM(Mass_All_OSSFPairs > 12 && !(Mass_All_OSSFPairs >= 81 && Mass_All_OSSFPairs <= 101.5)) == 0)"
        );
    }

    #[test]
    fn alternatives_share_one_paren() {
        let branch = |v| CutExpr::Compare {
            lhs: Operand::Sum(Mask::compare("Charge_lep", CmpOp::Eq, Number::Int(v))),
            op: CmpOp::Eq,
            rhs: Operand::Size("Charge_lep".into()),
        };
        let cut = CutExpr::Any { branches: vec![branch(1), branch(-1)] };
        assert_eq!(
            cut.to_string(),
            "(SUM(Charge_lep == 1) == SIZE(Charge_lep) || SUM(Charge_lep == -1) == SIZE(Charge_lep))"
        );
    }

    #[test]
    fn extreme_thresholds_keep_float_form() {
        let m = Mask::compare("Mass_All_OSSFPairs", CmpOp::Lt, Number::Float(1e20));
        assert_eq!(m.to_string(), "Mass_All_OSSFPairs < 1e20");
        let m = Mask::compare("Mass_All_OSSFPairs", CmpOp::Lt, Number::Float(3e9));
        assert_eq!(m.to_string(), "Mass_All_OSSFPairs < 3000000000.0");
        let m = Mask::compare("DeltaR_All_OSSFPairs", CmpOp::Gt, Number::Float(1e-7));
        assert_eq!(m.to_string(), "DeltaR_All_OSSFPairs > 1e-7");
        let veto = Mask::Veto { column: "Mass_A_OSSFPairs".into(), low: 0.5, high: 1e17 };
        assert_eq!(veto.to_string(), "!(Mass_A_OSSFPairs >= 0.5 && Mass_A_OSSFPairs <= 1e17)");
    }

    #[test]
    fn abs_compare() {
        let m = Mask::Compare { column: "PDGID_lep".into(), abs: true, op: CmpOp::Eq, value: Number::Int(13) };
        assert_eq!(m.to_string(), "abs(PDGID_lep) == 13");
    }
}
