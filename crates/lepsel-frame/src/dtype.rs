//! Runtime column types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Element type of a scalar column or of a sequence column's items.
///
/// Variants are declared in promotion rank order, so `Ord` gives the C-like
/// usual arithmetic conversion: `bool < i32 < u32 < i64 < u64 < f32 < f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarType {
    /// `bool`
    Bool,
    /// `i32`
    I32,
    /// `u32`
    U32,
    /// `i64`
    I64,
    /// `u64`
    U64,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl ScalarType {
    /// `true` for `f32`/`f64`.
    pub fn is_float(self) -> bool {
        matches!(self, ScalarType::F32 | ScalarType::F64)
    }

    /// `true` for the integer types (not `bool`).
    pub fn is_integer(self) -> bool {
        matches!(self, ScalarType::I32 | ScalarType::U32 | ScalarType::I64 | ScalarType::U64)
    }

    /// Result type of a binary arithmetic operation: the higher rank of the
    /// two operands, never below `i32` (integral promotion).
    pub fn promote(self, other: ScalarType) -> ScalarType {
        self.max(other).max(ScalarType::I32)
    }

    /// Result type of a floating-point math function (`sqrt`, `log`, ...).
    pub fn float_result(self) -> ScalarType {
        if self == ScalarType::F32 { ScalarType::F32 } else { ScalarType::F64 }
    }

    /// Short name (`f64`, `i32`, ...).
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::I64 => "i64",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
        }
    }
}

impl FromStr for ScalarType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, FrameError> {
        match s.trim() {
            "bool" => Ok(ScalarType::Bool),
            "i32" | "int" => Ok(ScalarType::I32),
            "u32" | "uint" => Ok(ScalarType::U32),
            "i64" | "long" => Ok(ScalarType::I64),
            "u64" | "ulong" => Ok(ScalarType::U64),
            "f32" | "float" => Ok(ScalarType::F32),
            "f64" | "double" => Ok(ScalarType::F64),
            other => Err(FrameError::InvalidInput(format!("unknown scalar type '{other}'"))),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type of a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DType {
    /// One value per row.
    Scalar(ScalarType),
    /// A variable-length sequence per row.
    Seq(ScalarType),
    /// A list of index pairs per row.
    Pairs,
}

impl DType {
    /// `seq<f64>`
    pub const SEQ_F64: DType = DType::Seq(ScalarType::F64);
    /// `seq<i32>`
    pub const SEQ_I32: DType = DType::Seq(ScalarType::I32);
    /// `f64`
    pub const F64: DType = DType::Scalar(ScalarType::F64);

    /// Element type for scalars and sequences.
    pub fn element(self) -> Option<ScalarType> {
        match self {
            DType::Scalar(t) | DType::Seq(t) => Some(t),
            DType::Pairs => None,
        }
    }

    /// `true` for scalar columns.
    pub fn is_scalar(self) -> bool {
        matches!(self, DType::Scalar(_))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Scalar(t) => write!(f, "{t}"),
            DType::Seq(t) => write!(f, "seq<{t}>"),
            DType::Pairs => f.write_str("pairs"),
        }
    }
}

impl FromStr for DType {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, FrameError> {
        let s = s.trim();
        if s == "pairs" {
            return Ok(DType::Pairs);
        }
        if let Some(inner) = s.strip_prefix("seq<").and_then(|r| r.strip_suffix('>')) {
            return Ok(DType::Seq(inner.parse()?));
        }
        Ok(DType::Scalar(s.parse()?))
    }
}

impl TryFrom<String> for DType {
    type Error = FrameError;

    fn try_from(s: String) -> Result<Self, FrameError> {
        s.parse()
    }
}

impl From<DType> for String {
    fn from(d: DType) -> Self {
        d.to_string()
    }
}
