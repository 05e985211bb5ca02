//! Dynamically typed per-row values and the typed views over them.

use std::fmt;

use crate::dtype::{DType, ScalarType};

/// One scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    /// `bool`
    Bool(bool),
    /// `i32`
    I32(i32),
    /// `u32`
    U32(u32),
    /// `i64`
    I64(i64),
    /// `u64`
    U64(u64),
    /// `f32`
    F32(f32),
    /// `f64`
    F64(f64),
}

impl Scalar {
    /// Type of this value.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Scalar::Bool(_) => ScalarType::Bool,
            Scalar::I32(_) => ScalarType::I32,
            Scalar::U32(_) => ScalarType::U32,
            Scalar::I64(_) => ScalarType::I64,
            Scalar::U64(_) => ScalarType::U64,
            Scalar::F32(_) => ScalarType::F32,
            Scalar::F64(_) => ScalarType::F64,
        }
    }

    /// Numeric value as `f64` (`true` is 1).
    pub fn as_f64(&self) -> f64 {
        match *self {
            Scalar::Bool(b) => f64::from(u8::from(b)),
            Scalar::I32(x) => f64::from(x),
            Scalar::U32(x) => f64::from(x),
            Scalar::I64(x) => x as f64,
            Scalar::U64(x) => x as f64,
            Scalar::F32(x) => f64::from(x),
            Scalar::F64(x) => x,
        }
    }

    /// Exact integer value for `bool` and integer types, `None` for floats.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Scalar::Bool(b) => Some(i128::from(b)),
            Scalar::I32(x) => Some(i128::from(x)),
            Scalar::U32(x) => Some(i128::from(x)),
            Scalar::I64(x) => Some(i128::from(x)),
            Scalar::U64(x) => Some(i128::from(x)),
            Scalar::F32(_) | Scalar::F64(_) => None,
        }
    }

    /// Non-zero test used by filters, `!`, `&&`, `||` and `?:`.
    pub fn truthy(&self) -> bool {
        match self.as_i128() {
            Some(n) => n != 0,
            None => self.as_f64() != 0.0,
        }
    }

    /// `false` only for NaN and infinite floats.
    pub fn is_finite(&self) -> bool {
        match *self {
            Scalar::F32(x) => x.is_finite(),
            Scalar::F64(x) => x.is_finite(),
            _ => true,
        }
    }

    /// C-style conversion to `ty`.
    pub fn cast(self, ty: ScalarType) -> Scalar {
        if self.scalar_type() == ty {
            return self;
        }
        match self.as_i128() {
            Some(n) => match ty {
                ScalarType::Bool => Scalar::Bool(n != 0),
                ScalarType::I32 => Scalar::I32(n as i32),
                ScalarType::U32 => Scalar::U32(n as u32),
                ScalarType::I64 => Scalar::I64(n as i64),
                ScalarType::U64 => Scalar::U64(n as u64),
                ScalarType::F32 => Scalar::F32(n as f32),
                ScalarType::F64 => Scalar::F64(n as f64),
            },
            None => {
                let x = self.as_f64();
                match ty {
                    ScalarType::Bool => Scalar::Bool(x != 0.0),
                    ScalarType::I32 => Scalar::I32(x as i32),
                    ScalarType::U32 => Scalar::U32(x as u32),
                    ScalarType::I64 => Scalar::I64(x as i64),
                    ScalarType::U64 => Scalar::U64(x as u64),
                    ScalarType::F32 => Scalar::F32(x as f32),
                    ScalarType::F64 => Scalar::F64(x),
                }
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::I32(x) => write!(f, "{x}"),
            Scalar::U32(x) => write!(f, "{x}"),
            Scalar::I64(x) => write!(f, "{x}"),
            Scalar::U64(x) => write!(f, "{x}"),
            Scalar::F32(x) => write!(f, "{x}"),
            Scalar::F64(x) => write!(f, "{x}"),
        }
    }
}

/// A typed variable-length sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Seq {
    /// `seq<bool>`
    Bool(Vec<bool>),
    /// `seq<i32>`
    I32(Vec<i32>),
    /// `seq<u32>`
    U32(Vec<u32>),
    /// `seq<i64>`
    I64(Vec<i64>),
    /// `seq<u64>`
    U64(Vec<u64>),
    /// `seq<f32>`
    F32(Vec<f32>),
    /// `seq<f64>`
    F64(Vec<f64>),
}

impl Seq {
    /// Empty sequence with room for `capacity` elements.
    pub fn with_capacity(ty: ScalarType, capacity: usize) -> Seq {
        match ty {
            ScalarType::Bool => Seq::Bool(Vec::with_capacity(capacity)),
            ScalarType::I32 => Seq::I32(Vec::with_capacity(capacity)),
            ScalarType::U32 => Seq::U32(Vec::with_capacity(capacity)),
            ScalarType::I64 => Seq::I64(Vec::with_capacity(capacity)),
            ScalarType::U64 => Seq::U64(Vec::with_capacity(capacity)),
            ScalarType::F32 => Seq::F32(Vec::with_capacity(capacity)),
            ScalarType::F64 => Seq::F64(Vec::with_capacity(capacity)),
        }
    }

    /// Build a sequence of element type `ty`, converting each item.
    pub fn from_scalars(ty: ScalarType, items: impl IntoIterator<Item = Scalar>) -> Seq {
        let items = items.into_iter();
        let mut seq = Seq::with_capacity(ty, items.size_hint().0);
        for s in items {
            seq.push(s);
        }
        seq
    }

    /// Element type.
    pub fn elem_type(&self) -> ScalarType {
        match self {
            Seq::Bool(_) => ScalarType::Bool,
            Seq::I32(_) => ScalarType::I32,
            Seq::U32(_) => ScalarType::U32,
            Seq::I64(_) => ScalarType::I64,
            Seq::U64(_) => ScalarType::U64,
            Seq::F32(_) => ScalarType::F32,
            Seq::F64(_) => ScalarType::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Seq::Bool(v) => v.len(),
            Seq::I32(v) => v.len(),
            Seq::U32(v) => v.len(),
            Seq::I64(v) => v.len(),
            Seq::U64(v) => v.len(),
            Seq::F32(v) => v.len(),
            Seq::F64(v) => v.len(),
        }
    }

    /// `true` when there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i`, if in range.
    pub fn get(&self, i: usize) -> Option<Scalar> {
        match self {
            Seq::Bool(v) => v.get(i).copied().map(Scalar::Bool),
            Seq::I32(v) => v.get(i).copied().map(Scalar::I32),
            Seq::U32(v) => v.get(i).copied().map(Scalar::U32),
            Seq::I64(v) => v.get(i).copied().map(Scalar::I64),
            Seq::U64(v) => v.get(i).copied().map(Scalar::U64),
            Seq::F32(v) => v.get(i).copied().map(Scalar::F32),
            Seq::F64(v) => v.get(i).copied().map(Scalar::F64),
        }
    }

    /// Append `s`, converted to the element type.
    pub fn push(&mut self, s: Scalar) {
        let s = s.cast(self.elem_type());
        match (self, s) {
            (Seq::Bool(v), Scalar::Bool(x)) => v.push(x),
            (Seq::I32(v), Scalar::I32(x)) => v.push(x),
            (Seq::U32(v), Scalar::U32(x)) => v.push(x),
            (Seq::I64(v), Scalar::I64(x)) => v.push(x),
            (Seq::U64(v), Scalar::U64(x)) => v.push(x),
            (Seq::F32(v), Scalar::F32(x)) => v.push(x),
            (Seq::F64(v), Scalar::F64(x)) => v.push(x),
            _ => unreachable!("cast yields the element type"),
        }
    }

    /// Iterate over the elements as [`Scalar`]s.
    pub fn iter(&self) -> SeqIter<'_> {
        SeqIter { seq: self, pos: 0 }
    }

    /// Copy of the elements in `start..end`.
    pub fn slice(&self, start: usize, end: usize) -> Seq {
        match self {
            Seq::Bool(v) => Seq::Bool(v[start..end].to_vec()),
            Seq::I32(v) => Seq::I32(v[start..end].to_vec()),
            Seq::U32(v) => Seq::U32(v[start..end].to_vec()),
            Seq::I64(v) => Seq::I64(v[start..end].to_vec()),
            Seq::U64(v) => Seq::U64(v[start..end].to_vec()),
            Seq::F32(v) => Seq::F32(v[start..end].to_vec()),
            Seq::F64(v) => Seq::F64(v[start..end].to_vec()),
        }
    }

    /// Typed view of the elements, when they are of type `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice_of(self)
    }
}

/// Iterator returned by [`Seq::iter`].
pub struct SeqIter<'a> {
    seq: &'a Seq,
    pos: usize,
}

impl Iterator for SeqIter<'_> {
    type Item = Scalar;

    fn next(&mut self) -> Option<Scalar> {
        let s = self.seq.get(self.pos)?;
        self.pos += 1;
        Some(s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.seq.len().saturating_sub(self.pos);
        (n, Some(n))
    }
}

/// A per-row value of any column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Scalar column value.
    Scalar(Scalar),
    /// Sequence column value.
    Seq(Seq),
    /// Index-pair list.
    Pairs(Vec<(usize, usize)>),
}

impl Value {
    /// Column type this value belongs to.
    pub fn dtype(&self) -> DType {
        match self {
            Value::Scalar(s) => DType::Scalar(s.scalar_type()),
            Value::Seq(s) => DType::Seq(s.elem_type()),
            Value::Pairs(_) => DType::Pairs,
        }
    }

    /// The scalar, if this is one.
    pub fn as_scalar(&self) -> Option<Scalar> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// The sequence, if this is one.
    pub fn as_seq(&self) -> Option<&Seq> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    /// The pair list, if this is one.
    pub fn as_pairs(&self) -> Option<&[(usize, usize)]> {
        match self {
            Value::Pairs(p) => Some(p),
            _ => None,
        }
    }
}

/// Rust element types that can live in a [`Seq`].
pub trait Element: Copy + Send + Sync + 'static {
    /// Matching runtime element type.
    const TYPE: ScalarType;
    /// Wrap as a [`Scalar`].
    fn into_scalar(self) -> Scalar;
    /// Unwrap a [`Scalar`] of exactly this type.
    fn from_scalar(s: Scalar) -> Option<Self>;
    /// Wrap a vector as a [`Seq`].
    fn into_seq(v: Vec<Self>) -> Seq;
    /// Borrow the elements of a [`Seq`] of exactly this type.
    fn slice_of(seq: &Seq) -> Option<&[Self]>;
}

/// Rust types a column can be materialized as.
///
/// `take::<T>` succeeds only when `T::DTYPE` equals the column's type; there
/// is no implicit conversion.
pub trait ColumnType: Sized + Send + 'static {
    /// Column type this Rust type stands for.
    const DTYPE: DType;
    /// Extract from a value of type `DTYPE`.
    fn from_value(value: &Value) -> Option<Self>;
    /// Wrap into a [`Value`].
    fn into_value(self) -> Value;
}

macro_rules! element_impls {
    ($($t:ty => $var:ident),* $(,)?) => {
        $(
            impl Element for $t {
                const TYPE: ScalarType = ScalarType::$var;

                fn into_scalar(self) -> Scalar {
                    Scalar::$var(self)
                }

                fn from_scalar(s: Scalar) -> Option<Self> {
                    match s {
                        Scalar::$var(x) => Some(x),
                        _ => None,
                    }
                }

                fn into_seq(v: Vec<Self>) -> Seq {
                    Seq::$var(v)
                }

                fn slice_of(seq: &Seq) -> Option<&[Self]> {
                    match seq {
                        Seq::$var(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl ColumnType for $t {
                const DTYPE: DType = DType::Scalar(ScalarType::$var);

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Scalar(Scalar::$var(x)) => Some(*x),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::Scalar(Scalar::$var(self))
                }
            }

            impl ColumnType for Vec<$t> {
                const DTYPE: DType = DType::Seq(ScalarType::$var);

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Seq(Seq::$var(v)) => Some(v.clone()),
                        _ => None,
                    }
                }

                fn into_value(self) -> Value {
                    Value::Seq(Seq::$var(self))
                }
            }
        )*
    };
}

element_impls!(bool => Bool, i32 => I32, u32 => U32, i64 => I64, u64 => U64, f32 => F32, f64 => F64);

impl ColumnType for Vec<(usize, usize)> {
    const DTYPE: DType = DType::Pairs;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_pairs().map(<[(usize, usize)]>::to_vec)
    }

    fn into_value(self) -> Value {
        Value::Pairs(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_are_c_like() {
        assert_eq!(Scalar::F64(2.9).cast(ScalarType::I32), Scalar::I32(2));
        assert_eq!(Scalar::I32(-1).cast(ScalarType::U32), Scalar::U32(u32::MAX));
        assert_eq!(Scalar::Bool(true).cast(ScalarType::F64), Scalar::F64(1.0));
        assert_eq!(Scalar::F32(0.0).cast(ScalarType::Bool), Scalar::Bool(false));
    }

    #[test]
    fn push_converts_to_element_type() {
        let seq = Seq::from_scalars(ScalarType::F64, [Scalar::I32(3), Scalar::Bool(true)]);
        assert_eq!(seq, Seq::F64(vec![3.0, 1.0]));
        assert_eq!(seq.iter().count(), 2);
    }

    #[test]
    fn column_type_is_exact() {
        let v = Value::Scalar(Scalar::F32(1.5));
        assert_eq!(f32::from_value(&v), Some(1.5));
        assert_eq!(f64::from_value(&v), None);
        assert_eq!(<Vec<f64>>::DTYPE, DType::SEQ_F64);
    }
}
