//! Type checking and per-row evaluation of parsed expressions.
//!
//! Binding annotates every syntax node with its column type, so evaluation
//! never has to guess: integer arithmetic stays integral (wrapping, division
//! truncates), mixed operands are promoted C-style, and scalars broadcast
//! over sequences.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::f64::consts::{PI, TAU};

use crate::dtype::{DType, ScalarType};
use crate::expr::{ArithOp, BinOp, CmpOp, Expr, Func};
use crate::value::{Scalar, Seq, Value};

/// Row evaluation outcome; errors are plain messages that the node wraps
/// with the column name and row index.
pub type EvalResult<T> = std::result::Result<T, String>;

#[derive(Debug, Clone)]
struct Typed {
    dtype: DType,
    op: Op,
}

#[derive(Debug, Clone)]
enum Op {
    Literal(Scalar),
    Column(usize),
    Neg(Box<Typed>),
    Not(Box<Typed>),
    Arith(ArithOp, Box<Typed>, Box<Typed>),
    Cmp(CmpOp, Box<Typed>, Box<Typed>),
    And(Box<Typed>, Box<Typed>),
    Or(Box<Typed>, Box<Typed>),
    Ternary(Box<Typed>, Box<Typed>, Box<Typed>),
    Index(Box<Typed>, Box<Typed>),
    Mask(Box<Typed>, Box<Typed>),
    Call(Func, Vec<Typed>),
}

/// An expression type-checked against concrete input column types.
#[derive(Debug, Clone)]
pub struct BoundExpr {
    root: Typed,
}

impl BoundExpr {
    /// Result type.
    pub fn dtype(&self) -> DType {
        self.root.dtype
    }

    /// Evaluate for one row. `inputs` follow `required_columns` order.
    pub fn eval(&self, inputs: &[&Value]) -> EvalResult<Value> {
        eval(&self.root, inputs).map(Cow::into_owned)
    }
}

/// Azimuthal difference `phi2 - phi1` wrapped into `(-π, π]`.
pub fn delta_phi(phi1: f64, phi2: f64) -> f64 {
    let d = (phi2 - phi1) % TAU;
    if d > PI {
        d - TAU
    } else if d <= -PI {
        d + TAU
    } else {
        d
    }
}

// ── Binding ────────────────────────────────────────────────────

pub(crate) fn bind(e: &Expr, inputs: &[DType]) -> EvalResult<BoundExpr> {
    Ok(BoundExpr { root: bind_node(e, inputs)? })
}

fn typed(dtype: DType, op: Op) -> EvalResult<Typed> {
    Ok(Typed { dtype, op })
}

fn numeric(d: DType, what: &str) -> EvalResult<ScalarType> {
    d.element().ok_or_else(|| format!("{what} does not apply to pair lists"))
}

fn seq_elem(d: DType, what: &str) -> EvalResult<ScalarType> {
    match d {
        DType::Seq(t) => Ok(t),
        other => Err(format!("{what}() expects a sequence, got {other}")),
    }
}

fn integer_scalar(d: DType, what: &str) -> EvalResult<()> {
    match d {
        DType::Scalar(t) if !t.is_float() => Ok(()),
        other => Err(format!("{what} needs an integer index, got {other}")),
    }
}

fn numeric_scalar(d: DType, what: &str) -> EvalResult<()> {
    match d {
        DType::Scalar(_) => Ok(()),
        other => Err(format!("{what} default must be a scalar, got {other}")),
    }
}

fn with_elem(d: DType, t: ScalarType) -> DType {
    match d {
        DType::Seq(_) => DType::Seq(t),
        _ => DType::Scalar(t),
    }
}

fn broadcast(a: DType, b: DType, t: ScalarType) -> DType {
    if matches!(a, DType::Seq(_)) || matches!(b, DType::Seq(_)) {
        DType::Seq(t)
    } else {
        DType::Scalar(t)
    }
}

fn unify(p: ScalarType, q: ScalarType) -> ScalarType {
    if p == q { p } else { p.promote(q) }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Arith(ArithOp::Add) => "'+'",
        BinOp::Arith(ArithOp::Sub) => "'-'",
        BinOp::Arith(ArithOp::Mul) => "'*'",
        BinOp::Arith(ArithOp::Div) => "'/'",
        BinOp::Arith(ArithOp::Rem) => "'%'",
        BinOp::Cmp(_) => "comparison",
        BinOp::And => "'&&'",
        BinOp::Or => "'||'",
    }
}

fn bind_node(e: &Expr, inputs: &[DType]) -> EvalResult<Typed> {
    match e {
        Expr::Literal(s) => typed(DType::Scalar(s.scalar_type()), Op::Literal(*s)),
        Expr::Column(i) => {
            let d = inputs.get(*i).copied().ok_or_else(|| format!("no type for input {i}"))?;
            typed(d, Op::Column(*i))
        }
        Expr::Neg(a) => {
            let a = bind_node(a, inputs)?;
            let t = numeric(a.dtype, "unary '-'")?;
            typed(with_elem(a.dtype, t.promote(t)), Op::Neg(Box::new(a)))
        }
        Expr::Not(a) => {
            let a = bind_node(a, inputs)?;
            numeric(a.dtype, "'!'")?;
            typed(with_elem(a.dtype, ScalarType::Bool), Op::Not(Box::new(a)))
        }
        Expr::Binary(op, a, b) => {
            let a = bind_node(a, inputs)?;
            let b = bind_node(b, inputs)?;
            let what = op_symbol(*op);
            let ta = numeric(a.dtype, what)?;
            let tb = numeric(b.dtype, what)?;
            let bool_shape = broadcast(a.dtype, b.dtype, ScalarType::Bool);
            match *op {
                BinOp::Arith(ArithOp::Rem) if ta.is_float() || tb.is_float() => {
                    Err(format!("'%' needs integer operands, got {} and {}", a.dtype, b.dtype))
                }
                BinOp::Arith(op) => typed(
                    broadcast(a.dtype, b.dtype, ta.promote(tb)),
                    Op::Arith(op, Box::new(a), Box::new(b)),
                ),
                BinOp::Cmp(op) => typed(bool_shape, Op::Cmp(op, Box::new(a), Box::new(b))),
                BinOp::And => typed(bool_shape, Op::And(Box::new(a), Box::new(b))),
                BinOp::Or => typed(bool_shape, Op::Or(Box::new(a), Box::new(b))),
            }
        }
        Expr::Ternary(c, x, y) => {
            let c = bind_node(c, inputs)?;
            if !c.dtype.is_scalar() {
                return Err(format!("ternary condition must be a scalar, got {}", c.dtype));
            }
            let x = bind_node(x, inputs)?;
            let y = bind_node(y, inputs)?;
            let dtype = match (x.dtype, y.dtype) {
                (DType::Pairs, DType::Pairs) => DType::Pairs,
                (DType::Scalar(p), DType::Scalar(q)) => DType::Scalar(unify(p, q)),
                (DType::Seq(p), DType::Seq(q)) => DType::Seq(unify(p, q)),
                (p, q) => return Err(format!("ternary branches have incompatible types {p} and {q}")),
            };
            typed(dtype, Op::Ternary(Box::new(c), Box::new(x), Box::new(y)))
        }
        Expr::Index(v, i) => {
            let v = bind_node(v, inputs)?;
            let i = bind_node(i, inputs)?;
            let t = seq_elem(v.dtype, "operator[]")?;
            match i.dtype {
                DType::Seq(ScalarType::Bool) => typed(DType::Seq(t), Op::Mask(Box::new(v), Box::new(i))),
                d => {
                    integer_scalar(d, "operator[]")?;
                    typed(DType::Scalar(t), Op::Index(Box::new(v), Box::new(i)))
                }
            }
        }
        Expr::Call(f, args) => {
            let args = args.iter().map(|a| bind_node(a, inputs)).collect::<EvalResult<Vec<_>>>()?;
            let dtype = call_type(*f, &args)?;
            typed(dtype, Op::Call(*f, args))
        }
    }
}

fn call_type(f: Func, args: &[Typed]) -> EvalResult<DType> {
    let name = f.name();
    let d = |k: usize| args[k].dtype;
    let dtype = match f {
        Func::Abs => {
            let t = numeric(d(0), name)?;
            with_elem(d(0), if t.is_float() { t } else { t.promote(t) })
        }
        Func::Sqrt | Func::Log | Func::Exp => with_elem(d(0), numeric(d(0), name)?.float_result()),
        Func::Pow => {
            let t = numeric(d(0), name)?.promote(numeric(d(1), name)?);
            broadcast(d(0), d(1), t.float_result())
        }
        Func::Min | Func::Max => {
            broadcast(d(0), d(1), numeric(d(0), name)?.promote(numeric(d(1), name)?))
        }
        Func::Sum => {
            let t = seq_elem(d(0), name)?;
            DType::Scalar(t.promote(t))
        }
        Func::SeqMax | Func::SeqMin | Func::Front | Func::Back => {
            DType::Scalar(seq_elem(d(0), name)?)
        }
        Func::Mean | Func::StdDev => {
            seq_elem(d(0), name)?;
            DType::F64
        }
        Func::Size | Func::Empty => {
            if d(0).is_scalar() {
                return Err(format!("{name}() expects a sequence or pair list, got {}", d(0)));
            }
            DType::Scalar(if f == Func::Size { ScalarType::U64 } else { ScalarType::Bool })
        }
        Func::Any | Func::All => {
            seq_elem(d(0), name)?;
            DType::Scalar(ScalarType::Bool)
        }
        Func::Sort | Func::Reverse => DType::Seq(seq_elem(d(0), name)?),
        Func::DeltaPhi => {
            numeric(d(0), name)?;
            numeric(d(1), name)?;
            broadcast(d(0), d(1), ScalarType::F64)
        }
        Func::SafeDiv => {
            numeric(d(0), name)?;
            numeric(d(1), name)?;
            if args.len() == 3 {
                numeric_scalar(d(2), name)?;
            }
            broadcast(d(0), d(1), ScalarType::F64)
        }
        Func::SafeIndex => {
            let t = seq_elem(d(0), name)?;
            integer_scalar(d(1), name)?;
            if args.len() == 3 {
                numeric_scalar(d(2), name)?;
            }
            DType::Scalar(t)
        }
    };
    Ok(dtype)
}

// ── Evaluation ─────────────────────────────────────────────────

fn scalar(v: &Value) -> EvalResult<Scalar> {
    v.as_scalar().ok_or_else(|| format!("expected a scalar, got {}", v.dtype()))
}

fn seq(v: &Value) -> EvalResult<&Seq> {
    v.as_seq().ok_or_else(|| format!("expected a sequence, got {}", v.dtype()))
}

fn eval<'a>(t: &Typed, inputs: &[&'a Value]) -> EvalResult<Cow<'a, Value>> {
    let out = t.dtype.element().unwrap_or(ScalarType::F64);
    let v = match &t.op {
        Op::Literal(s) => Value::Scalar(*s),
        Op::Column(i) => {
            return inputs.get(*i).map(|v| Cow::Borrowed(*v)).ok_or_else(|| format!("missing input {i}"));
        }
        Op::Neg(a) => map_unary(eval(a, inputs)?.as_ref(), out, |s| negate(s.cast(out)))?,
        Op::Not(a) => map_unary(eval(a, inputs)?.as_ref(), out, |s| Scalar::Bool(!s.truthy()))?,
        Op::Arith(op, a, b) => {
            let (x, y) = (eval(a, inputs)?, eval(b, inputs)?);
            zip(&x, &y, out, |p, q| arith(*op, p.cast(out), q.cast(out)))?
        }
        Op::Cmp(op, a, b) => {
            let (x, y) = (eval(a, inputs)?, eval(b, inputs)?);
            zip(&x, &y, out, |p, q| Ok(Scalar::Bool(compare(*op, p, q))))?
        }
        Op::And(a, b) | Op::Or(a, b) => {
            let is_and = matches!(t.op, Op::And(..));
            let x = eval(a, inputs)?;
            if t.dtype.is_scalar() {
                // Short-circuit, so `n > 0 && v[0] > 1` is safe on empty rows.
                let lhs = scalar(&x)?.truthy();
                let result = if lhs != is_and { lhs } else { scalar(eval(b, inputs)?.as_ref())?.truthy() };
                Value::Scalar(Scalar::Bool(result))
            } else {
                let y = eval(b, inputs)?;
                zip(&x, &y, out, |p, q| {
                    let r = if is_and { p.truthy() && q.truthy() } else { p.truthy() || q.truthy() };
                    Ok(Scalar::Bool(r))
                })?
            }
        }
        Op::Ternary(c, x, y) => {
            let branch = if scalar(eval(c, inputs)?.as_ref())?.truthy() { x } else { y };
            let v = eval(branch, inputs)?;
            if v.dtype() == t.dtype {
                return Ok(v);
            }
            match v.as_ref() {
                Value::Scalar(s) => Value::Scalar(s.cast(out)),
                Value::Seq(s) => Value::Seq(Seq::from_scalars(out, s.iter())),
                Value::Pairs(p) => Value::Pairs(p.clone()),
            }
        }
        Op::Index(v, i) => {
            let v = eval(v, inputs)?;
            let items = seq(&v)?;
            let idx = scalar(eval(i, inputs)?.as_ref())?.as_i128().ok_or("index must be an integer")?;
            let s = usize::try_from(idx).ok().and_then(|k| items.get(k)).ok_or_else(|| {
                format!("index {idx} out of range for sequence of length {}", items.len())
            })?;
            Value::Scalar(s)
        }
        Op::Mask(v, m) => {
            let v = eval(v, inputs)?;
            let m = eval(m, inputs)?;
            let (items, mask) = (seq(&v)?, seq(&m)?);
            if items.len() != mask.len() {
                return Err(format!(
                    "mask of length {} applied to sequence of length {}",
                    mask.len(),
                    items.len()
                ));
            }
            let kept = items.iter().zip(mask.iter()).filter(|(_, keep)| keep.truthy()).map(|(s, _)| s);
            Value::Seq(Seq::from_scalars(out, kept))
        }
        Op::Call(f, args) => {
            let vals = args.iter().map(|a| eval(a, inputs)).collect::<EvalResult<Vec<_>>>()?;
            call(*f, &vals, out)?
        }
    };
    Ok(Cow::Owned(v))
}

fn call(f: Func, vals: &[Cow<'_, Value>], out: ScalarType) -> EvalResult<Value> {
    let arg = |k: usize| vals[k].as_ref();
    let float = |g: fn(f64) -> f64| move |s: Scalar| Scalar::F64(g(s.as_f64())).cast(out);
    let v = match f {
        Func::Abs => map_unary(arg(0), out, |s| abs(s.cast(out)))?,
        Func::Sqrt => map_unary(arg(0), out, float(f64::sqrt))?,
        Func::Log => map_unary(arg(0), out, float(f64::ln))?,
        Func::Exp => map_unary(arg(0), out, float(f64::exp))?,
        Func::Pow => zip(arg(0), arg(1), out, |p, q| {
            Ok(Scalar::F64(p.as_f64().powf(q.as_f64())).cast(out))
        })?,
        Func::Min | Func::Max => zip(arg(0), arg(1), out, |p, q| {
            let (p, q) = (p.cast(out), q.cast(out));
            // std::min / std::max: (b < a) ? b : a and (a < b) ? b : a
            let take_q = if f == Func::Min { compare(CmpOp::Lt, q, p) } else { compare(CmpOp::Lt, p, q) };
            Ok(if take_q { q } else { p })
        })?,
        Func::Sum => {
            let mut acc = Scalar::I32(0).cast(out);
            for s in seq(arg(0))?.iter() {
                acc = arith(ArithOp::Add, acc, s.cast(out))?;
            }
            Value::Scalar(acc)
        }
        Func::SeqMax | Func::SeqMin => {
            let items = seq(arg(0))?;
            let mut it = items.iter();
            let first = it.next().ok_or_else(|| format!("{}() of an empty sequence", f.name()))?;
            let best = it.fold(first, |best, s| {
                let better =
                    if f == Func::SeqMax { compare(CmpOp::Gt, s, best) } else { compare(CmpOp::Lt, s, best) };
                if better { s } else { best }
            });
            Value::Scalar(best)
        }
        Func::Front | Func::Back => {
            let items = seq(arg(0))?;
            let s = if f == Func::Front { items.get(0) } else { items.len().checked_sub(1).and_then(|k| items.get(k)) };
            Value::Scalar(s.ok_or_else(|| format!("{}() of an empty sequence", f.name()))?)
        }
        Func::Mean => {
            let items = seq(arg(0))?;
            let n = items.len();
            let mean = if n == 0 { 0.0 } else { items.iter().map(|s| s.as_f64()).sum::<f64>() / n as f64 };
            Value::Scalar(Scalar::F64(mean))
        }
        Func::StdDev => {
            let items = seq(arg(0))?;
            let n = items.len();
            let sd = if n < 2 {
                0.0
            } else {
                let mean = items.iter().map(|s| s.as_f64()).sum::<f64>() / n as f64;
                let ss: f64 = items.iter().map(|s| (s.as_f64() - mean).powi(2)).sum();
                (ss / (n - 1) as f64).sqrt()
            };
            Value::Scalar(Scalar::F64(sd))
        }
        Func::Size | Func::Empty => {
            let n = match arg(0) {
                Value::Seq(s) => s.len(),
                Value::Pairs(p) => p.len(),
                Value::Scalar(_) => return Err(format!("{}() of a scalar", f.name())),
            };
            Value::Scalar(if f == Func::Size { Scalar::U64(n as u64) } else { Scalar::Bool(n == 0) })
        }
        Func::Any => Value::Scalar(Scalar::Bool(seq(arg(0))?.iter().any(|s| s.truthy()))),
        Func::All => Value::Scalar(Scalar::Bool(seq(arg(0))?.iter().all(|s| s.truthy()))),
        Func::Sort => {
            let mut items: Vec<Scalar> = seq(arg(0))?.iter().collect();
            items.sort_by(|p, q| total_cmp(*p, *q));
            Value::Seq(Seq::from_scalars(out, items))
        }
        Func::Reverse => {
            let items: Vec<Scalar> = seq(arg(0))?.iter().collect();
            Value::Seq(Seq::from_scalars(out, items.into_iter().rev()))
        }
        Func::DeltaPhi => zip(arg(0), arg(1), out, |p, q| {
            Ok(Scalar::F64(delta_phi(p.as_f64(), q.as_f64())))
        })?,
        Func::SafeDiv => {
            let def = match vals.get(2) {
                Some(v) => scalar(v)?.as_f64(),
                None => 0.0,
            };
            zip(arg(0), arg(1), out, |n, d| {
                let d = d.as_f64();
                Ok(Scalar::F64(if d != 0.0 { n.as_f64() / d } else { def }))
            })?
        }
        Func::SafeIndex => {
            let items = seq(arg(0))?;
            let idx = scalar(arg(1))?.as_i128().ok_or("index must be an integer")?;
            let def = match vals.get(2) {
                Some(v) => scalar(v)?,
                None => Scalar::I32(-1),
            };
            let s = usize::try_from(idx).ok().and_then(|k| items.get(k)).unwrap_or(def);
            Value::Scalar(s.cast(out))
        }
    };
    Ok(v)
}

fn map_unary(v: &Value, out: ScalarType, f: impl Fn(Scalar) -> Scalar) -> EvalResult<Value> {
    match v {
        Value::Scalar(s) => Ok(Value::Scalar(f(*s).cast(out))),
        Value::Seq(items) => Ok(Value::Seq(Seq::from_scalars(out, items.iter().map(f)))),
        Value::Pairs(_) => Err("pair lists have no elementwise operations".into()),
    }
}

fn zip(
    a: &Value,
    b: &Value,
    out: ScalarType,
    f: impl Fn(Scalar, Scalar) -> EvalResult<Scalar>,
) -> EvalResult<Value> {
    let v = match (a, b) {
        (Value::Scalar(x), Value::Scalar(y)) => Value::Scalar(f(*x, *y)?.cast(out)),
        (Value::Seq(xs), Value::Scalar(y)) => {
            let items = xs.iter().map(|x| f(x, *y)).collect::<EvalResult<Vec<_>>>()?;
            Value::Seq(Seq::from_scalars(out, items))
        }
        (Value::Scalar(x), Value::Seq(ys)) => {
            let items = ys.iter().map(|y| f(*x, y)).collect::<EvalResult<Vec<_>>>()?;
            Value::Seq(Seq::from_scalars(out, items))
        }
        (Value::Seq(xs), Value::Seq(ys)) => {
            if xs.len() != ys.len() {
                return Err(format!("sequence length mismatch: {} vs {}", xs.len(), ys.len()));
            }
            let items = xs.iter().zip(ys.iter()).map(|(x, y)| f(x, y)).collect::<EvalResult<Vec<_>>>()?;
            Value::Seq(Seq::from_scalars(out, items))
        }
        _ => return Err("pair lists have no elementwise operations".into()),
    };
    Ok(v)
}

fn arith(op: ArithOp, p: Scalar, q: Scalar) -> EvalResult<Scalar> {
    macro_rules! int {
        ($var:ident, $x:expr, $y:expr) => {
            Scalar::$var(match op {
                ArithOp::Add => $x.wrapping_add($y),
                ArithOp::Sub => $x.wrapping_sub($y),
                ArithOp::Mul => $x.wrapping_mul($y),
                ArithOp::Div => $x.checked_div($y).ok_or("invalid integer division")?,
                ArithOp::Rem => $x.checked_rem($y).ok_or("invalid integer remainder")?,
            })
        };
    }
    macro_rules! float {
        ($var:ident, $x:expr, $y:expr) => {
            Scalar::$var(match op {
                ArithOp::Add => $x + $y,
                ArithOp::Sub => $x - $y,
                ArithOp::Mul => $x * $y,
                ArithOp::Div => $x / $y,
                ArithOp::Rem => $x % $y,
            })
        };
    }
    let r = match (p, q) {
        (Scalar::I32(x), Scalar::I32(y)) => int!(I32, x, y),
        (Scalar::U32(x), Scalar::U32(y)) => int!(U32, x, y),
        (Scalar::I64(x), Scalar::I64(y)) => int!(I64, x, y),
        (Scalar::U64(x), Scalar::U64(y)) => int!(U64, x, y),
        (Scalar::F32(x), Scalar::F32(y)) => float!(F32, x, y),
        (Scalar::F64(x), Scalar::F64(y)) => float!(F64, x, y),
        _ => {
            return Err(format!(
                "mismatched operands {} and {}",
                p.scalar_type(),
                q.scalar_type()
            ));
        }
    };
    Ok(r)
}

fn negate(s: Scalar) -> Scalar {
    match s {
        Scalar::Bool(b) => Scalar::I32(-i32::from(b)),
        Scalar::I32(x) => Scalar::I32(x.wrapping_neg()),
        Scalar::U32(x) => Scalar::U32(x.wrapping_neg()),
        Scalar::I64(x) => Scalar::I64(x.wrapping_neg()),
        Scalar::U64(x) => Scalar::U64(x.wrapping_neg()),
        Scalar::F32(x) => Scalar::F32(-x),
        Scalar::F64(x) => Scalar::F64(-x),
    }
}

fn abs(s: Scalar) -> Scalar {
    match s {
        Scalar::Bool(b) => Scalar::I32(i32::from(b)),
        Scalar::I32(x) => Scalar::I32(x.wrapping_abs()),
        Scalar::I64(x) => Scalar::I64(x.wrapping_abs()),
        Scalar::F32(x) => Scalar::F32(x.abs()),
        Scalar::F64(x) => Scalar::F64(x.abs()),
        unsigned => unsigned,
    }
}

fn ordering(p: Scalar, q: Scalar) -> Option<Ordering> {
    match (p.as_i128(), q.as_i128()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => p.as_f64().partial_cmp(&q.as_f64()),
    }
}

fn compare(op: CmpOp, p: Scalar, q: Scalar) -> bool {
    let Some(o) = ordering(p, q) else {
        return op == CmpOp::Ne;
    };
    match op {
        CmpOp::Eq => o == Ordering::Equal,
        CmpOp::Ne => o != Ordering::Equal,
        CmpOp::Lt => o == Ordering::Less,
        CmpOp::Le => o != Ordering::Greater,
        CmpOp::Gt => o == Ordering::Greater,
        CmpOp::Ge => o != Ordering::Less,
    }
}

fn total_cmp(p: Scalar, q: Scalar) -> Ordering {
    match (p.as_i128(), q.as_i128()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => p.as_f64().total_cmp(&q.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::CompiledExpr;
    use approx::assert_relative_eq;

    fn run(src: &str, inputs: &[Value]) -> EvalResult<Value> {
        let e = CompiledExpr::compile(src).unwrap();
        let types: Vec<DType> = inputs.iter().map(Value::dtype).collect();
        let bound = e.bind(&types).unwrap();
        let refs: Vec<&Value> = inputs.iter().collect();
        let v = bound.eval(&refs)?;
        assert_eq!(v.dtype(), bound.dtype(), "{src}");
        Ok(v)
    }

    fn f64s(v: &[f64]) -> Value {
        Value::Seq(Seq::F64(v.to_vec()))
    }

    fn i32s(v: &[i32]) -> Value {
        Value::Seq(Seq::I32(v.to_vec()))
    }

    #[test]
    fn c_like_arithmetic() {
        assert_eq!(run("7 / 2", &[]).unwrap(), Value::Scalar(Scalar::I32(3)));
        assert_eq!(run("7 / 2.0", &[]).unwrap(), Value::Scalar(Scalar::F64(3.5)));
        assert_eq!(run("-7 % 3", &[]).unwrap(), Value::Scalar(Scalar::I32(-1)));
        assert_eq!(run("true + true", &[]).unwrap(), Value::Scalar(Scalar::I32(2)));
        assert!(run("1 / 0", &[]).unwrap_err().contains("division"));
    }

    #[test]
    fn elementwise_with_broadcast() {
        let pt = f64s(&[10.0, 30.0, 50.0]);
        assert_eq!(
            run("PT_lep > 20", &[pt.clone()]).unwrap(),
            Value::Seq(Seq::Bool(vec![false, true, true]))
        );
        assert_eq!(run("2 * PT_lep", &[pt]).unwrap(), f64s(&[20.0, 60.0, 100.0]));
        assert!(run("a + b", &[f64s(&[1.0]), f64s(&[1.0, 2.0])]).is_err());
    }

    #[test]
    fn sum_of_mask_counts() {
        let q = i32s(&[0, 2, 0, 1]);
        assert_eq!(run("Sum(Quality_lep == 0)", &[q.clone()]).unwrap(), Value::Scalar(Scalar::I32(2)));
        assert_eq!(run("Sum(Quality_lep)", &[q]).unwrap(), Value::Scalar(Scalar::I32(3)));
        assert_eq!(run("Sum(x)", &[f64s(&[])]).unwrap(), Value::Scalar(Scalar::F64(0.0)));
    }

    #[test]
    fn indexing_and_masks() {
        let v = f64s(&[5.0, 25.0, 15.0]);
        assert_eq!(run("v[1]", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(25.0)));
        assert_eq!(run("v[v > 10]", &[v.clone()]).unwrap(), f64s(&[25.0, 15.0]));
        assert!(run("v[3]", &[v.clone()]).unwrap_err().contains("out of range"));
        assert_eq!(run("SafeIndex(v, 3)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(-1.0)));
        assert_eq!(run("SafeIndex(v, -1, 0)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(0.0)));
        assert_eq!(run("SafeIndex(v, 2)", &[v]).unwrap(), Value::Scalar(Scalar::F64(15.0)));
    }

    #[test]
    fn scalar_logic_short_circuits() {
        let n = Value::Scalar(Scalar::U64(0));
        let empty = f64s(&[]);
        assert_eq!(
            run("n > 0 && v[0] > 1", &[n, empty.clone()]).unwrap(),
            Value::Scalar(Scalar::Bool(false))
        );
        assert_eq!(run("Empty(v) || v[0] > 1", &[empty]).unwrap(), Value::Scalar(Scalar::Bool(true)));
    }

    #[test]
    fn ternary_promotes_branches() {
        let n = Value::Scalar(Scalar::I32(0));
        assert_eq!(run("n > 0 ? 1 : 2.5", &[n]).unwrap(), Value::Scalar(Scalar::F64(2.5)));
    }

    #[test]
    fn unary_operators_on_columns() {
        let v = f64s(&[5.0, -25.0]);
        assert_eq!(run("-v", &[v.clone()]).unwrap(), f64s(&[-5.0, 25.0]));
        assert_eq!(run("!(v > 0)", &[v]).unwrap(), Value::Seq(Seq::Bool(vec![false, true])));
        let n = Value::Scalar(Scalar::I32(3));
        assert_eq!(run("-n", &[n.clone()]).unwrap(), Value::Scalar(Scalar::I32(-3)));
        assert_eq!(run("!n", &[n]).unwrap(), Value::Scalar(Scalar::Bool(false)));
    }

    #[test]
    fn sequence_functions() {
        let v = f64s(&[3.0, -1.0, 2.0]);
        assert_eq!(run("Max(v)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(3.0)));
        assert_eq!(run("Min(v)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(-1.0)));
        assert_eq!(run("Sort(v)", &[v.clone()]).unwrap(), f64s(&[-1.0, 2.0, 3.0]));
        assert_eq!(run("Reverse(v)", &[v.clone()]).unwrap(), f64s(&[2.0, -1.0, 3.0]));
        assert_eq!(run("Size(v)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::U64(3)));
        assert_eq!(run("Front(v) + Back(v)", &[v.clone()]).unwrap(), Value::Scalar(Scalar::F64(5.0)));
        match run("StdDev(v)", &[v.clone()]).unwrap() {
            Value::Scalar(Scalar::F64(x)) => assert_relative_eq!(x, (13.0f64 / 3.0).sqrt(), epsilon = 1e-12),
            other => panic!("unexpected {other:?}"),
        }
        assert!(run("Max(v)", &[f64s(&[])]).unwrap_err().contains("empty"));
        assert_eq!(run("Mean(v)", &[f64s(&[])]).unwrap(), Value::Scalar(Scalar::F64(0.0)));
    }

    #[test]
    fn safe_div() {
        let d = Value::Scalar(Scalar::F64(0.0));
        assert_eq!(run("SafeDiv(1, d)", &[d.clone()]).unwrap(), Value::Scalar(Scalar::F64(0.0)));
        assert_eq!(run("SafeDiv(1, d, -9)", &[d]).unwrap(), Value::Scalar(Scalar::F64(-9.0)));
        assert_eq!(run("SafeDiv(3, 2)", &[]).unwrap(), Value::Scalar(Scalar::F64(1.5)));
    }

    #[test]
    fn delta_phi_wraps() {
        assert_relative_eq!(delta_phi(3.0, -3.0), 2.0 * PI - 6.0, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(0.0, PI), PI, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(PI, 0.0), PI, epsilon = 1e-12);
        assert_relative_eq!(delta_phi(0.5, 0.5 + TAU), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn nan_comparisons() {
        let x = Value::Scalar(Scalar::F64(f64::NAN));
        assert_eq!(run("x == x", &[x.clone()]).unwrap(), Value::Scalar(Scalar::Bool(false)));
        assert_eq!(run("x != x", &[x]).unwrap(), Value::Scalar(Scalar::Bool(true)));
    }

    #[test]
    fn bind_errors() {
        let bind = |src: &str, types: &[DType]| CompiledExpr::compile(src).unwrap().bind(types);
        assert!(bind("x % 2", &[DType::F64]).is_err());
        assert!(bind("Sum(x)", &[DType::F64]).is_err());
        assert!(bind("c ? v : 1", &[DType::Scalar(ScalarType::Bool), DType::SEQ_F64]).is_err());
        assert!(bind("v[0.5]", &[DType::SEQ_F64]).is_err());
        assert!(bind("p + 1", &[DType::Pairs]).is_err());
        assert_eq!(bind("Size(p)", &[DType::Pairs]).unwrap().dtype(), DType::Scalar(ScalarType::U64));
    }
}
