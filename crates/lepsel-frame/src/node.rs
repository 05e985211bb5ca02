//! Lazy event graph nodes.
//!
//! Every transformation returns a new [`Node`] sharing the source table and
//! the definitions of its parent. Materializations walk the rows once,
//! resolving only the columns they need.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::column::EventTable;
use crate::dtype::DType;
use crate::error::{FrameError, Result};
use crate::eval::BoundExpr;
use crate::expr::CompiledExpr;
use crate::value::{ColumnType, Element, Scalar, Value};

/// Unbounded materializations switch to rayon above this many source rows.
const PAR_MIN_ROWS: usize = 1024;

type RowFn = Arc<dyn Fn(&Args<'_>) -> Value + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Source(usize),
    Defined(usize),
}

enum DefineKind {
    Expr(BoundExpr),
    Func(RowFn),
}

struct Define {
    name: String,
    dtype: DType,
    inputs: Vec<Slot>,
    kind: DefineKind,
}

struct Filter {
    label: String,
    expr: BoundExpr,
    inputs: Vec<Slot>,
}

enum Step {
    Filter(Filter),
    Range { begin: usize, end: usize, counter: usize },
}

/// Input values handed to a [`Node::define_fn`] closure, in declaration order.
///
/// Input types are checked when the column is defined, so the typed
/// accessors only return an empty or default value on programming errors.
pub struct Args<'a> {
    values: &'a [&'a Value],
}

impl<'a> Args<'a> {
    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the closure takes no inputs.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of input `i`.
    pub fn value(&self, i: usize) -> Option<&'a Value> {
        self.values.get(i).copied()
    }

    /// Elements of sequence input `i`.
    pub fn seq<T: Element>(&self, i: usize) -> &'a [T] {
        self.value(i).and_then(Value::as_seq).and_then(T::slice_of).unwrap_or(&[])
    }

    /// Elements of a `seq<f64>` input.
    pub fn f64s(&self, i: usize) -> &'a [f64] {
        self.seq(i)
    }

    /// Elements of a `seq<i32>` input.
    pub fn i32s(&self, i: usize) -> &'a [i32] {
        self.seq(i)
    }

    /// Index pairs of a pair-list input.
    pub fn pairs(&self, i: usize) -> &'a [(usize, usize)] {
        self.value(i).and_then(Value::as_pairs).unwrap_or(&[])
    }

    /// Scalar input `i`.
    pub fn scalar(&self, i: usize) -> Option<Scalar> {
        self.value(i).and_then(Value::as_scalar)
    }
}

/// An immutable node of the event graph.
#[derive(Clone)]
pub struct Node {
    table: Arc<EventTable>,
    defines: Vec<Arc<Define>>,
    steps: Vec<Arc<Step>>,
    schema: HashMap<String, Slot>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("rows", &self.table.n_rows())
            .field("columns", &self.schema.len())
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Node {
    /// Root node over a table.
    pub fn new(table: EventTable) -> Self {
        Self::from_shared(Arc::new(table))
    }

    /// Root node over a shared table.
    pub fn from_shared(table: Arc<EventTable>) -> Self {
        let schema =
            table.names().iter().enumerate().map(|(i, n)| (n.clone(), Slot::Source(i))).collect();
        Self { table, defines: Vec::new(), steps: Vec::new(), schema }
    }

    /// Number of rows in the source table.
    pub fn source_rows(&self) -> usize {
        self.table.n_rows()
    }

    /// `true` if `name` is visible at this node.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.contains_key(name)
    }

    /// Type of a visible column.
    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.schema.get(name).and_then(|s| self.slot_dtype(*s))
    }

    /// Visible columns: source columns first, then definitions in order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = self.table.names().to_vec();
        names.extend(self.defines.iter().map(|d| d.name.clone()));
        names
    }

    /// Add a column computed from an expression.
    pub fn define(&self, name: &str, expr: &str) -> Result<Node> {
        self.ensure_new(name)?;
        let compiled = CompiledExpr::compile(expr)?;
        let (inputs, bound) = self.bind(&compiled)?;
        let define =
            Define { name: name.to_string(), dtype: bound.dtype(), inputs, kind: DefineKind::Expr(bound) };
        Ok(self.with_define(define))
    }

    /// Add a column computed by a closure over typed inputs.
    ///
    /// Each input must exist with exactly the declared type. The column type
    /// is `T::DTYPE`.
    pub fn define_fn<T, F>(&self, name: &str, inputs: &[(&str, DType)], f: F) -> Result<Node>
    where
        T: ColumnType,
        F: Fn(&Args<'_>) -> T + Send + Sync + 'static,
    {
        self.ensure_new(name)?;
        let mut slots = Vec::with_capacity(inputs.len());
        for &(column, expected) in inputs {
            let (slot, found) = self.lookup(column)?;
            if found != expected {
                return Err(FrameError::TypeMismatch { column: column.to_string(), expected, found });
            }
            slots.push(slot);
        }
        let func: RowFn = Arc::new(move |args: &Args<'_>| f(args).into_value());
        let define =
            Define { name: name.to_string(), dtype: T::DTYPE, inputs: slots, kind: DefineKind::Func(func) };
        Ok(self.with_define(define))
    }

    /// Keep rows where `expr` is non-zero. The expression must be a scalar.
    pub fn filter(&self, expr: &str) -> Result<Node> {
        let compiled = CompiledExpr::compile(expr)?;
        let (inputs, bound) = self.bind(&compiled)?;
        if !bound.dtype().is_scalar() {
            return Err(FrameError::Expression(format!(
                "filter '{expr}' evaluates to {}, expected a scalar",
                bound.dtype()
            )));
        }
        let mut node = self.clone();
        node.steps.push(Arc::new(Step::Filter(Filter { label: expr.to_string(), expr: bound, inputs })));
        Ok(node)
    }

    /// Pass only the rows numbered `begin..end` among those reaching this
    /// step. Processing stops once `end` rows have reached it.
    pub fn range(&self, begin: usize, end: usize) -> Node {
        let counter = self.steps.iter().filter(|s| matches!(***s, Step::Range { .. })).count();
        let mut node = self.clone();
        node.steps.push(Arc::new(Step::Range { begin, end, counter }));
        node
    }

    /// Materialize a column as `T`, which must match its type exactly.
    pub fn take<T: ColumnType>(&self, column: &str) -> Result<Vec<T>> {
        let (slot, found) = self.lookup(column)?;
        if found != T::DTYPE {
            return Err(FrameError::TypeMismatch {
                column: column.to_string(),
                expected: T::DTYPE,
                found,
            });
        }
        self.scan(|ctx| {
            let v = ctx.value(slot)?;
            T::from_value(v).ok_or_else(|| FrameError::Evaluation {
                column: column.to_string(),
                row: ctx.row,
                message: format!("value of type {} in a {} column", v.dtype(), T::DTYPE),
            })
        })
    }

    /// Materialize a column as dynamically typed values.
    pub fn take_values(&self, column: &str) -> Result<Vec<Value>> {
        let (slot, _) = self.lookup(column)?;
        self.scan(|ctx| ctx.value(slot).cloned())
    }

    /// Number of rows passing all steps.
    pub fn count(&self) -> Result<u64> {
        Ok(self.scan(|_| Ok(()))?.len() as u64)
    }

    /// Sum of a numeric column over passing rows; sequences contribute all
    /// of their elements.
    pub fn sum(&self, column: &str) -> Result<f64> {
        let (slot, found) = self.lookup(column)?;
        if found == DType::Pairs {
            return Err(FrameError::TypeMismatch { column: column.to_string(), expected: DType::F64, found });
        }
        let parts = self.scan(|ctx| {
            Ok(match ctx.value(slot)? {
                Value::Scalar(s) => s.as_f64(),
                Value::Seq(items) => items.iter().map(|s| s.as_f64()).sum(),
                Value::Pairs(p) => p.len() as f64,
            })
        })?;
        Ok(parts.into_iter().sum())
    }

    // ── internals ──────────────────────────────────────────────

    fn slot_dtype(&self, slot: Slot) -> Option<DType> {
        match slot {
            Slot::Source(i) => self.table.column_at(i).map(|c| c.dtype()),
            Slot::Defined(i) => self.defines.get(i).map(|d| d.dtype),
        }
    }

    fn lookup(&self, name: &str) -> Result<(Slot, DType)> {
        let slot = *self.schema.get(name).ok_or_else(|| FrameError::UnknownColumn(name.to_string()))?;
        let dtype = self.slot_dtype(slot).ok_or_else(|| FrameError::UnknownColumn(name.to_string()))?;
        Ok((slot, dtype))
    }

    fn ensure_new(&self, name: &str) -> Result<()> {
        if self.schema.contains_key(name) {
            return Err(FrameError::DuplicateColumn(name.to_string()));
        }
        Ok(())
    }

    fn bind(&self, compiled: &CompiledExpr) -> Result<(Vec<Slot>, BoundExpr)> {
        let mut slots = Vec::with_capacity(compiled.required_columns.len());
        let mut types = Vec::with_capacity(compiled.required_columns.len());
        for name in &compiled.required_columns {
            let (slot, dtype) = self.lookup(name)?;
            slots.push(slot);
            types.push(dtype);
        }
        Ok((slots, compiled.bind(&types)?))
    }

    fn with_define(&self, define: Define) -> Node {
        let mut node = self.clone();
        node.schema.insert(define.name.clone(), Slot::Defined(node.defines.len()));
        node.defines.push(Arc::new(define));
        node
    }

    fn scan<R, F>(&self, f: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(&RowCtx<'_>) -> Result<R> + Sync + Send,
    {
        let n = self.table.n_rows();
        let ranges = self.steps.iter().filter(|s| matches!(***s, Step::Range { .. })).count();

        if ranges == 0 && n >= PAR_MIN_ROWS {
            log::debug!("scanning {n} rows in parallel");
            let rows: Vec<Option<R>> = (0..n)
                .into_par_iter()
                .map_init(
                    || RowCtx::new(self),
                    |ctx, row| {
                        ctx.reset(row);
                        for step in &self.steps {
                            if let Step::Filter(filter) = &**step
                                && !ctx.passes(filter)?
                            {
                                return Ok(None);
                            }
                        }
                        f(ctx).map(Some)
                    },
                )
                .collect::<Result<_>>()?;
            return Ok(rows.into_iter().flatten().collect());
        }

        log::debug!("scanning up to {n} rows sequentially");
        let mut seen = vec![0usize; ranges];
        let mut ctx = RowCtx::new(self);
        let mut out = Vec::new();
        'rows: for row in 0..n {
            ctx.reset(row);
            for step in &self.steps {
                match &**step {
                    Step::Filter(filter) => {
                        if !ctx.passes(filter)? {
                            continue 'rows;
                        }
                    }
                    Step::Range { begin, end, counter } => {
                        let k = seen[*counter];
                        if k >= *end {
                            break 'rows;
                        }
                        seen[*counter] += 1;
                        if k < *begin {
                            continue 'rows;
                        }
                    }
                }
            }
            out.push(f(&ctx)?);
        }
        Ok(out)
    }
}

/// Per-row evaluation state: values resolved so far in the current row.
struct RowCtx<'n> {
    node: &'n Node,
    row: usize,
    sources: Vec<OnceCell<Value>>,
    defined: Vec<OnceCell<Value>>,
}

impl<'n> RowCtx<'n> {
    fn new(node: &'n Node) -> Self {
        let n_sources = node.table.names().len();
        Self {
            node,
            row: 0,
            sources: (0..n_sources).map(|_| OnceCell::new()).collect(),
            defined: (0..node.defines.len()).map(|_| OnceCell::new()).collect(),
        }
    }

    fn reset(&mut self, row: usize) {
        self.row = row;
        self.sources.iter_mut().for_each(|c| drop(c.take()));
        self.defined.iter_mut().for_each(|c| drop(c.take()));
    }

    fn values(&self, slots: &[Slot]) -> Result<Vec<&Value>> {
        slots.iter().map(|s| self.value(*s)).collect()
    }

    fn value(&self, slot: Slot) -> Result<&Value> {
        match slot {
            Slot::Source(i) => {
                let cell = &self.sources[i];
                if let Some(v) = cell.get() {
                    return Ok(v);
                }
                let v = self.node.table.column_at(i).and_then(|c| c.value_at(self.row)).ok_or_else(
                    || FrameError::InvalidInput(format!("row {} out of range", self.row)),
                )?;
                Ok(cell.get_or_init(|| v))
            }
            Slot::Defined(i) => {
                let cell = &self.defined[i];
                if let Some(v) = cell.get() {
                    return Ok(v);
                }
                let define = &self.node.defines[i];
                let inputs = self.values(&define.inputs)?;
                let v = match &define.kind {
                    DefineKind::Expr(expr) => expr.eval(&inputs).map_err(|message| {
                        FrameError::Evaluation { column: define.name.clone(), row: self.row, message }
                    })?,
                    DefineKind::Func(f) => f(&Args { values: &inputs }),
                };
                if v.dtype() != define.dtype {
                    return Err(FrameError::Evaluation {
                        column: define.name.clone(),
                        row: self.row,
                        message: format!("produced {} for a {} column", v.dtype(), define.dtype),
                    });
                }
                Ok(cell.get_or_init(|| v))
            }
        }
    }

    fn passes(&self, filter: &Filter) -> Result<bool> {
        let inputs = self.values(&filter.inputs)?;
        let fail = |message: String| FrameError::Evaluation {
            column: filter.label.clone(),
            row: self.row,
            message,
        };
        let v = filter.expr.eval(&inputs).map_err(fail)?;
        v.as_scalar().map(|s| s.truthy()).ok_or_else(|| fail(format!("filter produced {}", v.dtype())))
    }
}
