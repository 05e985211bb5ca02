//! # lepsel-frame
//!
//! In-memory lazy columnar event graph.
//!
//! A [`Node`] is an immutable view of an [`EventTable`] extended with defined
//! columns, filters and row ranges. Nothing is computed until a
//! materialization (`take`, `count`, `sum`) forces a pass over the rows;
//! defined columns are evaluated on demand per row and memoized within it.
//!
//! ```
//! use lepsel_frame::{Column, EventTable, Node};
//!
//! let table = EventTable::new()
//!     .with_column("MET", Column::from(vec![120.0, 180.0, 260.0]))
//!     .unwrap()
//!     .with_column("PT_lep", Column::jagged(vec![vec![40.0, 22.0], vec![], vec![31.0]]))
//!     .unwrap();
//!
//! let node = Node::new(table)
//!     .define("nlep", "Size(PT_lep)")
//!     .unwrap()
//!     .filter("MET >= 150")
//!     .unwrap();
//! assert_eq!(node.take::<u64>("nlep").unwrap(), vec![0, 1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod column;
pub mod dtype;
pub mod error;
pub mod eval;
pub mod expr;
pub mod node;
pub mod value;

pub use column::{Column, EventTable, Jagged};
pub use dtype::{DType, ScalarType};
pub use error::{FrameError, Result};
pub use expr::CompiledExpr;
pub use node::{Args, Node};
pub use value::{ColumnType, Element, Scalar, Seq, Value};
