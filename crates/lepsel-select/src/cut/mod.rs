//! Shorthand lepton cuts.
//!
//! ```
//! use lepsel_select::cut::compile_cut;
//!
//! assert_eq!(compile_cut(">=1OSSF_a", ""), "(A_NumOSSFPairs >= 1)");
//! assert_eq!(
//!     compile_cut(">=1OSSF|mass<65", ""),
//!     "(SUM(Mass_All_OSSFPairs < 65) >= 1)"
//! );
//! assert_eq!(compile_cut("<1garbage", ""), "");
//! ```

pub mod ast;
mod compiler;

pub use ast::{CmpOp, CutExpr, Mask, Number, Operand};
pub use compiler::{CompiledCut, compile, compile_cut};
