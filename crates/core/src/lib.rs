//! formwork-core: the restricted formula language used by calculated fields.
//!
//! A formula is an arithmetic expression over field names, numeric
//! literals, `+ - * /`, parentheses and a fixed whitelist of functions
//! (see [`Function`]). Anything else is rejected at parse time; there is
//! no way to express assignment, strings, member access or calls to
//! arbitrary code.
//!
//! This crate only turns text into a [`Formula`] tree. Evaluation against
//! form data lives in `formwork-eval`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{BinOp, Formula, Function};
pub use error::{FormulaError, FormulaErrorKind};
pub use parser::parse_formula;
