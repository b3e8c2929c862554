/// What went wrong while reading a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaErrorKind {
    /// The formula is empty or whitespace only.
    Empty,
    /// A character outside the formula alphabet.
    UnexpectedChar,
    /// A token in a position the grammar does not allow.
    UnexpectedToken,
    /// A call to a function that is not whitelisted.
    UnknownFunction,
    /// A whitelisted function called with the wrong number of arguments.
    Arity,
    /// Nesting deeper than [`crate::parser::MAX_DEPTH`], or more than
    /// [`crate::parser::MAX_OPERATORS`] operators.
    TooDeep,
}

/// A formula syntax error. `column` is 1-based, counted in characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (column {column})")]
pub struct FormulaError {
    pub kind: FormulaErrorKind,
    pub column: usize,
    pub message: String,
}

impl FormulaError {
    pub fn new(kind: FormulaErrorKind, column: usize, message: impl Into<String>) -> Self {
        FormulaError {
            kind,
            column,
            message: message.into(),
        }
    }
}
