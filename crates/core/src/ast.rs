//! Formula AST produced by the parser.
//!
//! Nothing is resolved here: field references are plain names and
//! numeric literals keep their source text.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Numeric literal as written, e.g. `"2.50"`.
    Number(String),
    /// Reference to a field's raw value.
    Field(String),
    Neg(Box<Formula>),
    Binary {
        op: BinOp,
        left: Box<Formula>,
        right: Box<Formula>,
    },
    Call {
        function: Function,
        args: Vec<Formula>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div => 2,
        }
    }
}

/// The whitelisted functions. Names are matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sum,
    Avg,
    Min,
    Max,
    Round,
    Abs,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Function> {
        match name.to_ascii_lowercase().as_str() {
            "sum" => Some(Function::Sum),
            "avg" => Some(Function::Avg),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "round" => Some(Function::Round),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "sum",
            Function::Avg => "avg",
            Function::Min => "min",
            Function::Max => "max",
            Function::Round => "round",
            Function::Abs => "abs",
        }
    }

    /// Accepted argument counts as `(min, max)`; `None` means unbounded.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            Function::Sum | Function::Avg | Function::Min | Function::Max => (1, None),
            Function::Round => (1, Some(2)),
            Function::Abs => (1, Some(1)),
        }
    }
}

impl Formula {
    /// Field names referenced by this formula, in first-seen order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Formula::Number(_) => {}
            Formula::Field(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Formula::Neg(inner) => inner.collect_refs(out),
            Formula::Binary { left, right, .. } => {
                left.collect_refs(out);
                right.collect_refs(out);
            }
            Formula::Call { args, .. } => args.iter().for_each(|a| a.collect_refs(out)),
        }
    }

    fn fmt_prec(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Formula::Number(n) => f.write_str(n),
            Formula::Field(name) => f.write_str(name),
            Formula::Neg(inner) => {
                f.write_str("-")?;
                inner.fmt_prec(f, 3)
            }
            Formula::Binary { op, left, right } => {
                let p = op.precedence();
                if p < parent {
                    f.write_str("(")?;
                }
                left.fmt_prec(f, p)?;
                write!(f, " {} ", op.symbol())?;
                // Right operand binds one level tighter: a - (b - c) keeps its parens.
                right.fmt_prec(f, p + 1)?;
                if p < parent {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Formula::Call { function, args } => {
                write!(f, "{}(", function.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    arg.fmt_prec(f, 0)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Canonical text form; parsing it yields an equal tree.
impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_prec(f, 0)
    }
}
