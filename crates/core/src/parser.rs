//! Recursive-descent parser for formulas.
//!
//! Grammar:
//!
//! ```text
//! formula := expr EOF
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | atom
//! atom    := NUMBER | IDENT '(' args ')' | IDENT | '(' expr ')'
//! args    := expr (',' expr)*
//! ```

use crate::ast::{BinOp, Formula, Function};
use crate::error::{FormulaError, FormulaErrorKind};
use crate::lexer::{lex, Spanned, Token};

/// Maximum nesting of parentheses, calls and unary minus.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of binary operators in one formula. Operator chains
/// nest the tree one level per operator, so this bounds its depth too.
pub const MAX_OPERATORS: usize = 256;

/// Parse formula text into a tree.
pub fn parse_formula(src: &str) -> Result<Formula, FormulaError> {
    let tokens = lex(src)?;
    if tokens.len() == 1 {
        return Err(FormulaError::new(
            FormulaErrorKind::Empty,
            1,
            "formula is empty",
        ));
    }
    let mut parser = Parser::new(&tokens);
    let formula = parser.parse_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err(
            FormulaErrorKind::UnexpectedToken,
            format!("unexpected {} after end of expression", describe(parser.peek())),
        ));
    }
    Ok(formula)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    operators: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, kind: FormulaErrorKind, message: impl Into<String>) -> FormulaError {
        FormulaError::new(kind, self.cur().column, message)
    }

    fn expect(&mut self, token: Token) -> Result<(), FormulaError> {
        if self.peek() == &token {
            self.advance();
            Ok(())
        } else {
            Err(self.err(
                FormulaErrorKind::UnexpectedToken,
                format!("expected {}, got {}", describe(&token), describe(self.peek())),
            ))
        }
    }

    fn enter(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.err(
                FormulaErrorKind::TooDeep,
                format!("formula nests deeper than {} levels", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn count_operator(&mut self) -> Result<(), FormulaError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(self.err(
                FormulaErrorKind::TooDeep,
                format!("formula has more than {} operators", MAX_OPERATORS),
            ));
        }
        Ok(())
    }

    // -- Expression parsing --------------------------------------

    fn parse_expr(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.count_operator()?;
            self.advance();
            let right = self.parse_term()?;
            left = Formula::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            self.count_operator()?;
            self.advance();
            let right = self.parse_unary()?;
            left = Formula::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Formula, FormulaError> {
        if self.peek() == &Token::Minus {
            self.advance();
            self.enter()?;
            let inner = self.parse_unary()?;
            self.leave();
            return Ok(Formula::Neg(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Formula, FormulaError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Formula::Number(n))
            }
            Token::Ident(name) => {
                let column = self.cur().column;
                self.advance();
                if self.peek() == &Token::LParen {
                    self.parse_call(&name, column)
                } else {
                    Ok(Formula::Field(name))
                }
            }
            Token::LParen => {
                self.advance();
                self.enter()?;
                let e = self.parse_expr()?;
                self.leave();
                self.expect(Token::RParen)?;
                Ok(e)
            }
            other => Err(self.err(
                FormulaErrorKind::UnexpectedToken,
                format!("expected a number, field or '(', got {}", describe(&other)),
            )),
        }
    }

    fn parse_call(&mut self, name: &str, column: usize) -> Result<Formula, FormulaError> {
        let function = Function::from_name(name).ok_or_else(|| {
            FormulaError::new(
                FormulaErrorKind::UnknownFunction,
                column,
                format!("unknown function '{}'", name),
            )
        })?;
        self.expect(Token::LParen)?;
        self.enter()?;
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            args.push(self.parse_expr()?);
            while self.peek() == &Token::Comma {
                self.advance();
                args.push(self.parse_expr()?);
            }
        }
        self.leave();
        self.expect(Token::RParen)?;

        let (min, max) = function.arity();
        if args.len() < min || max.map_or(false, |m| args.len() > m) {
            let expected = match max {
                Some(m) if m == min => format!("{}", min),
                Some(m) => format!("{} to {}", min, m),
                None => format!("at least {}", min),
            };
            return Err(FormulaError::new(
                FormulaErrorKind::Arity,
                column,
                format!(
                    "{}() takes {} argument(s), got {}",
                    function.name(),
                    expected,
                    args.len()
                ),
            ));
        }
        Ok(Formula::Call { function, args })
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(name) => format!("'{}'", name),
        Token::Number(n) => format!("number {}", n),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Eof => "end of formula".to_string(),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Box<Formula> {
        Box::new(Formula::Field(name.to_string()))
    }

    #[test]
    fn parse_sum_of_fields() {
        let f = parse_formula("amount + tax").unwrap();
        assert_eq!(
            f,
            Formula::Binary {
                op: BinOp::Add,
                left: field("amount"),
                right: field("tax"),
            }
        );
    }

    #[test]
    fn multiplication_binds_tighter() {
        let f = parse_formula("a + b * c").unwrap();
        match f {
            Formula::Binary {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Formula::Binary { op: BinOp::Mul, .. })),
            other => panic!("expected Add at the root, got {:?}", other),
        }
    }

    #[test]
    fn subtraction_is_left_associative() {
        let f = parse_formula("a - b - c").unwrap();
        assert_eq!(f.to_string(), "a - b - c");
        let g = parse_formula("a - (b - c)").unwrap();
        assert_eq!(g.to_string(), "a - (b - c)");
        assert_ne!(f, g);
    }

    #[test]
    fn display_round_trips() {
        for src in [
            "round((amount + tax) * 1.19, 2)",
            "-a / (b - c)",
            "sum(q1, q2, q3) / 3",
            "abs(-x)",
        ] {
            let f = parse_formula(src).unwrap();
            let again = parse_formula(&f.to_string()).unwrap();
            assert_eq!(f, again, "display form of {:?} was {}", src, f);
        }
    }

    #[test]
    fn function_names_case_insensitive() {
        let f = parse_formula("SUM(a, b)").unwrap();
        assert!(matches!(
            f,
            Formula::Call {
                function: Function::Sum,
                ..
            }
        ));
    }

    #[test]
    fn references_in_order_without_duplicates() {
        let f = parse_formula("round(b + a * b, 2) - c").unwrap();
        assert_eq!(f.references(), vec!["b", "a", "c"]);
    }

    #[test]
    fn unknown_function_rejected() {
        let err = parse_formula("1 + eval(x)").unwrap_err();
        assert_eq!(err.kind, FormulaErrorKind::UnknownFunction);
        assert_eq!(err.column, 5);
    }

    #[test]
    fn arity_checked() {
        let err = parse_formula("round(a, 2, 3)").unwrap_err();
        assert_eq!(err.kind, FormulaErrorKind::Arity);
        assert_eq!(err.message, "round() takes 1 to 2 argument(s), got 3");
        assert_eq!(
            parse_formula("sum()").unwrap_err().kind,
            FormulaErrorKind::Arity
        );
    }

    #[test]
    fn empty_formula_rejected() {
        assert_eq!(
            parse_formula("   ").unwrap_err().kind,
            FormulaErrorKind::Empty
        );
    }

    #[test]
    fn trailing_tokens_rejected() {
        let err = parse_formula("a b").unwrap_err();
        assert_eq!(err.kind, FormulaErrorKind::UnexpectedToken);
        assert_eq!(err.column, 3);
    }

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(parse_formula("(a + b").is_err());
        assert!(parse_formula("a + b)").is_err());
        assert!(parse_formula("a +").is_err());
    }

    #[test]
    fn nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(
            parse_formula(&deep).unwrap_err().kind,
            FormulaErrorKind::TooDeep
        );
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert!(parse_formula(&ok).is_ok());
    }

    #[test]
    fn operator_limit() {
        let long = format!("{}1", "1+".repeat(3000));
        let err = parse_formula(&long).unwrap_err();
        assert_eq!(err.kind, FormulaErrorKind::TooDeep);
        assert_eq!(err.message, "formula has more than 256 operators");

        let products = format!("{}a", "a*".repeat(MAX_OPERATORS + 1));
        assert_eq!(
            parse_formula(&products).unwrap_err().kind,
            FormulaErrorKind::TooDeep
        );

        let at_limit = format!("{}1", "1+".repeat(MAX_OPERATORS));
        assert!(parse_formula(&at_limit).is_ok());
    }
}
