//! Expression engine for defined columns and filters.
//!
//! Supports integer and floating literals, `true`/`false`, arithmetic
//! (`+ - * / %`), comparisons (`== != < <= > >=`), boolean operators
//! (`&& || !`), the ternary `c ? a : b`, indexing `v[i]` and boolean masks
//! `v[v > 0]`, elementwise operations over sequences with scalar broadcast,
//! math functions (`abs sqrt log exp pow min max`), sequence functions
//! (`Sum Max Min Mean StdDev Size Empty Front Back Sort Reverse Any All
//! DeltaPhi`, optionally written `ROOT::VecOps::Sum`) and the safe helpers
//! `SafeDiv(num, den[, def])` and `SafeIndex(vec, idx[, def])`.
//!
//! Parsing is type-agnostic; [`CompiledExpr::bind`] type-checks the syntax
//! tree against the column types visible at a node.

use crate::dtype::DType;
use crate::error::{FrameError, Result};
use crate::eval::{self, BoundExpr};
use crate::value::Scalar;

// ── AST ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Scalar),
    Column(usize), // index into required_columns
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Arith(ArithOp),
    Cmp(CmpOp),
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Func {
    Abs,
    Sqrt,
    Log,
    Exp,
    Pow,
    Min,
    Max,
    Sum,
    SeqMax,
    SeqMin,
    Mean,
    StdDev,
    Size,
    Empty,
    Front,
    Back,
    Sort,
    Reverse,
    Any,
    All,
    DeltaPhi,
    SafeDiv,
    SafeIndex,
}

impl Func {
    fn lookup(name: &str) -> Option<Func> {
        let mut short = name;
        for prefix in ["ROOT::", "VecOps::", "std::"] {
            short = short.strip_prefix(prefix).unwrap_or(short);
        }
        let f = match short {
            "abs" | "fabs" => Func::Abs,
            "sqrt" => Func::Sqrt,
            "log" => Func::Log,
            "exp" => Func::Exp,
            "pow" => Func::Pow,
            "min" => Func::Min,
            "max" => Func::Max,
            "Sum" => Func::Sum,
            "Max" => Func::SeqMax,
            "Min" => Func::SeqMin,
            "Mean" => Func::Mean,
            "StdDev" => Func::StdDev,
            "Size" => Func::Size,
            "Empty" => Func::Empty,
            "Front" => Func::Front,
            "Back" => Func::Back,
            "Sort" => Func::Sort,
            "Reverse" => Func::Reverse,
            "Any" => Func::Any,
            "All" => Func::All,
            "DeltaPhi" => Func::DeltaPhi,
            "SafeDiv" => Func::SafeDiv,
            "SafeIndex" => Func::SafeIndex,
            _ => return None,
        };
        Some(f)
    }

    /// Accepted argument counts, inclusive.
    fn arity(self) -> (usize, usize) {
        match self {
            Func::Pow | Func::Min | Func::Max | Func::DeltaPhi => (2, 2),
            Func::SafeDiv | Func::SafeIndex => (2, 3),
            _ => (1, 1),
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Func::Abs => "abs",
            Func::Sqrt => "sqrt",
            Func::Log => "log",
            Func::Exp => "exp",
            Func::Pow => "pow",
            Func::Min => "min",
            Func::Max => "max",
            Func::Sum => "Sum",
            Func::SeqMax => "Max",
            Func::SeqMin => "Min",
            Func::Mean => "Mean",
            Func::StdDev => "StdDev",
            Func::Size => "Size",
            Func::Empty => "Empty",
            Func::Front => "Front",
            Func::Back => "Back",
            Func::Sort => "Sort",
            Func::Reverse => "Reverse",
            Func::Any => "Any",
            Func::All => "All",
            Func::DeltaPhi => "DeltaPhi",
            Func::SafeDiv => "SafeDiv",
            Func::SafeIndex => "SafeIndex",
        }
    }
}

// ── Compiled expression ────────────────────────────────────────

/// A parsed expression, not yet bound to column types.
///
/// Identifiers that are not function names are column references.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    ast: Expr,
    source: String,
    /// Column names referenced by this expression (ordered by first occurrence).
    pub required_columns: Vec<String>,
}

impl CompiledExpr {
    /// Parse and compile an expression string.
    pub fn compile(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(FrameError::Expression("empty expression".into()));
        }
        let mut parser = Parser::new(&tokens);
        let ast = parser.parse_ternary()?;
        if parser.pos < parser.tokens.len() {
            return Err(FrameError::Expression(format!(
                "unexpected token after expression: {:?}",
                parser.tokens[parser.pos]
            )));
        }
        let columns = std::mem::take(&mut parser.columns);
        Ok(CompiledExpr { ast, source: input.to_string(), required_columns: columns })
    }

    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Type-check against the types of `required_columns` (same order).
    pub fn bind(&self, inputs: &[DType]) -> Result<BoundExpr> {
        if inputs.len() != self.required_columns.len() {
            return Err(FrameError::Expression(format!(
                "expected {} input types, got {}",
                self.required_columns.len(),
                inputs.len()
            )));
        }
        eval::bind(&self.ast, inputs)
            .map_err(|e| FrameError::Expression(format!("{e} in '{}'", self.source)))
    }
}

// ── Tokenizer ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Question,
    Colon,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Two-character operators
        if i + 1 < chars.len() {
            let tok = match (c, chars[i + 1]) {
                ('&', '&') => Some(Token::And),
                ('|', '|') => Some(Token::Or),
                ('=', '=') => Some(Token::Eq),
                ('!', '=') => Some(Token::Ne),
                ('<', '=') => Some(Token::Le),
                ('>', '=') => Some(Token::Ge),
                _ => None,
            };
            if let Some(t) = tok {
                tokens.push(t);
                i += 2;
                continue;
            }
        }

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            ',' => Some(Token::Comma),
            '?' => Some(Token::Question),
            ':' => Some(Token::Colon),
            '<' => Some(Token::Lt),
            '>' => Some(Token::Gt),
            '!' => Some(Token::Not),
            _ => None,
        };
        if let Some(t) = single {
            tokens.push(t);
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_ascii_digit()
                    || chars[i] == '.'
                    || chars[i] == 'e'
                    || chars[i] == 'E'
                    || ((chars[i] == '+' || chars[i] == '-')
                        && i > start
                        && (chars[i - 1] == 'e' || chars[i - 1] == 'E')))
            {
                i += 1;
            }
            let s: String = chars[start..i].iter().collect();
            let is_float = s.contains(['.', 'e', 'E']);
            let tok = if is_float {
                s.parse().map(Token::Float).ok()
            } else {
                s.parse().map(Token::Int).ok()
            };
            let tok =
                tok.ok_or_else(|| FrameError::Expression(format!("invalid number: '{s}'")))?;
            tokens.push(tok);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() {
                if chars[i].is_ascii_alphanumeric() || chars[i] == '_' {
                    i += 1;
                } else if chars[i] == ':' && chars.get(i + 1) == Some(&':') {
                    i += 2;
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            return Err(FrameError::Expression(format!("unexpected character: '{c}'")));
        }
    }

    Ok(tokens)
}

// ── Parser (recursive descent) ─────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    columns: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0, columns: Vec::new() }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.advance() {
            Some(t) if t == expected => Ok(()),
            other => Err(FrameError::Expression(format!("expected {expected:?}, got {other:?}"))),
        }
    }

    fn resolve_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.columns.iter().position(|b| b == name) {
            i
        } else {
            self.columns.push(name.to_string());
            self.columns.len() - 1
        }
    }

    // ── Grammar rules ──────────────────────────────────────────

    fn parse_ternary(&mut self) -> Result<Expr> {
        let cond = self.parse_or()?;
        if !matches!(self.peek(), Some(Token::Question)) {
            return Ok(cond);
        }
        self.advance();
        let then = self.parse_ternary()?;
        self.expect(&Token::Colon)?;
        let other = self.parse_ternary()?;
        Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(other)))
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::Ne) => CmpOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(BinOp::Cmp(op), Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_add()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_add()?;
            lhs = Expr::Binary(BinOp::Cmp(op), Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_add(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_mul()?;
            lhs = Expr::Binary(BinOp::Arith(op), Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_mul(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(BinOp::Arith(op), Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let e = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(e)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.parse_unary()
            }
            Some(Token::Not) => {
                self.advance();
                let e = self.parse_unary()?;
                Ok(Expr::Not(Box::new(e)))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut e = self.parse_atom()?;
        while matches!(self.peek(), Some(Token::LBracket)) {
            self.advance();
            let idx = self.parse_ternary()?;
            self.expect(&Token::RBracket)?;
            e = Expr::Index(Box::new(e), Box::new(idx));
        }
        Ok(e)
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.advance().cloned() {
            Some(Token::Int(n)) => Ok(Expr::Literal(match i32::try_from(n) {
                Ok(small) => Scalar::I32(small),
                Err(_) => Scalar::I64(n),
            })),
            Some(Token::Float(x)) => Ok(Expr::Literal(Scalar::F64(x))),
            Some(Token::LParen) => {
                let e = self.parse_ternary()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Some(Token::Ident(name)) if name == "true" => Ok(Expr::Literal(Scalar::Bool(true))),
            Some(Token::Ident(name)) if name == "false" => Ok(Expr::Literal(Scalar::Bool(false))),
            Some(Token::Ident(name)) => {
                if !matches!(self.peek(), Some(Token::LParen)) {
                    let idx = self.resolve_column(&name);
                    return Ok(Expr::Column(idx));
                }
                self.advance(); // consume '('
                let func = Func::lookup(&name)
                    .ok_or_else(|| FrameError::Expression(format!("unknown function: '{name}'")))?;
                let mut args = Vec::new();
                if !matches!(self.peek(), Some(Token::RParen)) {
                    args.push(self.parse_ternary()?);
                    while matches!(self.peek(), Some(Token::Comma)) {
                        self.advance();
                        args.push(self.parse_ternary()?);
                    }
                }
                self.expect(&Token::RParen)?;
                let (lo, hi) = func.arity();
                if args.len() < lo || args.len() > hi {
                    return Err(FrameError::Expression(format!(
                        "{}() takes {} argument(s), got {}",
                        func.name(),
                        if lo == hi { lo.to_string() } else { format!("{lo} to {hi}") },
                        args.len()
                    )));
                }
                Ok(Expr::Call(func, args))
            }
            other => Err(FrameError::Expression(format!(
                "expected number, identifier, or '(', got {other:?}"
            ))),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_in_first_occurrence_order() {
        let e = CompiledExpr::compile("pt * weight_mc + pt").unwrap();
        assert_eq!(e.required_columns, vec!["pt", "weight_mc"]);
    }

    #[test]
    fn qualified_function_names() {
        let e = CompiledExpr::compile("ROOT::VecOps::Sum(Charge_lep == 1) >= 2").unwrap();
        assert_eq!(e.required_columns, vec!["Charge_lep"]);
        let e = CompiledExpr::compile("!VecOps::Empty(PT_lep) && std::abs(x) < 1").unwrap();
        assert_eq!(e.required_columns, vec!["PT_lep", "x"]);
    }

    #[test]
    fn literals() {
        let e = CompiledExpr::compile("3000000000").unwrap();
        assert!(matches!(e.ast, Expr::Literal(Scalar::I64(3_000_000_000))));
        let e = CompiledExpr::compile("1.5e2").unwrap();
        assert!(matches!(e.ast, Expr::Literal(Scalar::F64(x)) if x == 150.0));
        let e = CompiledExpr::compile("true").unwrap();
        assert!(e.required_columns.is_empty());
    }

    #[test]
    fn ternary_and_indexing() {
        let e = CompiledExpr::compile("n > 0 ? v[0] : -1").unwrap();
        assert_eq!(e.required_columns, vec!["n", "v"]);
        assert!(matches!(e.ast, Expr::Ternary(..)));
        let e = CompiledExpr::compile("v[v > 10][0]").unwrap();
        assert!(matches!(e.ast, Expr::Index(..)));
    }

    #[test]
    fn syntax_errors() {
        for bad in ["", "a +", "(a", "a b", "a $ b", "frobnicate(a)", "pow(a)", "Size(a, b)", "a ? b"]
        {
            assert!(CompiledExpr::compile(bad).is_err(), "{bad:?} should not compile");
        }
    }
}
