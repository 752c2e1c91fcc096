//! Recursive-descent parser for a single predicate expression.
//!
//! Precedence, lowest first: lambda, conditional, `or`, `and`, `not`,
//! comparisons, `|`, `^`, `&`, shifts, additive, multiplicative, unary,
//! `**`, postfix (call / subscript / attribute), atoms.

use super::ast::{
    BinOp, BoolOp, CmpOp, Comprehension, ComprehensionKind, Expr, Keyword, Literal, UnaryOp,
};
use super::lexer::{Lexer, Token, TokenKind};
use super::PredicateParseError;

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Guarded descents before parsing gives up; each bracket level costs two.
const MAX_NESTING: usize = 100;
/// Left-leaning operator chains deepen the tree without any brackets.
const MAX_TOKENS: usize = 1_000;

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Statement keywords that name a forbidden construct rather than a plain syntax error.
fn statement_kind(keyword: &str) -> Option<&'static str> {
    match keyword {
        "import" | "from" => Some("Import"),
        "with" => Some("With"),
        "try" | "except" | "finally" => Some("Try"),
        "def" | "async" => Some("FunctionDef"),
        "class" => Some("ClassDef"),
        _ => None,
    }
}

/// Parse `source` as exactly one expression.
pub fn parse_expression(source: &str) -> Result<Expr, PredicateParseError> {
    let tokens = Lexer::new(source).tokenize()?;
    if let Some(tok) = tokens.get(MAX_TOKENS) {
        return Err(PredicateParseError::syntax("expression too long", tok.column));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_top()?;
    if !parser.at_end() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, PredicateParseError>,
    ) -> Result<Expr, PredicateParseError> {
        if self.depth >= MAX_NESTING {
            return Err(PredicateParseError::syntax(
                "expression nested too deeply",
                self.peek().column,
            ));
        }
        self.depth += 1;
        let expr = parse(self);
        self.depth -= 1;
        expr
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if !matches!(tok.kind, TokenKind::End) {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::End)
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Op(o) if o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.check_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<(), PredicateParseError> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{op}'")))
        }
    }

    fn check_kw(&self, kw: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Name(n) if n == kw)
    }

    fn check_kw_at(&self, offset: usize, kw: &str) -> bool {
        matches!(&self.peek_at(offset).kind, TokenKind::Name(n) if n == kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.check_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: &str) -> Result<(), PredicateParseError> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{kw}'")))
        }
    }

    fn unexpected(&self) -> PredicateParseError {
        let tok = self.peek();
        if let TokenKind::Name(name) = &tok.kind {
            if let Some(kind) = statement_kind(name) {
                return PredicateParseError::ForbiddenSyntax(kind);
            }
        }
        PredicateParseError::syntax(format!("unexpected {}", tok.describe()), tok.column)
    }

    fn expected(&self, what: &str) -> PredicateParseError {
        let tok = self.peek();
        if let TokenKind::Name(name) = &tok.kind {
            if let Some(kind) = statement_kind(name) {
                return PredicateParseError::ForbiddenSyntax(kind);
            }
        }
        PredicateParseError::syntax(
            format!("expected {what}, found {}", tok.describe()),
            tok.column,
        )
    }

    /// Tokens that close the current expression list.
    fn at_list_end(&self) -> bool {
        self.at_end()
            || self.check_op(")")
            || self.check_op("]")
            || self.check_op("}")
            || self.check_op(":")
            || self.check_kw("for")
            || self.check_kw("in")
    }

    /// `a` or `a, b, *c` (bare tuple) at the top level.
    fn parse_top(&mut self) -> Result<Expr, PredicateParseError> {
        if self.at_end() {
            return Err(PredicateParseError::syntax("empty expression", 1));
        }
        let first = self.parse_star_or_expression()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_list_end() {
                break;
            }
            items.push(self.parse_star_or_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_star_or_expression(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.parse_bitor()?)));
        }
        self.parse_expression()
    }

    fn parse_expression(&mut self) -> Result<Expr, PredicateParseError> {
        self.nested(Self::parse_conditional)
    }

    /// Conditional expressions and lambdas.
    fn parse_conditional(&mut self) -> Result<Expr, PredicateParseError> {
        if self.check_kw("lambda") {
            return self.parse_lambda();
        }
        let body = self.parse_or()?;
        if self.eat_kw("if") {
            let test = self.parse_or()?;
            self.expect_kw("else")?;
            let orelse = self.parse_expression()?;
            return Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            });
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> Result<Expr, PredicateParseError> {
        self.expect_kw("lambda")?;
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        while !self.check_op(":") {
            if self.eat_op("*") || self.eat_op("**") {
                // a bare `*` is only a separator
                if !self.check_op(",") && !self.check_op(":") {
                    params.push(self.parse_param_name()?);
                }
            } else if !self.eat_op("/") {
                params.push(self.parse_param_name()?);
                if self.eat_op("=") {
                    defaults.push(self.parse_expression()?);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            defaults,
            body: Box::new(body),
        })
    }

    fn parse_param_name(&mut self) -> Result<String, PredicateParseError> {
        match self.peek().kind.clone() {
            TokenKind::Name(name) if !is_keyword(&name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.expected("parameter name")),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, PredicateParseError> {
        let first = self.parse_and()?;
        if !self.check_kw("or") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_kw("or") {
            values.push(self.parse_and()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            values,
        })
    }

    fn parse_and(&mut self) -> Result<Expr, PredicateParseError> {
        let first = self.parse_not()?;
        if !self.check_kw("and") {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_kw("and") {
            values.push(self.parse_not()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            values,
        })
    }

    fn parse_not(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_kw("not") {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let kind = self.peek().kind.clone();
        let op = match &kind {
            TokenKind::Op("==") => CmpOp::Eq,
            TokenKind::Op("!=") => CmpOp::NotEq,
            TokenKind::Op("<") => CmpOp::Lt,
            TokenKind::Op("<=") => CmpOp::LtE,
            TokenKind::Op(">") => CmpOp::Gt,
            TokenKind::Op(">=") => CmpOp::GtE,
            TokenKind::Name(n) if n == "in" => CmpOp::In,
            TokenKind::Name(n) if n == "not" && self.check_kw_at(1, "in") => {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            TokenKind::Name(n) if n == "is" => {
                if self.check_kw_at(1, "not") {
                    self.pos += 2;
                    return Some(CmpOp::IsNot);
                }
                CmpOp::Is
            }
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr, PredicateParseError> {
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some(op) = self.comparison_op() {
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }

    fn parse_binary_level(
        &mut self,
        table: &[(&str, BinOp)],
        next: fn(&mut Self) -> Result<Expr, PredicateParseError>,
    ) -> Result<Expr, PredicateParseError> {
        let mut left = next(self)?;
        'outer: loop {
            for (sym, op) in table {
                if self.eat_op(sym) {
                    let right = next(self)?;
                    left = Expr::BinOp {
                        left: Box::new(left),
                        op: *op,
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_bitor(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(&[("|", BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(&[("^", BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(&[("&", BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(
            &[("<<", BinOp::LShift), (">>", BinOp::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::parse_term)
    }

    fn parse_term(&mut self) -> Result<Expr, PredicateParseError> {
        self.parse_binary_level(
            &[
                ("*", BinOp::Mul),
                ("//", BinOp::FloorDiv),
                ("/", BinOp::Div),
                ("%", BinOp::Mod),
                ("@", BinOp::MatMul),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, PredicateParseError> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Pos
        } else if self.eat_op("~") {
            UnaryOp::Invert
        } else {
            return self.parse_power();
        };
        let operand = self.nested(Self::parse_factor)?;
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr, PredicateParseError> {
        let base = self.parse_postfix()?;
        if self.eat_op("**") {
            let exponent = self.nested(Self::parse_factor)?;
            return Ok(Expr::BinOp {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, PredicateParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op("(") {
                let (args, keywords) = self.parse_call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    keywords,
                };
            } else if self.eat_op("[") {
                let index = self.parse_subscript()?;
                self.expect_op("]")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_op(".") {
                let attr = match &self.peek().kind {
                    TokenKind::Name(n) => n.clone(),
                    _ => return Err(self.expected("attribute name")),
                };
                self.advance();
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>), PredicateParseError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.check_op(")") {
            if self.eat_op("**") {
                keywords.push(Keyword {
                    name: None,
                    value: self.parse_expression()?,
                });
            } else if self.eat_op("*") {
                args.push(Expr::Starred(Box::new(self.parse_expression()?)));
            } else if matches!(&self.peek().kind, TokenKind::Name(n) if !is_keyword(n))
                && matches!(self.peek_at(1).kind, TokenKind::Op("="))
            {
                let TokenKind::Name(name) = self.advance().kind else {
                    return Err(self.unexpected());
                };
                self.advance();
                keywords.push(Keyword {
                    name: Some(name),
                    value: self.parse_expression()?,
                });
            } else {
                let arg = self.parse_expression()?;
                if self.check_kw("for") {
                    let generators = self.parse_comprehension_clauses()?;
                    args.push(Expr::Comprehension {
                        kind: ComprehensionKind::Generator,
                        element: Box::new(arg),
                        value: None,
                        generators,
                    });
                } else {
                    args.push(arg);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok((args, keywords))
    }

    fn parse_subscript(&mut self) -> Result<Expr, PredicateParseError> {
        let first = self.parse_slice_item()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_op("]") {
                break;
            }
            items.push(self.parse_slice_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_slice_item(&mut self) -> Result<Expr, PredicateParseError> {
        let lower = if self.check_op(":") {
            None
        } else {
            let expr = self.parse_expression()?;
            if !self.check_op(":") {
                return Ok(expr);
            }
            Some(Box::new(expr))
        };
        self.expect_op(":")?;
        let bound = |p: &mut Self| -> Result<Option<Box<Expr>>, PredicateParseError> {
            if p.check_op(":") || p.check_op(",") || p.check_op("]") {
                Ok(None)
            } else {
                Ok(Some(Box::new(p.parse_expression()?)))
            }
        };
        let upper = bound(self)?;
        let step = if self.eat_op(":") { bound(self)? } else { None };
        Ok(Expr::Slice { lower, upper, step })
    }

    fn parse_comprehension_clauses(&mut self) -> Result<Vec<Comprehension>, PredicateParseError> {
        let mut generators = Vec::new();
        while self.eat_kw("for") {
            let target = self.parse_target_list()?;
            self.expect_kw("in")?;
            let iter = self.parse_or()?;
            let mut ifs = Vec::new();
            while self.eat_kw("if") {
                ifs.push(self.parse_or()?);
            }
            generators.push(Comprehension { target, iter, ifs });
        }
        Ok(generators)
    }

    /// Comprehension targets stop below comparisons so `in` is left alone.
    fn parse_target_list(&mut self) -> Result<Expr, PredicateParseError> {
        let first = self.parse_target()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_kw("in") {
                break;
            }
            items.push(self.parse_target()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_target(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.parse_bitor()?)));
        }
        self.parse_bitor()
    }

    fn parse_atom(&mut self) -> Result<Expr, PredicateParseError> {
        self.nested(Self::parse_primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, PredicateParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Number(raw) => {
                self.advance();
                Ok(Expr::Constant(number_literal(raw)))
            }
            TokenKind::Str(first) => {
                self.advance();
                let mut value = first;
                while let TokenKind::Str(next) = &self.peek().kind {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::Constant(Literal::Str(value)))
            }
            TokenKind::Name(name) => {
                let literal = match name.as_str() {
                    "True" => Some(Literal::Bool(true)),
                    "False" => Some(Literal::Bool(false)),
                    "None" => Some(Literal::None),
                    _ => None,
                };
                if let Some(lit) = literal {
                    self.advance();
                    return Ok(Expr::Constant(lit));
                }
                if name == "lambda" {
                    return self.parse_lambda();
                }
                if is_keyword(&name) {
                    return Err(self.unexpected());
                }
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::Op("...") => {
                self.advance();
                Ok(Expr::Constant(Literal::Ellipsis))
            }
            TokenKind::Op("(") => {
                self.advance();
                self.parse_paren()
            }
            TokenKind::Op("[") => {
                self.advance();
                self.parse_list()
            }
            TokenKind::Op("{") => {
                self.advance();
                self.parse_brace()
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_paren(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.parse_star_or_expression()?;
        if self.check_kw("for") {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(Expr::Comprehension {
                kind: ComprehensionKind::Generator,
                element: Box::new(first),
                value: None,
                generators,
            });
        }
        if self.eat_op(")") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_op(")") {
                break;
            }
            items.push(self.parse_star_or_expression()?);
        }
        self.expect_op(")")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_op("]") {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.parse_star_or_expression()?;
        if self.check_kw("for") {
            let generators = self.parse_comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(Expr::Comprehension {
                kind: ComprehensionKind::List,
                element: Box::new(first),
                value: None,
                generators,
            });
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_op("]") {
                break;
            }
            items.push(self.parse_star_or_expression()?);
        }
        self.expect_op("]")?;
        Ok(Expr::List(items))
    }

    fn parse_brace(&mut self) -> Result<Expr, PredicateParseError> {
        if self.eat_op("}") {
            return Ok(Expr::Dict(Vec::new()));
        }

        let first_is_spread = self.eat_op("**");
        let first_key = if first_is_spread {
            None
        } else {
            Some(self.parse_star_or_expression()?)
        };

        let is_dict = first_is_spread || self.check_op(":");
        if !is_dict {
            let first = first_key.ok_or_else(|| self.unexpected())?;
            if self.check_kw("for") {
                let generators = self.parse_comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(Expr::Comprehension {
                    kind: ComprehensionKind::Set,
                    element: Box::new(first),
                    value: None,
                    generators,
                });
            }
            let mut items = vec![first];
            while self.eat_op(",") {
                if self.check_op("}") {
                    break;
                }
                items.push(self.parse_star_or_expression()?);
            }
            self.expect_op("}")?;
            return Ok(Expr::Set(items));
        }

        let first_entry = match first_key {
            Some(key) => {
                self.expect_op(":")?;
                let value = self.parse_expression()?;
                if self.check_kw("for") {
                    let generators = self.parse_comprehension_clauses()?;
                    self.expect_op("}")?;
                    return Ok(Expr::Comprehension {
                        kind: ComprehensionKind::Dict,
                        element: Box::new(key),
                        value: Some(Box::new(value)),
                        generators,
                    });
                }
                (Some(key), value)
            }
            None => (None, self.parse_bitor()?),
        };

        let mut entries = vec![first_entry];
        while self.eat_op(",") {
            if self.check_op("}") {
                break;
            }
            if self.eat_op("**") {
                entries.push((None, self.parse_bitor()?));
            } else {
                let key = self.parse_expression()?;
                self.expect_op(":")?;
                entries.push((Some(key), self.parse_expression()?));
            }
        }
        self.expect_op("}")?;
        Ok(Expr::Dict(entries))
    }
}

fn number_literal(raw: String) -> Literal {
    let lower = raw.to_lowercase();
    let is_radix = lower.starts_with("0x") || lower.starts_with("0o") || lower.starts_with("0b");
    if !is_radix && (lower.contains('.') || lower.contains('e') || lower.ends_with('j')) {
        Literal::Float(raw)
    } else {
        Literal::Int(raw)
    }
}
