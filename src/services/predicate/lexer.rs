//! Tokenizer for predicate expressions.

use super::PredicateParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number(String),
    Str(String),
    Op(&'static str),
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based character column of the first character
    pub column: usize,
}

impl Token {
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Name(n) | TokenKind::Number(n) => format!("'{n}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Op(op) => format!("'{op}'"),
            TokenKind::End => "end of expression".to_string(),
        }
    }
}

/// Longest operators first so that greedy matching picks `**` over `*`.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":=",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, PredicateParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let column = self.pos + 1;
            let Some(c) = self.peek(0) else {
                tokens.push(Token {
                    kind: TokenKind::End,
                    column,
                });
                return Ok(tokens);
            };

            let kind = if let Some(prefix_len) = self.string_prefix_len() {
                self.lex_string(prefix_len, column)?
            } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) {
                self.lex_number(column)?
            } else if c == '_' || c.is_alphabetic() {
                self.lex_name()
            } else if let Some(op) = self.match_operator() {
                self.pos += op.chars().count();
                TokenKind::Op(op)
            } else {
                return Err(PredicateParseError::syntax(
                    format!("invalid character '{c}'"),
                    column,
                ));
            };
            tokens.push(Token { kind, column });
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '#' {
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else if c == '\\' && self.peek(1) == Some('\n') {
                self.pos += 2;
            } else if c.is_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn match_operator(&self) -> Option<&'static str> {
        OPERATORS.iter().copied().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, oc)| self.peek(i) == Some(oc))
        })
    }

    /// Length of a string prefix (`r`, `b`, `f`, `rb`, ...) when one starts here.
    fn string_prefix_len(&self) -> Option<usize> {
        let mut len = 0;
        while len < 2 && self.peek(len).is_some_and(|c| "rRbBuUfF".contains(c)) {
            len += 1;
        }
        for candidate in (0..=len).rev() {
            if matches!(self.peek(candidate), Some('\'' | '"')) {
                let prefix: String = self.chars[self.pos..self.pos + candidate]
                    .iter()
                    .collect::<String>()
                    .to_lowercase();
                let valid = matches!(
                    prefix.as_str(),
                    "" | "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
                );
                return valid.then_some(candidate);
            }
        }
        None
    }

    fn lex_string(&mut self, prefix_len: usize, column: usize) -> Result<TokenKind, PredicateParseError> {
        let prefix: String = self.chars[self.pos..self.pos + prefix_len]
            .iter()
            .collect::<String>()
            .to_lowercase();
        if prefix.contains('f') {
            return Err(PredicateParseError::ForbiddenSyntax("FormattedString"));
        }
        self.pos += prefix_len;

        let quote = self.peek(0).unwrap_or('"');
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        let mut value = String::new();
        loop {
            let Some(c) = self.peek(0) else {
                return Err(PredicateParseError::syntax("unterminated string literal", column));
            };
            if c == '\\' {
                if let Some(next) = self.peek(1) {
                    value.push(c);
                    value.push(next);
                    self.pos += 2;
                    continue;
                }
            }
            if c == quote {
                if !triple {
                    self.pos += 1;
                    return Ok(TokenKind::Str(value));
                }
                if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.pos += 3;
                    return Ok(TokenKind::Str(value));
                }
            }
            if c == '\n' && !triple {
                return Err(PredicateParseError::syntax("unterminated string literal", column));
            }
            value.push(c);
            self.pos += 1;
        }
    }

    fn lex_number(&mut self, column: usize) -> Result<TokenKind, PredicateParseError> {
        let start = self.pos;
        let radix_prefixed = self.peek(0) == Some('0')
            && self.peek(1).is_some_and(|c| "xXoObB".contains(c));

        if radix_prefixed {
            self.pos += 2;
            while self.peek(0).is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.pos += 1;
            }
        } else {
            self.eat_digits();
            if self.peek(0) == Some('.')
                && !self.peek(1).is_some_and(|c| c.is_alphabetic() || c == '_' || c == '.')
            {
                self.pos += 1;
                self.eat_digits();
            }
            if self.peek(0).is_some_and(|c| c == 'e' || c == 'E') {
                let sign = usize::from(self.peek(1).is_some_and(|c| c == '+' || c == '-'));
                if self.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1 + sign;
                    self.eat_digits();
                }
            }
            if self.peek(0).is_some_and(|c| c == 'j' || c == 'J') {
                self.pos += 1;
            }
        }

        if self.peek(0).is_some_and(|c| c.is_alphanumeric() || c == '_') {
            return Err(PredicateParseError::syntax("invalid number literal", column));
        }
        Ok(TokenKind::Number(self.chars[start..self.pos].iter().collect()))
    }

    fn eat_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.pos += 1;
        }
    }

    fn lex_name(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c == '_' || c.is_alphanumeric()) {
            self.pos += 1;
        }
        TokenKind::Name(self.chars[start..self.pos].iter().collect())
    }
}
