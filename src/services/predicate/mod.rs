//! Predicate expression validation
//!
//! Predicates are later evaluated against real call arguments by the
//! executor, so this module only proves an expression is safe to hand over:
//! - a textual pre-filter for injection tokens
//! - a parser for a single Python-style expression
//! - a walk over the tree enforcing the call whitelist and forbidden node kinds
//!
//! Nothing here ever evaluates an expression.

pub mod ast;
mod lexer;
pub mod parser;
pub mod validator;

pub use parser::parse_expression;
pub use validator::{validate_expr, FORBIDDEN_TOKENS, SAFE_CALL_WHITELIST};

/// Why an expression could not be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredicateParseError {
    /// Malformed or unsupported expression
    #[error("{message} (column {column})")]
    Syntax {
        /// What went wrong
        message: String,
        /// 1-based column where it was detected
        column: usize,
    },

    /// Statement-level construct such as `import` or `def`
    #[error("forbidden syntax: {0}")]
    ForbiddenSyntax(&'static str),
}

impl PredicateParseError {
    /// Shorthand for [`PredicateParseError::Syntax`].
    pub fn syntax(message: impl Into<String>, column: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            column,
        }
    }
}
