//! Expression tree produced by the predicate parser.

/// A constant. Numbers keep their source spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer literal
    Int(String),
    /// Float or imaginary literal
    Float(String),
    /// String literal, adjacent pieces joined
    Str(String),
    /// `True` or `False`
    Bool(bool),
    /// `None`
    None,
    /// `...`
    Ellipsis,
}

/// Short-circuit boolean operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `not`
    Not,
    /// `-`
    Neg,
    /// `+`
    Pos,
    /// `~`
    Invert,
}

/// Arithmetic or bitwise operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `@`
    MatMul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `<<`
    LShift,
    /// `>>`
    RShift,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
}

/// Comparison operator; chains keep one per link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `is`
    Is,
    /// `is not`
    IsNot,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

/// Bracket style of a comprehension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComprehensionKind {
    /// `[x for ...]`
    List,
    /// `{x for ...}`
    Set,
    /// `{k: v for ...}`
    Dict,
    /// `(x for ...)`
    Generator,
}

/// One `for target in iter if cond...` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    /// Names bound per iteration
    pub target: Expr,
    /// Iterable
    pub iter: Expr,
    /// Filter conditions
    pub ifs: Vec<Expr>,
}

/// A `name=value` or `**mapping` call argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    /// `None` for `**mapping` arguments
    pub name: Option<String>,
    /// Argument value
    pub value: Expr,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare identifier
    Name(String),
    /// Literal value
    Constant(Literal),
    /// `a and b and ...`
    BoolOp {
        /// Operator shared by the chain
        op: BoolOp,
        /// Operands in order
        values: Vec<Expr>,
    },
    /// Prefix operation
    UnaryOp {
        /// Operator
        op: UnaryOp,
        /// Operand
        operand: Box<Expr>,
    },
    /// Infix arithmetic or bitwise operation
    BinOp {
        /// Left operand
        left: Box<Expr>,
        /// Operator
        op: BinOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// Comparison chain such as `0 <= i < n`
    Compare {
        /// First operand
        left: Box<Expr>,
        /// Operators, one per link
        ops: Vec<CmpOp>,
        /// Right-hand operands, one per link
        comparators: Vec<Expr>,
    },
    /// Function or method call
    Call {
        /// Callee
        func: Box<Expr>,
        /// Positional arguments, including `*args`
        args: Vec<Expr>,
        /// Keyword arguments, including `**kwargs`
        keywords: Vec<Keyword>,
    },
    /// `value.attr`
    Attribute {
        /// Object
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `value[index]`
    Subscript {
        /// Container
        value: Box<Expr>,
        /// Index, slice or tuple of them
        index: Box<Expr>,
    },
    /// `lower:upper:step` inside a subscript
    Slice {
        /// Start bound
        lower: Option<Box<Expr>>,
        /// End bound
        upper: Option<Box<Expr>>,
        /// Stride
        step: Option<Box<Expr>>,
    },
    /// `*value`
    Starred(Box<Expr>),
    /// Parenthesized or bare tuple
    Tuple(Vec<Expr>),
    /// List display
    List(Vec<Expr>),
    /// Set display
    Set(Vec<Expr>),
    /// `None` keys are `**mapping` spreads
    Dict(Vec<(Option<Expr>, Expr)>),
    /// `body if test else orelse`
    IfExp {
        /// Condition
        test: Box<Expr>,
        /// Value when true
        body: Box<Expr>,
        /// Value when false
        orelse: Box<Expr>,
    },
    /// `lambda params: body`
    Lambda {
        /// Parameter names
        params: Vec<String>,
        /// Default values for trailing parameters
        defaults: Vec<Expr>,
        /// Body expression
        body: Box<Expr>,
    },
    /// List, set, dict or generator comprehension
    Comprehension {
        /// Bracket style
        kind: ComprehensionKind,
        /// Element, or key for a dict
        element: Box<Expr>,
        /// Value expression of a dict comprehension
        value: Option<Box<Expr>>,
        /// `for` clauses in order
        generators: Vec<Comprehension>,
    },
}

impl Expr {
    /// Whether this is a bare literal
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Dotted rendering of a callee such as `math.sqrt`, when it is one.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(n) => Some(n.clone()),
            Self::Attribute { value, attr } => value.dotted_name().map(|base| format!("{base}.{attr}")),
            _ => None,
        }
    }

    /// Names bound by an assignment target (`x`, `(a, b)`, `[*rest]`).
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            Self::Name(n) => vec![n.clone()],
            Self::Tuple(items) | Self::List(items) => {
                items.iter().flat_map(Self::bound_names).collect()
            }
            Self::Starred(inner) => inner.bound_names(),
            _ => Vec::new(),
        }
    }
}
