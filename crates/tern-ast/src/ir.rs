//! Target AST definitions
//!
//! Trees are plain owned values. Passes read an input tree by reference and
//! build a new one; nothing here is shared between two parents.

use std::fmt;

use serde::{Deserialize, Serialize};
use tern_diagnostics::Span;

/// An identifier: local name, method name or goto label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ident(pub String);

/// Goto target.
pub type Label = Ident;

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Ident(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Ident(name.to_string())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Types as written in the target language
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    Void,
    Bool,
    Int,
    Float,
    String,
    /// `object`, the universal top type
    Object,
    /// A class or interface
    Class(String),
    /// A type parameter
    Param(String),
    Generic { base: String, args: Vec<TargetType> },
    Array(Box<TargetType>),
    /// Native nullable sugar (`int?`)
    Nullable(Box<TargetType>),
    /// Generic wrapper (`Optional<T>`), uniform over value and reference types
    Optional(Box<TargetType>),
}

impl TargetType {
    pub fn optional(inner: TargetType) -> Self {
        TargetType::Optional(Box::new(inner))
    }

    /// The universal top type, the destination of identity and type tests.
    pub fn is_top(&self) -> bool {
        matches!(self, TargetType::Object)
    }

    pub fn is_wrapper(&self) -> bool {
        matches!(self, TargetType::Optional(_))
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Void => write!(f, "void"),
            TargetType::Bool => write!(f, "bool"),
            TargetType::Int => write!(f, "int"),
            TargetType::Float => write!(f, "double"),
            TargetType::String => write!(f, "string"),
            TargetType::Object => write!(f, "object"),
            TargetType::Class(name) | TargetType::Param(name) => write!(f, "{}", name),
            TargetType::Generic { base, args } => {
                write!(f, "{}<", base)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            TargetType::Array(elem) => write!(f, "{}[]", elem),
            TargetType::Nullable(inner) => write!(f, "{}?", inner),
            TargetType::Optional(inner) => write!(f, "Optional<{}>", inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A method declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: Ident,
    pub visibility: Visibility,
    #[serde(default)]
    pub is_static: bool,
    pub params: Vec<ParamDecl>,
    pub ret: TargetType,
    pub body: Block,
    #[serde(default)]
    pub span: Span,
}

/// A method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: Ident,
    pub ty: TargetType,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TargetType) -> Self {
        Self {
            name: Ident::new(name),
            ty,
        }
    }
}

/// An ordered sequence of statements
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    #[serde(default)]
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self {
            stmts,
            span: Span::DUMMY,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

/// A statement with its source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    #[serde(default)]
    pub span: Span,
}

/// Statement kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Nested block `{ ... }`
    Block(Block),
    If {
        test: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    /// try/catch/finally; every clause is a block
    Try(TryStmt),
    /// `label: stmt`
    Labeled {
        label: Label,
        body: Box<Stmt>,
    },
    Goto(Label),
    Break,
    Continue,
    Expr(Expr),
    /// Local variable declaration
    Local(LocalDecl),
    Return(Option<Expr>),
    /// Suspension point (`yield` / `await`)
    Yield(Suspension),
    Throw(Expr),
    /// Local method declaration
    Method(Box<MethodDecl>),
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
}

/// try/catch/finally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryStmt {
    pub body: Block,
    pub catch: Option<Block>,
    pub finally: Option<Block>,
}

/// Local variable declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: Ident,
    pub ty: TargetType,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuspendKind {
    /// Generator `yield`
    Yield,
    /// Coroutine `await`
    Await,
}

/// A suspension point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspension {
    pub kind: SuspendKind,
    pub value: Option<Expr>,
}

/// A case in a switch statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// None for the default case
    pub test: Option<Expr>,
    pub body: Block,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::DUMMY,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn block(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::Block(Block::new(stmts)))
    }

    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    pub fn local(name: impl Into<String>, ty: TargetType, init: Option<Expr>) -> Self {
        Self::new(StmtKind::Local(LocalDecl {
            name: Ident::new(name),
            ty,
            init,
        }))
    }

    pub fn goto(label: Label) -> Self {
        Self::new(StmtKind::Goto(label))
    }

    pub fn labeled(label: Label, body: Stmt) -> Self {
        Self::new(StmtKind::Labeled {
            label,
            body: Box::new(body),
        })
    }

    pub fn if_else(test: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Self::new(StmtKind::If {
            test,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn while_loop(test: Expr, body: Stmt) -> Self {
        Self::new(StmtKind::While {
            test,
            body: Box::new(body),
        })
    }

    pub fn try_stmt(body: Block, catch: Option<Block>, finally: Option<Block>) -> Self {
        Self::new(StmtKind::Try(TryStmt {
            body,
            catch,
            finally,
        }))
    }

    pub fn yield_value(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Yield(Suspension {
            kind: SuspendKind::Yield,
            value,
        }))
    }

    pub fn await_value(value: Expr) -> Self {
        Self::new(StmtKind::Yield(Suspension {
            kind: SuspendKind::Await,
            value: Some(value),
        }))
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    pub fn throw(value: Expr) -> Self {
        Self::new(StmtKind::Throw(value))
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match &self.kind {
            StmtKind::Block(_) => "block",
            StmtKind::If { .. } => "if statement",
            StmtKind::While { .. } => "while loop",
            StmtKind::Try(_) => "try statement",
            StmtKind::Labeled { .. } => "labeled statement",
            StmtKind::Goto(_) => "goto",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
            StmtKind::Expr(_) => "expression statement",
            StmtKind::Local(_) => "local declaration",
            StmtKind::Return(_) => "return",
            StmtKind::Yield(_) => "suspension point",
            StmtKind::Throw(_) => "throw",
            StmtKind::Method(_) => "method declaration",
            StmtKind::Switch { .. } => "switch statement",
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    Str(String),

    // Variables
    Local(Ident),
    Assign {
        target: Ident,
        value: Box<Expr>,
    },
    This,

    // Calls
    Call {
        callee: Ident,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },

    // Operators
    Not(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    // Type operations
    /// Checked cast `(ty)value`
    Cast {
        ty: TargetType,
        value: Box<Expr>,
    },
    /// Runtime type test `value is ty`
    Is {
        value: Box<Expr>,
        ty: TargetType,
    },

    // Optional<T> wrapper
    /// `Optional<ty>.Some(value)`; a null value wraps to none
    Wrap {
        ty: TargetType,
        value: Box<Expr>,
    },
    /// `Optional<ty>.None`
    WrapNone(TargetType),
    /// Native form of a wrapped value, typed `ty`
    Unwrap {
        ty: TargetType,
        value: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Lt,
    Eq,
    And,
    Or,
}

impl Expr {
    pub fn local(name: impl Into<String>) -> Self {
        Expr::Local(Ident::new(name))
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Ident::new(callee),
            args,
        }
    }

    pub fn assign(target: Ident, value: Expr) -> Self {
        Expr::Assign {
            target,
            value: Box::new(value),
        }
    }

    pub fn not(value: Expr) -> Self {
        Expr::Not(Box::new(value))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Literals and bare locals cannot throw when evaluated.
    pub fn is_trivial(&self) -> bool {
        matches!(
            self,
            Expr::Null | Expr::Bool(_) | Expr::Int(_) | Expr::Str(_) | Expr::Local(_)
        )
    }
}
