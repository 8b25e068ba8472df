//! Expression and statement nodes

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A node of the program tree. Statements and expressions share one type:
/// every node evaluates to a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Integer literal
    Int(i64),
    /// Real literal
    Real(f64),
    /// Text literal
    Text(String),
    /// Boolean literal
    Bool(bool),
    /// `null`
    Null,

    /// Array constructor: `[a, b, c]`
    Array(Vec<Node>),
    /// Object constructor: `{key: value, ...}`
    Object(Vec<(Node, Node)>),

    /// Variable reference
    Ident(String),

    /// Binary operation
    Binary {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Unary operation
    Unary { op: UnOp, operand: Box<Node> },

    /// Element access: `target[index]`
    Index { target: Box<Node>, index: Box<Node> },

    /// Variable creation in the current scope: `target := value`
    Create { target: Box<Node>, value: Box<Node> },

    /// Assignment: `target = value`
    Set { target: Box<Node>, value: Box<Node> },

    /// Statement sequence evaluated in the enclosing scope
    Block(Vec<Node>),

    /// `if cond {..} elif cond {..} else {..}`
    If {
        branches: Vec<Branch>,
        otherwise: Option<Box<Node>>,
    },

    /// `for r1[, r2] in source {..}`
    For {
        recipients: Vec<Node>,
        source: Box<Node>,
        body: Box<Node>,
    },

    /// Call: `callee(args...)`
    Call { callee: Box<Node>, args: Vec<Node> },

    /// `return value`
    Return(Box<Node>),

    /// Function literal: `(params...) -> {body}`.
    /// The body is shared with every closure created from this literal.
    Function { params: Vec<Node>, body: Rc<Node> },
}

/// One `if`/`elif` arm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub cond: Node,
    pub body: Node,
}

impl Node {
    pub fn ident(name: impl Into<String>) -> Self {
        Node::Ident(name.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn binary(op: BinOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn index(target: Node, index: Node) -> Self {
        Node::Index {
            target: Box::new(target),
            index: Box::new(index),
        }
    }

    pub fn create(target: Node, value: Node) -> Self {
        Node::Create {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn set(target: Node, value: Node) -> Self {
        Node::Set {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn call(callee: Node, args: Vec<Node>) -> Self {
        Node::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn ret(value: Node) -> Self {
        Node::Return(Box::new(value))
    }

    pub fn for_in(recipients: Vec<Node>, source: Node, body: Node) -> Self {
        Node::For {
            recipients,
            source: Box::new(source),
            body: Box::new(body),
        }
    }

    pub fn function(params: Vec<Node>, body: Node) -> Self {
        Node::Function {
            params,
            body: Rc::new(body),
        }
    }

    /// Returns the identifier name if this node is a bare identifier
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Node::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    /// Text concatenation `||`
    Concat,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Concat => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        })
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "unary -"),
            UnOp::Not => write!(f, "not"),
        }
    }
}
