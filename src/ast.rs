use std::fmt;

use derive_more::From;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone)]
pub struct Identifier {
    pub token: Token,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IntegerLit {
    pub token: Token,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct StringLit {
    pub token: Token,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct BooleanLit {
    pub token: Token,
    pub value: bool,
}

/// `var name`, binding `name` to null in the current scope.
#[derive(Debug, Clone)]
pub struct Variable {
    pub token: Token,
    pub name: Identifier,
}

/// The left side is always an [`Identifier`] or a [`Variable`].
#[derive(Debug, Clone)]
pub struct Assign {
    pub token: Token,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

/// The operator is the kind of `token`.
#[derive(Debug, Clone)]
pub struct Prefix {
    pub token: Token,
    pub right: Box<Node>,
}

/// The operator is the kind of `token`.
#[derive(Debug, Clone)]
pub struct Infix {
    pub token: Token,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub token: Token,
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct Conditional {
    pub token: Token,
    pub condition: Box<Node>,
    pub then_block: Block,
    pub else_block: Option<Block>,
}

/// Bare `loop { }` has no init or iterator and a literal `true` condition.
#[derive(Debug, Clone)]
pub struct Loop {
    pub token: Token,
    pub init: Option<Box<Node>>,
    pub condition: Box<Node>,
    pub iter: Option<Box<Node>>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub token: Token,
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct FuncCall {
    pub token: Token,
    pub callee: Box<Node>,
    pub args: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct Return {
    pub token: Token,
    pub value: Box<Node>,
}

#[derive(Debug, Clone)]
pub struct Break {
    pub token: Token,
}

#[derive(Debug, Clone, From)]
pub enum Node {
    // literals
    Integer(IntegerLit),
    String(StringLit),
    Boolean(BooleanLit),

    Identifier(Identifier),
    Variable(Variable),
    Assign(Assign),
    Prefix(Prefix),
    Infix(Infix),
    FuncCall(FuncCall),

    // statements
    Block(Block),
    Conditional(Conditional),
    Loop(Loop),
    Function(Function),
    Return(Return),
    Break(Break),
}

impl Node {
    pub fn token(&self) -> &Token {
        match self {
            Node::Integer(node) => &node.token,
            Node::String(node) => &node.token,
            Node::Boolean(node) => &node.token,
            Node::Identifier(node) => &node.token,
            Node::Variable(node) => &node.token,
            Node::Assign(node) => &node.token,
            Node::Prefix(node) => &node.token,
            Node::Infix(node) => &node.token,
            Node::FuncCall(node) => &node.token,
            Node::Block(node) => &node.token,
            Node::Conditional(node) => &node.token,
            Node::Loop(node) => &node.token,
            Node::Function(node) => &node.token,
            Node::Return(node) => &node.token,
            Node::Break(node) => &node.token,
        }
    }

    pub fn line(&self) -> usize {
        self.token().line
    }

    /// Nodes printed over several lines that need no trailing `;`.
    fn is_compound(&self) -> bool {
        matches!(
            self,
            Node::Block(_) | Node::Conditional(_) | Node::Loop(_) | Node::Function(_)
        )
    }
}

impl BooleanLit {
    pub fn literal_true(line: usize) -> Self {
        BooleanLit {
            token: Token::new(TokenKind::True, line, "true"),
            value: true,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        for node in &self.nodes {
            let printed = node.to_string();
            let mut lines = printed.lines().peekable();
            while let Some(line) = lines.next() {
                if lines.peek().is_some() {
                    writeln!(f, "\t{}", line)?;
                } else {
                    writeln!(f, "\t{};", line)?;
                }
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Integer(node) => f.write_str(&node.token.literal),
            Node::String(node) => write!(f, "\"{}\"", node.value),
            Node::Boolean(node) => write!(f, "{}", node.value),
            Node::Identifier(node) => write!(f, "{}", node),
            Node::Variable(node) => write!(f, "{} {}", node.token.literal, node.name),
            Node::Assign(node) => write!(f, "{} = {}", node.left, node.right),
            Node::Prefix(node) => write!(f, "({}{})", node.token.literal, node.right),
            Node::Infix(node) => {
                write!(f, "({} {} {})", node.left, node.token.literal, node.right)
            }
            Node::FuncCall(node) => {
                let args = node
                    .args
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", node.callee, args)
            }
            Node::Block(node) => write!(f, "{}", node),
            Node::Conditional(node) => {
                write!(f, "if ({}) {}", node.condition, node.then_block)?;
                if let Some(else_block) = &node.else_block {
                    write!(f, " else {}", else_block)?;
                }
                Ok(())
            }
            Node::Loop(node) => {
                write!(f, "loop ")?;
                if let Some(init) = &node.init {
                    write!(f, "({}; {}; ", init, node.condition)?;
                    if let Some(iter) = &node.iter {
                        write!(f, "{}", iter)?;
                    }
                    write!(f, ") ")?;
                }
                write!(f, "{}", node.body)
            }
            Node::Function(node) => {
                let params = node
                    .params
                    .iter()
                    .map(|param| param.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "fun {}({}) {}", node.name, params, node.body)
            }
            Node::Return(node) => write!(f, "return {}", node.value),
            Node::Break(_) => f.write_str("break"),
        }
    }
}

/// One unit of parsed source, e.g. a single REPL statement or a whole file.
#[derive(Debug, Clone)]
pub struct Package {
    pub namespace: String,
    pub nodes: Vec<Node>,
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        for node in &self.nodes {
            if node.is_compound() {
                for line in node.to_string().lines() {
                    writeln!(f, "{}\t{}", i, line)?;
                    i += 1;
                }
            } else {
                writeln!(f, "{}\t{};", i, node)?;
                i += 1;
            }
        }
        Ok(())
    }
}
