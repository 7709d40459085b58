use std::{fmt, rc::Rc};

use crate::{ast, builtins::Host, common::ErrorKind};

pub type NativeFn = fn(&mut Host, Vec<Value>) -> Result<Option<Value>, ErrorKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

/// A user function. It holds no environment; a call scope is pushed on top
/// of whatever scopes are live at the call site.
#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: ast::Block,
}

impl Function {
    pub fn from_node(node: &ast::Function) -> Self {
        Function {
            name: node.name.name.clone(),
            params: node.params.iter().map(|param| param.name.clone()).collect(),
            body: node.body.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
    /// The result is also stored in the variable passed as first argument.
    pub writes_back: bool,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("writes_back", &self.writes_back)
            .field("func", &"<function pointer>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    String(String),
    Function(Rc<Function>),
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(boolean) => write!(f, "{}", boolean),
            Value::Integer(integer) => write!(f, "{}", integer),
            Value::String(string) => f.write_str(string),
            Value::Function(_) => f.write_str("function"),
            Value::Builtin(_) => f.write_str("builtin function"),
        }
    }
}

impl From<bool> for Value {
    fn from(boolean: bool) -> Self {
        Value::Boolean(boolean)
    }
}

impl From<i64> for Value {
    fn from(integer: i64) -> Self {
        Value::Integer(integer)
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Value::String(string)
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        Value::String(string.to_string())
    }
}
