use std::{mem, rc::Rc};

use crate::{
    ast::{self, Node},
    builtins::{self, Host},
    common::{Error, ErrorKind, Errors},
    environment::ScopeStack,
    token::TokenKind,
    value::{Arity, Builtin, Function, Value},
};

/// Why evaluation of a node stopped before producing a value.
#[derive(Debug)]
enum Unwind {
    /// `return`, carried up to the nearest function call.
    Return(Option<Value>),
    /// `break`, carried up to the nearest loop.
    Break,
    /// An error was recorded; the current top-level statement is abandoned.
    Fault,
}

type Flow = Result<Option<Value>, Unwind>;

#[derive(Debug)]
pub struct Evaluation {
    pub value: Option<Value>,
    pub errors: Errors,
}

#[derive(Debug)]
pub struct Interpreter {
    env: ScopeStack,
    host: Host,
    errors: Errors,

    loop_depth: usize,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new(host: Host, max_call_depth: usize) -> Self {
        Interpreter {
            env: ScopeStack::new(),
            host,
            errors: Errors::new(),
            loop_depth: 0,
            call_depth: 0,
            max_call_depth,
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Evaluates every top-level node of `package` in order. A node that
    /// fails is abandoned and evaluation goes on with the next one; the value
    /// of the last node is returned along with every error recorded.
    pub fn evaluate(&mut self, package: &ast::Package) -> Evaluation {
        let mut value = None;

        for node in &package.nodes {
            log::debug!("evaluating {} node at L{}", package.namespace, node.line());
            value = match self.eval_node(node) {
                Ok(value) | Err(Unwind::Return(value)) => value,
                Err(Unwind::Break) | Err(Unwind::Fault) => None,
            };

            self.loop_depth = 0;
            self.call_depth = 0;
        }

        Evaluation {
            value,
            errors: mem::take(&mut self.errors),
        }
    }

    fn fault(&mut self, line: usize, kind: ErrorKind) -> Unwind {
        self.errors.add(Error::new(line, kind));
        Unwind::Fault
    }

    /// Runs `f` inside a fresh scope that is popped however `f` exits.
    fn scoped<F>(&mut self, f: F) -> Flow
    where
        F: FnOnce(&mut Self) -> Flow,
    {
        self.env.nest();
        let result = f(self);
        self.env.unnest();
        result
    }

    fn eval_node(&mut self, node: &Node) -> Flow {
        match node {
            Node::Integer(node) => Ok(Some(Value::Integer(node.value))),
            Node::String(node) => Ok(Some(Value::String(node.value.clone()))),
            Node::Boolean(node) => Ok(Some(Value::Boolean(node.value))),

            Node::Identifier(ident) => self.lookup(ident).map(Some),
            Node::Variable(variable) => {
                self.env.insert(variable.name.name.clone(), Value::Null);
                Ok(None)
            }
            Node::Assign(assign) => self.eval_assign(assign),
            Node::Prefix(prefix) => self.eval_prefix(prefix),
            Node::Infix(infix) => self.eval_infix(infix),
            Node::FuncCall(call) => self.eval_call(call),

            Node::Block(block) => self.eval_block(block),
            Node::Conditional(conditional) => self.eval_conditional(conditional),
            Node::Loop(node) => self.eval_loop(node),
            Node::Function(function) => {
                log::debug!("declared function {}", function.name);
                self.env.insert(
                    function.name.name.clone(),
                    Value::Function(Rc::new(Function::from_node(function))),
                );
                Ok(None)
            }
            Node::Return(ret) => {
                let value = self.eval_node(&ret.value)?;
                Err(Unwind::Return(value))
            }
            Node::Break(_) => Err(Unwind::Break),
        }
    }

    /// Like `eval_node` but the node has to produce a value.
    fn eval_value(&mut self, node: &Node) -> Result<Value, Unwind> {
        match self.eval_node(node)? {
            Some(value) => Ok(value),
            None => Err(self.fault(node.line(), ErrorKind::MissingValue)),
        }
    }

    fn lookup(&mut self, ident: &ast::Identifier) -> Result<Value, Unwind> {
        if let Some(value) = self.env.get(&ident.name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = builtins::lookup(&ident.name) {
            return Ok(Value::Builtin(builtin));
        }

        Err(self.fault(
            ident.token.line,
            ErrorKind::IdentNotFound(ident.name.clone()),
        ))
    }

    fn eval_assign(&mut self, assign: &ast::Assign) -> Flow {
        let name = match assign.left.as_ref() {
            Node::Identifier(ident) => {
                self.lookup(ident)?;
                &ident.name
            }
            Node::Variable(variable) => {
                self.eval_node(&assign.left)?;
                &variable.name.name
            }
            other => return Err(self.fault(other.line(), ErrorKind::IllegalOperation)),
        };

        let value = self.eval_node(&assign.right)?.unwrap_or(Value::Null);
        if !self.env.assign(name, value) {
            log::debug!("assignment to {} dropped, no such binding", name);
        }

        Ok(None)
    }

    fn eval_prefix(&mut self, prefix: &ast::Prefix) -> Flow {
        let right = self.eval_value(&prefix.right)?;
        let line = prefix.token.line;

        let value = match (prefix.token.kind, right) {
            (TokenKind::Bang, Value::Boolean(boolean)) => Value::Boolean(!boolean),
            (TokenKind::Plus, Value::Integer(integer)) => Value::Integer(integer),
            (TokenKind::Minus, Value::Integer(integer)) => match integer.checked_neg() {
                Some(negated) => Value::Integer(negated),
                None => return Err(self.fault(line, ErrorKind::IntegerOverflow)),
            },
            _ => return Err(self.fault(line, ErrorKind::InvalidOperator)),
        };

        Ok(Some(value))
    }

    fn eval_infix(&mut self, infix: &ast::Infix) -> Flow {
        let left = self.eval_value(&infix.left)?;
        let right = self.eval_value(&infix.right)?;
        let op = infix.token.kind;

        let result = match (&left, &right) {
            (Value::Integer(left), Value::Integer(right)) => integer_infix(op, *left, *right),
            (Value::String(left), Value::String(right)) => string_infix(op, left, right),
            (Value::Boolean(left), Value::Boolean(right)) => boolean_infix(op, *left, *right),
            _ if mem::discriminant(&left) == mem::discriminant(&right) => {
                Err(ErrorKind::InvalidOperator)
            }
            _ => Err(ErrorKind::InvalidCombination),
        };

        match result {
            Ok(value) => Ok(Some(value)),
            Err(kind) => Err(self.fault(infix.token.line, kind)),
        }
    }

    /// Evaluates the statements of `block` in a new scope. A `break` with no
    /// loop around it in the current function ends the block with no value.
    fn eval_block(&mut self, block: &ast::Block) -> Flow {
        let result = self.scoped(|this| {
            let mut value = None;
            for node in &block.nodes {
                value = this.eval_node(node)?;
            }
            Ok(value)
        });

        match result {
            Err(Unwind::Break) if self.loop_depth == 0 => Ok(None),
            other => other,
        }
    }

    fn eval_conditional(&mut self, conditional: &ast::Conditional) -> Flow {
        match self.eval_node(&conditional.condition)? {
            Some(Value::Boolean(true)) => self.eval_block(&conditional.then_block),
            Some(Value::Boolean(false)) => match &conditional.else_block {
                Some(else_block) => self.eval_block(else_block),
                None => Ok(None),
            },
            _ => Err(self.fault(conditional.condition.line(), ErrorKind::ExpectedBoolean)),
        }
    }

    fn eval_loop(&mut self, node: &ast::Loop) -> Flow {
        self.loop_depth += 1;

        let result = self.scoped(|this| {
            if let Some(init) = &node.init {
                this.eval_node(init)?;
            }

            loop {
                match this.eval_node(&node.condition)? {
                    Some(Value::Boolean(true)) => {}
                    Some(Value::Boolean(false)) => break,
                    _ => {
                        return Err(this.fault(node.condition.line(), ErrorKind::ExpectedBoolean))
                    }
                }

                match this.eval_block(&node.body) {
                    Ok(_) => {}
                    Err(Unwind::Break) => break,
                    Err(unwind) => return Err(unwind),
                }

                if let Some(iter) = &node.iter {
                    this.eval_node(iter)?;
                }
            }

            Ok(None)
        });

        self.loop_depth -= 1;
        result
    }

    fn eval_call(&mut self, call: &ast::FuncCall) -> Flow {
        let line = call.token.line;

        let ident = match call.callee.as_ref() {
            Node::Identifier(ident) => ident,
            other => return Err(self.fault(line, ErrorKind::NotCallable(other.to_string()))),
        };

        match self.lookup(ident)? {
            Value::Function(function) => self.call_function(line, &function, &call.args),
            Value::Builtin(builtin) => self.call_builtin(line, &builtin, &call.args),
            _ => Err(self.fault(line, ErrorKind::NotCallable(ident.name.clone()))),
        }
    }

    fn eval_args(&mut self, args: &[Node]) -> Result<Vec<Value>, Unwind> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_node(arg)?.unwrap_or(Value::Null));
        }
        Ok(values)
    }

    fn call_function(&mut self, line: usize, function: &Function, args: &[Node]) -> Flow {
        if function.params.len() != args.len() {
            return Err(self.fault(
                line,
                ErrorKind::ArityMismatch {
                    expected: function.params.len(),
                    found: args.len(),
                },
            ));
        }
        if self.call_depth >= self.max_call_depth {
            let limit = self.max_call_depth;
            return Err(self.fault(line, ErrorKind::CallDepthExceeded(limit)));
        }

        let args = self.eval_args(args)?;
        log::debug!("calling {} with {} arguments", function.name, args.len());

        let loop_depth = mem::replace(&mut self.loop_depth, 0);
        self.call_depth += 1;

        let result = self.scoped(|this| {
            for (param, arg) in function.params.iter().zip(args) {
                this.env.insert(param.clone(), arg);
            }
            this.eval_block(&function.body)
        });

        self.call_depth -= 1;
        self.loop_depth = loop_depth;

        match result {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Break) => Ok(None),
            Err(Unwind::Fault) => Err(Unwind::Fault),
        }
    }

    fn call_builtin(&mut self, line: usize, builtin: &Builtin, args: &[Node]) -> Flow {
        if let Arity::Fixed(expected) = builtin.arity {
            if expected != args.len() {
                return Err(self.fault(
                    line,
                    ErrorKind::ArityMismatch {
                        expected,
                        found: args.len(),
                    },
                ));
            }
        }

        let values = self.eval_args(args)?;
        log::debug!("calling builtin {} with {} arguments", builtin.name, values.len());

        let result = match (builtin.func)(&mut self.host, values) {
            Ok(result) => result,
            Err(kind) => return Err(self.fault(line, kind)),
        };

        if builtin.writes_back {
            if let (Some(Node::Identifier(target)), Some(value)) = (args.first(), &result) {
                self.env.assign(&target.name, value.clone());
            }
        }

        Ok(result)
    }
}

fn checked(result: Option<i64>) -> Result<Value, ErrorKind> {
    result.map(Value::Integer).ok_or(ErrorKind::IntegerOverflow)
}

fn integer_infix(op: TokenKind, left: i64, right: i64) -> Result<Value, ErrorKind> {
    match op {
        TokenKind::Plus => checked(left.checked_add(right)),
        TokenKind::Minus => checked(left.checked_sub(right)),
        TokenKind::Star => checked(left.checked_mul(right)),
        TokenKind::Slash if right == 0 => Err(ErrorKind::DivisionByZero),
        TokenKind::Slash => checked(left.checked_div(right)),
        TokenKind::Lesser => Ok(Value::Boolean(left < right)),
        TokenKind::Greater => Ok(Value::Boolean(left > right)),
        TokenKind::LesserEqual => Ok(Value::Boolean(left <= right)),
        TokenKind::GreaterEqual => Ok(Value::Boolean(left >= right)),
        TokenKind::EqualEqual => Ok(Value::Boolean(left == right)),
        TokenKind::BangEqual => Ok(Value::Boolean(left != right)),
        _ => Err(ErrorKind::InvalidOperator),
    }
}

// strings only concatenate; comparing them is not supported
fn string_infix(op: TokenKind, left: &str, right: &str) -> Result<Value, ErrorKind> {
    match op {
        TokenKind::Plus => Ok(Value::String(format!("{}{}", left, right))),
        _ => Err(ErrorKind::InvalidOperator),
    }
}

fn boolean_infix(op: TokenKind, left: bool, right: bool) -> Result<Value, ErrorKind> {
    match op {
        TokenKind::EqualEqual => Ok(Value::Boolean(left == right)),
        TokenKind::BangEqual => Ok(Value::Boolean(left != right)),
        _ => Err(ErrorKind::InvalidOperator),
    }
}
