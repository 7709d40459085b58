//! `eldr`, a small interpreted language.
//!
//! Source is lexed and parsed into a [`ast::Package`], which is then walked by
//! the [`interpreter::Interpreter`]. Both stages collect their diagnostics in
//! an [`Errors`] list instead of stopping at the first problem. A [`Session`]
//! ties the stages together and keeps global bindings alive between runs,
//! which is what the REPL relies on.

pub mod ast;
pub mod builtins;
pub mod common;
pub mod config;
pub mod environment;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

use std::fmt;

pub use common::{Error, ErrorKind, Errors};
pub use config::Config;
pub use value::Value;

use builtins::Host;
use interpreter::{Evaluation, Interpreter};

/// Result of running one piece of source through a [`Session`].
#[derive(Debug)]
pub enum Outcome {
    /// The source did not parse; nothing was evaluated.
    ParseErrors(Errors),
    RuntimeErrors(Errors),
    Value(Option<Value>),
}

impl Outcome {
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            Outcome::ParseErrors(errors) | Outcome::RuntimeErrors(errors) => Some(errors),
            Outcome::Value(_) => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::ParseErrors(errors) | Outcome::RuntimeErrors(errors) => {
                write!(f, "{}", errors.to_string().trim_end())
            }
            Outcome::Value(Some(value)) => write!(f, "{}", value),
            Outcome::Value(None) => Ok(()),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_host(config, Host::new())
    }

    /// Builds a session whose builtins read from and write to `host`.
    pub fn with_host(config: Config, host: Host) -> Self {
        let interpreter = Interpreter::new(host, config.max_call_depth);
        Session {
            config,
            interpreter,
        }
    }

    pub fn host(&self) -> &Host {
        self.interpreter.host()
    }

    pub fn parse(&self, source: &str) -> (ast::Package, Errors) {
        parser::parse_package(source, &self.config.namespace)
    }

    pub fn evaluate(&mut self, package: &ast::Package) -> Evaluation {
        self.interpreter.evaluate(package)
    }

    /// Parses and evaluates `source`. Parse errors skip evaluation entirely.
    pub fn run(&mut self, source: &str) -> Outcome {
        let (package, errors) = self.parse(source);
        if !errors.is_empty() {
            return Outcome::ParseErrors(errors);
        }

        let evaluation = self.evaluate(&package);
        if !evaluation.errors.is_empty() {
            return Outcome::RuntimeErrors(evaluation.errors);
        }

        Outcome::Value(evaluation.value)
    }
}
