//! DPL Library
//!
//! A small embeddable, dynamically typed scripting language: source text is
//! tokenized, parsed into a node tree and evaluated against a namespace of
//! host-supplied values.

pub mod ast;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod util;

use std::collections::HashMap;

pub use ast::{Node, Span};
pub use error::{CompileError, Error, Result};
pub use interp::{RuntimeError, Value};

/// Tokenize and parse `source` into a program tree
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn compile(source: &str) -> Result<Node> {
    let tokens = lexer::tokenize(source)?;
    parser::parse(tokens)
}

/// Compile and execute `source` with the built-ins plus `bindings` in scope
pub fn run(source: &str, bindings: HashMap<String, Value>) -> std::result::Result<Value, Error> {
    let program = compile(source)?;
    Ok(interp::exec(&program, bindings)?)
}
