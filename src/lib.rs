//! Core library for the Quill S-expression interpreter.
//! Source text is tokenized, parsed into a homoiconic expression tree and
//! evaluated against a chain of lexically scoped frames.

pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runtime;
pub mod sink;
mod stack;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, QuillError, SourceSpan};
pub use repl::Repl;
pub use runtime::{ExecutionContext, Interpreter};
pub use sink::{MemorySink, Sink, StdoutSink};
pub use value::Value;

/// Parses and evaluates `source` with a fresh interpreter, emitting the result to stdout.
pub fn run(source: &str) -> diagnostics::Result<Value> {
    Interpreter::new().run(source)
}
