// Kestrel Language Interpreter Library
//
// Core of the Kestrel interpreter: a small dynamically-typed scripting
// language with closures, arrays and hashes, evaluated by walking the
// syntax tree.

// Public modules
pub mod ast;
pub mod builtins;
pub mod config;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

// Re-export commonly used items
pub use ast::{BlockStatement, Expression, Identifier, Program, Statement};
pub use builtins::{Builtin, Builtins, Io};
pub use config::Config;
pub use environment::{Environment, WeakEnvironment};
pub use error::{KestrelError, RuntimeError, Span};
pub use evaluator::{Evaluator, Signal};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{parse, Parser};
pub use value::{HashKey, Value};

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
