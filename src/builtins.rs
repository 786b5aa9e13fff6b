use crate::error::RuntimeError;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

pub type BuiltinFn = fn(&mut Io, &[Value]) -> Result<Value, RuntimeError>;

/// A native function exposed to scripts under a fixed name.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub function: BuiltinFn,
}

impl Builtin {
    pub fn call(&self, io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.function)(io, args)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

/// Console streams the I/O builtins talk to.
///
/// The REPL reads its own lines through the same reader, so input that
/// `readline` consumes is never seen as a command and vice versa.
pub struct Io {
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Io {
    pub fn new(output: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        Self { output, input }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::stdout()),
            Box::new(io::BufReader::new(io::stdin())),
        )
    }

    /// Append the next input line, terminator included, to `buf`. Returns
    /// 0 at end of input.
    pub fn read_line(&mut self, buf: &mut String) -> io::Result<usize> {
        self.input.read_line(buf)
    }
}

/// Name to native function table, consulted before user bindings.
#[derive(Debug, Clone, Default)]
pub struct Builtins {
    table: HashMap<&'static str, Builtin>,
}

impl Builtins {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn standard() -> Self {
        let mut builtins = Self::empty();
        builtins.register("len", len);
        builtins.register("first", first);
        builtins.register("last", last);
        builtins.register("rest", rest);
        builtins.register("push", push);
        builtins.register("puts", puts);
        builtins.register("readline", readline);
        builtins.register("readfile", readfile);
        builtins
    }

    pub fn register(&mut self, name: &'static str, function: BuiltinFn) {
        self.table.insert(name, Builtin { name, function });
    }

    pub fn get(&self, name: &str) -> Option<Builtin> {
        self.table.get(name).copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

fn check_arity(args: &[Value], want: usize) -> Result<(), RuntimeError> {
    if args.len() != want {
        return Err(RuntimeError::new(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        )));
    }
    Ok(())
}

fn expect_array<'a>(name: &str, value: &'a Value) -> Result<&'a Rc<Vec<Value>>, RuntimeError> {
    match value {
        Value::Array(elements) => Ok(elements),
        other => Err(RuntimeError::new(format!(
            "argument to '{}' must be an ARRAY. got={}",
            name,
            other.type_name()
        ))),
    }
}

fn len(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(elements) => Ok(Value::Integer(elements.len() as i64)),
        other => Err(RuntimeError::new(format!(
            "argument to 'len' not supported. got={}",
            other.type_name()
        ))),
    }
}

fn first(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    let elements = expect_array("first", &args[0])?;
    Ok(elements.first().cloned().unwrap_or(Value::Null))
}

fn last(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    let elements = expect_array("last", &args[0])?;
    Ok(elements.last().cloned().unwrap_or(Value::Null))
}

fn rest(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    let elements = expect_array("rest", &args[0])?;
    match elements.split_first() {
        Some((_, tail)) => Ok(Value::from(tail.to_vec())),
        None => Ok(Value::Null),
    }
}

/// Returns a new array; the argument is left untouched.
fn push(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 2)?;
    let elements = expect_array("push", &args[0])?;
    let mut pushed = Vec::with_capacity(elements.len() + 1);
    pushed.extend(elements.iter().cloned());
    pushed.push(args[1].clone());
    Ok(Value::from(pushed))
}

fn puts(io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    for arg in args {
        writeln!(io.output, "{}", arg)
            .map_err(|e| RuntimeError::new(format!("could not write output: {}", e)))?;
    }
    io.output
        .flush()
        .map_err(|e| RuntimeError::new(format!("could not write output: {}", e)))?;
    Ok(Value::Null)
}

fn readline(io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 0)?;
    let mut line = String::new();
    io.read_line(&mut line)
        .map_err(|e| RuntimeError::new(format!("could not read input: {}", e)))?;
    let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
    line.truncate(trimmed);
    Ok(Value::String(line))
}

fn readfile(_io: &mut Io, args: &[Value]) -> Result<Value, RuntimeError> {
    check_arity(args, 1)?;
    let path = match &args[0] {
        Value::String(path) => path,
        other => {
            return Err(RuntimeError::new(format!(
                "argument to 'readfile' must be a STRING. got={}",
                other.type_name()
            )))
        }
    };
    tracing::debug!(path = %path, "readfile");
    fs::read_to_string(path)
        .map(Value::String)
        .map_err(|e| RuntimeError::new(format!("could not read file '{}': {}", path, e)))
}
