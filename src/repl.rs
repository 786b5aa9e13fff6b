use crate::builtins::Builtins;
use crate::environment::Environment;
use crate::evaluator::Evaluator;
use crate::parser::parse;
use std::io::{self, Write};

const PROMPT: &str = ">> ";

/// Interactive loop over stdin/stdout with a fresh evaluator.
pub fn start() -> io::Result<()> {
    let mut evaluator = Evaluator::new(Builtins::standard());
    start_with(&mut evaluator, &Environment::new())
}

/// Interactive loop continuing from an existing environment.
pub fn start_with(evaluator: &mut Evaluator, env: &Environment) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "Kestrel v{}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Type 'exit' or press Ctrl+D to quit")?;
    writeln!(out)?;

    run_session(&mut out, evaluator, env)
}

/// Read-eval-print loop writing to `output`. Lines come from the
/// evaluator's own input, the stream `readline` also reads. Every line is
/// parsed and evaluated against the same `env`, so bindings persist
/// between lines.
pub fn run_session<W: Write>(
    output: &mut W,
    evaluator: &mut Evaluator,
    env: &Environment,
) -> io::Result<()> {
    loop {
        write!(output, "{}", PROMPT)?;
        output.flush()?;

        let mut line = String::new();
        if evaluator.io().read_line(&mut line)? == 0 {
            // EOF (Ctrl+D or end of piped input)
            writeln!(output)?;
            return Ok(());
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            return Ok(());
        }

        eval_line(line, output, evaluator, env)?;
    }
}

fn eval_line<W: Write>(
    line: &str,
    output: &mut W,
    evaluator: &mut Evaluator,
    env: &Environment,
) -> io::Result<()> {
    let (program, errors) = parse(line);
    if !errors.is_empty() {
        writeln!(output, "Encountered parser errors:")?;
        for error in &errors {
            writeln!(output, "\t{}", error)?;
        }
        return Ok(());
    }

    match evaluator.evaluate_program(&program, env) {
        Ok(Some(value)) => writeln!(output, "{}", value),
        Ok(None) => Ok(()),
        Err(error) => writeln!(output, "ERROR: {}", error),
    }
}
