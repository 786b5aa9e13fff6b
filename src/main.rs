use kestrel::{logging, repl, runner, Builtins, Config, Environment, Evaluator};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = Config::from_args();
    logging::init(&config.log_filter);

    let mut evaluator = Evaluator::new(Builtins::standard());
    let env = Environment::new();

    if let Some(path) = &config.file {
        if !run_file(path, &mut evaluator, &env) && !config.interactive {
            return ExitCode::FAILURE;
        }
    }

    if config.wants_repl() {
        if let Err(error) = repl::start_with(&mut evaluator, &env) {
            eprintln!("Error reading input: {}", error);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

fn run_file(path: &Path, evaluator: &mut Evaluator, env: &Environment) -> bool {
    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return false;
    }

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.to_string_lossy();
            runner::run_with(evaluator, env, &source, Some(filename.as_ref()))
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            false
        }
    }
}
