use crate::builtins::Builtins;
use crate::environment::Environment;
use crate::error::KestrelError;
use crate::evaluator::Evaluator;
use crate::parser::parse;

/// Parse and evaluate `source` once in `env`, discarding the result.
///
/// Parse errors stop the run before anything is evaluated and are all
/// returned; a runtime error comes back alone.
pub fn execute(
    evaluator: &mut Evaluator,
    env: &Environment,
    source: &str,
) -> Result<(), Vec<KestrelError>> {
    let (program, errors) = parse(source);
    if !errors.is_empty() {
        return Err(errors);
    }

    evaluator
        .evaluate_program(&program, env)
        .map(|_| ())
        .map_err(|error| vec![error])
}

/// Run a whole script in a fresh environment, reporting any diagnostics to
/// stderr. Returns whether the script ran to completion.
pub fn run(source: &str, filename: Option<&str>) -> bool {
    let mut evaluator = Evaluator::new(Builtins::standard());
    run_with(&mut evaluator, &Environment::new(), source, filename)
}

pub fn run_with(
    evaluator: &mut Evaluator,
    env: &Environment,
    source: &str,
    filename: Option<&str>,
) -> bool {
    match execute(evaluator, env, source) {
        Ok(()) => true,
        Err(errors) => {
            for error in &errors {
                report(error, source, filename);
            }
            false
        }
    }
}

fn report(error: &KestrelError, source: &str, filename: Option<&str>) {
    if let Err(io_error) = error.report(source, filename) {
        tracing::warn!(%io_error, "could not render diagnostic");
        eprintln!("{}", error);
    }
}
