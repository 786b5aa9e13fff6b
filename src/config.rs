use clap::{Arg, ArgAction, ArgMatches, Command};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

const DEFAULT_LOG_FILTER: &str = "warn";

/// How the binary was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Script to execute; `None` starts the REPL.
    pub file: Option<PathBuf>,
    /// Drop into the REPL, after the script if one was given.
    pub interactive: bool,
    /// `tracing` filter directive, e.g. `kestrel=debug`.
    pub log_filter: String,
}

impl Config {
    pub fn command() -> Command {
        Command::new("kestrel")
            .about("A tree-walking interpreter for the Kestrel scripting language")
            .arg(
                Arg::new("file")
                    .help("The script file to execute")
                    .value_name("FILE")
                    .value_parser(clap::value_parser!(PathBuf))
                    .index(1),
            )
            .arg(
                Arg::new("interactive")
                    .short('i')
                    .long("interactive")
                    .help("Start the REPL (after running FILE, if given)")
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new("log")
                    .long("log")
                    .value_name("FILTER")
                    .help("Log filter, overrides RUST_LOG (default: warn)"),
            )
    }

    pub fn from_args() -> Self {
        Self::from_matches(&Self::command().get_matches())
    }

    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Ok(Self::from_matches(&Self::command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let log_filter = matches
            .get_one::<String>("log")
            .cloned()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            file: matches.get_one::<PathBuf>("file").cloned(),
            interactive: matches.get_flag("interactive"),
            log_filter,
        }
    }

    /// The REPL runs when asked for, or when there is nothing else to do.
    pub fn wants_repl(&self) -> bool {
        self.interactive || self.file.is_none()
    }
}
