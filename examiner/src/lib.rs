//! A minimal unit-test harness.
//!
//! Test binaries register named tests grouped into scopes, optionally with
//! per-scope `before`/`after` hooks, and hand the [`Registry`] to the runner.
//! Assertions abort only the test that is currently running; the runner then
//! moves on to the next one.
//!
//! ```no_run
//! use examiner::{Registry, assertions::assert_equal_int};
//!
//! fn main() -> std::process::ExitCode {
//!     let config = examiner::init();
//!
//!     let mut registry = Registry::new();
//!     registry.test("math", "add", || assert_equal_int(4, 2 + 2));
//!
//!     examiner::run(&registry, &config)
//! }
//! ```
//!
//! # Command line
//!
//! [`init`] understands `--list-tests`, `--short`, `--filter <prefix>`,
//! `--shuffle`, `--seed <n>`, `--repeat <n>`, `--die-on-fail`, `--color on|off`,
//! `--log-enable <event>`, `-h/--help` and `-v/--version`.

pub mod assertions;
mod config;
mod error;
mod events;
pub mod failure;
mod registry;
mod reporting;
mod results;
mod runner;
pub mod trace_categories;

use std::process::ExitCode;

pub use config::{ColorSetting, CommandLineArgs, RunConfig};
pub use error::Error;
pub use events::{TraceEvent, TraceEventConfig};
pub use registry::{HookKind, Procedure, Registry, Scope, TestCase};
pub use reporting::Reporter;
pub use results::{RunStats, RunStatus, RunSummary, ScopeResults};
pub use runner::TestRunner;

/// Parses harness options from `args` (the first item is the program name).
pub fn parse_args<I, T>(args: I) -> Result<CommandLineArgs, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    use clap::Parser;

    Ok(CommandLineArgs::try_parse_from(args)?)
}

/// Parses the process's command line and prepares the run configuration.
///
/// Help and version requests are printed and exit with status 0; invalid or
/// unknown options are reported on stderr and exit with status 1.
pub fn init() -> RunConfig {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(Error::Args(err)) => {
            use clap::error::ErrorKind;

            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            // Nothing more useful to do if stdout/stderr are gone.
            let _ = err.print();
            std::process::exit(code);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let trace_config = TraceEventConfig::init(&args.enabled_log_events);
    let mut enabled: Vec<_> = trace_config
        .enabled_events()
        .iter()
        .map(ToString::to_string)
        .collect();
    enabled.sort();
    tracing::debug!(
        target: trace_categories::ENGINE,
        "enabled log events: {}",
        enabled.join(", ")
    );

    let config = RunConfig::from(&args);
    colored::control::set_override(config.color);

    config
}

/// Runs `registry` with `config`, reporting to stdout, and returns the exit code.
pub fn run(registry: &Registry, config: &RunConfig) -> ExitCode {
    let mut runner = TestRunner::with_stdout(registry, config.clone());

    match runner.run() {
        Ok(summary) => ExitCode::from(summary.exit_code()),
        Err(err) => {
            tracing::error!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_reports_clap_errors() {
        let result = parse_args(["examiner", "--repeat", "0"]);
        assert!(matches!(result, Err(Error::Args(_))));
    }

    #[test]
    fn parse_args_accepts_known_flags() -> anyhow::Result<()> {
        let args = parse_args(["examiner", "--short", "--log-enable", "engine"])?;
        assert!(args.short);
        assert_eq!(args.enabled_log_events, [TraceEvent::Engine]);
        Ok(())
    }
}
