//! Configuration types for the harness.

use clap::Parser;

use crate::events::TraceEvent;

/// Whether report output is styled with ANSI escapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorSetting {
    /// Emit ANSI color escapes.
    #[default]
    On,
    /// Emit plain text.
    Off,
}

/// Command-line options understood by a test binary built on this harness.
#[derive(Clone, Parser, Debug)]
#[clap(
    name = "examiner",
    version = "0.1 License MIT",
    about = "Runs the tests registered in this binary",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct CommandLineArgs {
    /// Display usage information.
    #[clap(short = 'h', long = "help", action = clap::ArgAction::Help)]
    pub help: Option<bool>,

    /// Display version information.
    #[clap(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Only list the selected tests; run nothing.
    #[clap(long = "list-tests")]
    pub list_tests_only: bool,

    /// Compact output: one marker per test.
    #[clap(long = "short")]
    pub short: bool,

    /// Only consider tests whose qualified name (`scope.name`) starts with this prefix.
    #[clap(long = "filter", value_name = "PREFIX")]
    pub filter: Option<String>,

    /// Shuffle scope and test execution order.
    #[clap(long = "shuffle")]
    pub shuffle: bool,

    /// Seed for --shuffle; defaults to the current time.
    #[clap(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Run every test body this many times.
    #[clap(
        long = "repeat",
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub repeat: u32,

    /// Stop the whole run at the first failing test.
    #[clap(long = "die-on-fail")]
    pub die_on_fail: bool,

    /// Color output.
    #[clap(long = "color", value_name = "on|off", default_value = "on")]
    pub color: ColorSetting,

    /// Enable debug logging for the given category.
    #[clap(long = "log-enable", value_name = "EVENT")]
    pub enabled_log_events: Vec<TraceEvent>,
}

/// Run options read by the execution engine. Immutable once the run starts.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Qualified-name prefix a test must match to be listed or run.
    pub filter: Option<String>,
    /// Only list selected tests.
    pub list_tests_only: bool,
    /// Shuffle scope and test order.
    pub shuffle: bool,
    /// Fixed shuffle seed, if any.
    pub seed: Option<u64>,
    /// Number of times each test body runs; at least 1.
    pub repeat: u32,
    /// Abort the run on the first failure.
    pub die_on_fail: bool,
    /// Compact output.
    pub short: bool,
    /// Styled output.
    pub color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filter: None,
            list_tests_only: false,
            shuffle: false,
            seed: None,
            repeat: 1,
            die_on_fail: false,
            short: false,
            color: true,
        }
    }
}

impl RunConfig {
    /// Sets the qualified-name prefix filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enables shuffling, optionally with a fixed seed.
    #[must_use]
    pub const fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    /// Sets the repeat count. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_repeat(mut self, repeat: u32) -> Self {
        self.repeat = repeat.max(1);
        self
    }

    /// Enables or disables die-on-fail.
    #[must_use]
    pub const fn with_die_on_fail(mut self, die_on_fail: bool) -> Self {
        self.die_on_fail = die_on_fail;
        self
    }

    /// Enables or disables short output.
    #[must_use]
    pub const fn with_short(mut self, short: bool) -> Self {
        self.short = short;
        self
    }

    /// Enables or disables colored output.
    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Enables list-only mode.
    #[must_use]
    pub const fn with_list_tests_only(mut self, list: bool) -> Self {
        self.list_tests_only = list;
        self
    }

    /// Returns whether a test with the given qualified name is selected.
    ///
    /// Selection is a plain prefix match against `scope.name`.
    pub fn selects(&self, qualified_name: &str) -> bool {
        self.filter
            .as_deref()
            .is_none_or(|prefix| qualified_name.starts_with(prefix))
    }
}

impl From<&CommandLineArgs> for RunConfig {
    fn from(args: &CommandLineArgs) -> Self {
        Self {
            filter: args.filter.clone(),
            list_tests_only: args.list_tests_only,
            shuffle: args.shuffle,
            seed: args.seed,
            repeat: args.repeat,
            die_on_fail: args.die_on_fail,
            short: args.short,
            color: args.color == ColorSetting::On,
        }
    }
}
