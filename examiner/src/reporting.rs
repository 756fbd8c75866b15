//! Console rendering of run progress and results.

use std::{io::Write, time::Duration};

use colored::{Color, Colorize};

use crate::{
    assertions::{Mismatch, Relation},
    config::RunConfig,
    failure::Failure,
};

/// Renders per-test and per-scope status lines.
///
/// Verbose mode prints one line per event; short mode prints a padded scope name
/// followed by one marker per test.
pub struct Reporter<W: Write> {
    out: W,
    short: bool,
    color: bool,
    name_width: usize,
}

impl Reporter<std::io::Stdout> {
    /// Creates a reporter writing to standard output.
    pub fn stdout(config: &RunConfig) -> Self {
        Self::new(std::io::stdout(), config)
    }
}

impl<W: Write> Reporter<W> {
    /// Creates a reporter writing to `out`, styled per `config`.
    pub fn new(out: W, config: &RunConfig) -> Self {
        Self {
            out,
            short: config.short,
            color: config.color,
            name_width: 0,
        }
    }

    /// Sets the column width used for scope names in short mode.
    pub fn set_name_width(&mut self, width: usize) {
        self.name_width = width;
    }

    /// Consumes the reporter, returning its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn status(&mut self, tag: &str, color: Color, text: &str) -> std::io::Result<()> {
        let tag = self.paint(tag, color);
        writeln!(self.out, "{tag} {text}")
    }

    fn marker(&mut self, marker: &str, color: Color) -> std::io::Result<()> {
        let marker = self.paint(marker, color);
        write!(self.out, "{marker}")?;
        self.out.flush()
    }

    /// Prints one qualified name in list-only mode.
    pub fn listing(&mut self, qualified_name: &str) -> std::io::Result<()> {
        writeln!(self.out, "{qualified_name}")
    }

    /// Announces the run.
    pub fn running_all(&mut self, count: usize) -> std::io::Result<()> {
        if self.short {
            return Ok(());
        }
        let line = self.paint(&format!("[==========] Running {count} test(s)"), Color::BrightBlack);
        writeln!(self.out, "{line}")
    }

    /// Announces the seed of a shuffled run so it can be replayed with `--seed`.
    pub fn shuffle_seed(&mut self, seed: u64) -> std::io::Result<()> {
        if self.short {
            return Ok(());
        }
        let line = self.paint(&format!("[==========] Shuffling with seed {seed}"), Color::BrightBlack);
        writeln!(self.out, "{line}")
    }

    /// Announces a scope; called at its first selected test.
    pub fn running_scope(&mut self, name: &str, count: usize) -> std::io::Result<()> {
        if self.short {
            let width = self.name_width;
            return write!(self.out, "{name:<width$}: ");
        }
        let line = self.paint(
            &format!("[==========] Running {count} test(s) in scope {name}"),
            Color::BrightBlack,
        );
        writeln!(self.out, "{line}")
    }

    /// Reports a pending test.
    pub fn pending(&mut self, qualified_name: &str) -> std::io::Result<()> {
        if self.short {
            return self.marker("P", Color::Blue);
        }
        self.status("[ PENDING  ]", Color::Blue, qualified_name)
    }

    /// Reports that a test is starting.
    pub fn run(&mut self, qualified_name: &str) -> std::io::Result<()> {
        if self.short {
            return Ok(());
        }
        self.status("[ RUN      ]", Color::BrightBlack, qualified_name)
    }

    /// Reports a passed test with the duration of its last repetition.
    pub fn ok(&mut self, qualified_name: &str, elapsed: Duration) -> std::io::Result<()> {
        if self.short {
            return self.marker(".", Color::Green);
        }
        let text = format!("{qualified_name} [{:.2} s]", elapsed.as_secs_f64());
        self.status("[       OK ]", Color::Green, &text)
    }

    /// Reports a failed test, preceded by its diagnostic.
    pub fn failed(&mut self, qualified_name: &str, failure: &Failure) -> std::io::Result<()> {
        if self.short {
            return self.marker("F", Color::Red);
        }
        self.diagnostic(failure)?;
        self.status("[  FAILED  ]", Color::Red, qualified_name)
    }

    fn diagnostic(&mut self, failure: &Failure) -> std::io::Result<()> {
        if let Some(location) = &failure.location {
            writeln!(self.out, "  Error at line: {location}")?;
        }

        match &failure.mismatch {
            Mismatch::Bool { expected } => {
                let received = !*expected;
                let expected = self.paint(&format!("expected: {expected}"), Color::Green);
                let received = self.paint(&format!("received: {received}"), Color::Red);
                writeln!(self.out, "  {expected} {received}")
            }
            Mismatch::Values {
                relation,
                expected,
                actual,
            } => {
                let qualifier = match relation {
                    Relation::Equal => "",
                    Relation::NotEqual => "not ",
                };
                let expected = self.paint(&format!("Expected: {qualifier}{expected}"), Color::Green);
                let actual = self.paint(&format!("Result: {actual}"), Color::Red);
                writeln!(self.out, "  {expected} {actual}")
            }
            Mismatch::Bytes(report) => {
                let (label, operator) = match report.relation {
                    Relation::Equal => ("difference", "!="),
                    Relation::NotEqual => ("same", "=="),
                };
                for entry in &report.offsets {
                    writeln!(
                        self.out,
                        "  {label} at offset {} 0x{:02x} {operator} 0x{:02x}",
                        entry.offset, entry.expected, entry.actual
                    )?;
                }
                if report.is_truncated() {
                    writeln!(self.out, "  ...")?;
                }
                writeln!(self.out, "  {}", failure.mismatch)
            }
            Mismatch::Length { .. } | Mismatch::Panic(_) => {
                let text = self.paint(&failure.mismatch.to_string(), Color::Red);
                writeln!(self.out, "  {text}")
            }
        }
    }

    /// Closes a scope that had at least one selected test.
    pub fn scope_end(&mut self, name: &str, passed: usize) -> std::io::Result<()> {
        if !self.short {
            let line = self.paint(
                &format!("[  PASSED  ] {passed} test(s) passed in scope {name}"),
                Color::Green,
            );
            writeln!(self.out, "{line}")?;
        }
        writeln!(self.out)
    }

    /// Prints the final totals, listing failed tests if there were any.
    pub fn summary(
        &mut self,
        passed: usize,
        considered: usize,
        failed: &[String],
    ) -> std::io::Result<()> {
        if self.short {
            return self.out.flush();
        }

        let line = self.paint(
            &format!("[  PASSED  ] {passed} test(s) across all scopes"),
            Color::Green,
        );
        writeln!(self.out, "{line}")?;

        if !failed.is_empty() {
            let count = failed.len();
            self.status("[  FAILED  ]", Color::Red, &format!("{count} test(s), listed below:"))?;
            for name in failed {
                self.status("[  FAILED  ]", Color::Red, name)?;
            }
        }

        let line = self.paint(
            &format!("[==========] Ran {considered} test(s) across all scopes"),
            Color::BrightBlack,
        );
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}
