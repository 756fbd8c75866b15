//! Test runner implementation.

use std::{
    io::Write,
    ops::ControlFlow,
    time::{Duration, Instant, SystemTime},
};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    config::RunConfig,
    error::Error,
    failure::{self, AttemptOutcome, Failure},
    registry::{HookKind, Registry, Scope, TestCase},
    reporting::Reporter,
    results::{RunStats, RunStatus, RunSummary},
    trace_categories,
};

enum TestOutcome {
    Passed(Duration),
    Failed(Failure),
}

/// Runs the tests of a [`Registry`] according to a [`RunConfig`].
pub struct TestRunner<'r, W: Write> {
    registry: &'r Registry,
    config: RunConfig,
    reporter: Reporter<W>,
    rng: Option<StdRng>,
    seed: Option<u64>,
}

impl<'r> TestRunner<'r, std::io::Stdout> {
    /// Creates a runner reporting to standard output.
    pub fn with_stdout(registry: &'r Registry, config: RunConfig) -> Self {
        let reporter = Reporter::stdout(&config);
        Self::new(registry, config, reporter)
    }
}

impl<'r, W: Write> TestRunner<'r, W> {
    /// Creates a runner with the given reporter.
    pub fn new(registry: &'r Registry, config: RunConfig, reporter: Reporter<W>) -> Self {
        let seed = config.shuffle.then(|| config.seed.unwrap_or_else(time_seed));
        let rng = seed.map(StdRng::seed_from_u64);

        Self {
            registry,
            config,
            reporter,
            rng,
            seed,
        }
    }

    /// Consumes the runner, returning its reporter.
    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Runs (or, in list-only mode, lists) all selected tests.
    ///
    /// Test failures are not errors; they are reflected in the returned summary.
    /// An `Err` means the harness itself could not proceed.
    pub fn run(&mut self) -> Result<RunSummary, Error> {
        let registry = self.registry;
        self.reporter.set_name_width(registry.longest_scope_name());

        let selected = self.enumerate()?;
        if self.config.list_tests_only {
            return Ok(RunSummary {
                status: RunStatus::Listed,
                ..RunSummary::default()
            });
        }

        let mut summary = RunSummary {
            seed: self.seed,
            ..RunSummary::default()
        };

        self.reporter.running_all(selected)?;
        if let Some(seed) = self.seed {
            tracing::debug!(target: trace_categories::ENGINE, "shuffling with seed {seed}");
            self.reporter.shuffle_seed(seed)?;
        }

        for scope_index in self.run_order(registry.len()) {
            let Some(scope) = registry.scope_at(scope_index) else {
                continue;
            };

            if self.run_scope(scope, &mut summary)?.is_break() {
                tracing::debug!(target: trace_categories::ENGINE, "stopping at first failure");
                summary.status = RunStatus::Aborted;
                return Ok(summary);
            }
        }

        self.reporter.summary(
            summary.totals.passed,
            summary.totals.considered,
            &summary.failed_tests,
        )?;

        Ok(summary)
    }

    /// Counts the selected tests, printing their names in list-only mode.
    fn enumerate(&mut self) -> Result<usize, Error> {
        let registry = self.registry;
        let mut selected = 0;

        for scope in registry.scopes() {
            for test in scope.tests() {
                let name = test.qualified_name();
                if !self.config.selects(&name) {
                    continue;
                }
                if self.config.list_tests_only {
                    self.reporter.listing(&name)?;
                }
                selected += 1;
            }
        }

        Ok(selected)
    }

    /// Returns `0..len`, shuffled when shuffling is enabled.
    fn run_order(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        if let Some(rng) = &mut self.rng {
            order.shuffle(rng);
        }
        order
    }

    fn run_scope(
        &mut self,
        scope: &Scope,
        summary: &mut RunSummary,
    ) -> Result<ControlFlow<()>, Error> {
        let tests = scope.tests();
        let selected = tests
            .iter()
            .filter(|test| self.config.selects(&test.qualified_name()))
            .count();

        let mut stats = RunStats::default();
        let mut announced = false;
        let mut flow = ControlFlow::Continue(());

        for test_index in self.run_order(tests.len()) {
            let test = &tests[test_index];
            let name = test.qualified_name();
            if !self.config.selects(&name) {
                continue;
            }

            if !announced {
                self.reporter.running_scope(scope.name(), selected)?;
                announced = true;
            }

            stats.considered += 1;

            if test.is_pending() {
                tracing::debug!(target: trace_categories::ENGINE, "{name}: pending");
                stats.pending += 1;
                self.reporter.pending(&name)?;
                continue;
            }

            self.reporter.run(&name)?;
            match self.run_test(scope, test)? {
                TestOutcome::Passed(elapsed) => {
                    tracing::debug!(target: trace_categories::ENGINE, "{name}: passed");
                    stats.passed += 1;
                    self.reporter.ok(&name, elapsed)?;
                }
                TestOutcome::Failed(failure) => {
                    tracing::debug!(target: trace_categories::ENGINE, "{name}: failed: {failure}");
                    self.reporter.failed(&name, &failure)?;
                    summary.record_failure(name);

                    if self.config.die_on_fail {
                        flow = ControlFlow::Break(());
                        break;
                    }
                }
            }
        }

        summary.add_scope(scope.name(), stats);

        if flow.is_continue() && announced {
            self.reporter.scope_end(scope.name(), stats.passed)?;
        }

        Ok(flow)
    }

    /// Runs all repetitions of one test inside a single armed window.
    ///
    /// A failure skips the `after` hook of the failing repetition and every
    /// later repetition.
    fn run_test(&self, scope: &Scope, test: &TestCase) -> Result<TestOutcome, Error> {
        let repeat = self.config.repeat;
        let mut elapsed = Duration::ZERO;

        let outcome = failure::attempt(|| {
            for _ in 0..repeat {
                scope.run_hook(HookKind::Before);
                let start = Instant::now();
                test.run();
                elapsed = start.elapsed();
                scope.run_hook(HookKind::After);
            }
        })?;

        Ok(match outcome {
            AttemptOutcome::Passed => TestOutcome::Passed(elapsed),
            AttemptOutcome::Failed(failure) => TestOutcome::Failed(failure),
        })
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |now| now.as_secs() ^ u64::from(now.subsec_nanos()))
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use crate::assertions::{assert_equal_int, assert_true};
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging(log: &Log, entry: &str) -> impl Fn() + 'static {
        let log = log.clone();
        let entry = entry.to_string();
        move || log.borrow_mut().push(entry.clone())
    }

    fn run(registry: &Registry, config: RunConfig) -> anyhow::Result<(RunSummary, String)> {
        let config = config.with_color(false);
        let reporter = Reporter::new(Vec::new(), &config);
        let mut runner = TestRunner::new(registry, config, reporter);
        let summary = runner.run()?;
        let output = String::from_utf8(runner.into_reporter().into_inner())?;
        Ok((summary, output))
    }

    fn sample_registry(log: &Log) -> Registry {
        let mut registry = Registry::new();
        registry
            .test("math", "add", logging(log, "math.add"))
            .test("math", "sub", logging(log, "math.sub"))
            .test("str", "concat", logging(log, "str.concat"));
        registry
    }

    #[test]
    fn runs_everything_in_registration_order() -> anyhow::Result<()> {
        let log = Log::default();
        let registry = sample_registry(&log);

        let (summary, output) = run(&registry, RunConfig::default())?;

        assert_eq!(*log.borrow(), ["math.add", "math.sub", "str.concat"]);
        assert_eq!(summary.status, RunStatus::Passed);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(summary.totals.considered, 3);
        assert_eq!(summary.totals.passed, 3);
        assert!(output.starts_with("[==========] Running 3 test(s)\n"));
        assert!(output.ends_with("[==========] Ran 3 test(s) across all scopes\n"));
        Ok(())
    }

    #[test]
    fn filter_selects_by_prefix() -> anyhow::Result<()> {
        let log = Log::default();
        let registry = sample_registry(&log);

        let (summary, output) = run(&registry, RunConfig::default().with_filter("math."))?;

        assert_eq!(*log.borrow(), ["math.add", "math.sub"]);
        assert_eq!(summary.totals.considered, 2);
        assert!(!output.contains("str"));
        Ok(())
    }

    #[test]
    fn list_mode_prints_selected_names_only() -> anyhow::Result<()> {
        let log = Log::default();
        let registry = sample_registry(&log);

        let (summary, output) = run(
            &registry,
            RunConfig::default()
                .with_filter("math.")
                .with_list_tests_only(true),
        )?;

        assert!(log.borrow().is_empty());
        assert_eq!(summary.status, RunStatus::Listed);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(output, "math.add\nmath.sub\n");
        Ok(())
    }

    #[test]
    fn list_mode_without_filter_lists_everything() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = sample_registry(&log);
        registry.pending("str", "later", || {});

        let (_, output) = run(&registry, RunConfig::default().with_list_tests_only(true))?;

        assert_eq!(output, "math.add\nmath.sub\nstr.concat\nstr.later\n");
        Ok(())
    }

    #[test]
    fn pending_tests_never_run() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .pending("s", "skipped", logging(&log, "skipped"))
            .test("s", "ran", logging(&log, "ran"));

        for config in [
            RunConfig::default(),
            RunConfig::default().with_shuffle(Some(7)),
            RunConfig::default().with_filter("s.skip"),
        ] {
            log.borrow_mut().clear();
            let (summary, output) = run(&registry, config)?;

            assert!(!log.borrow().contains(&"skipped".to_string()));
            assert!(output.contains("[ PENDING  ] s.skipped"));
            assert_eq!(summary.totals.pending, 1);
            assert_eq!(summary.totals.failed(), 0);
            assert_eq!(summary.status, RunStatus::Passed);
        }
        Ok(())
    }

    #[test]
    fn failure_is_local_to_its_test() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .test("s", "a", logging(&log, "a"))
            .test("s", "b", || assert_equal_int(1, 2))
            .test("s", "c", logging(&log, "c"));

        let (summary, output) = run(&registry, RunConfig::default())?;

        assert_eq!(*log.borrow(), ["a", "c"]);
        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(summary.failed_tests, ["s.b"]);
        assert_eq!(summary.totals.passed, 2);
        assert_eq!(summary.totals.failed(), 1);
        assert!(output.contains("  Expected: 1 Result: 2\n[  FAILED  ] s.b\n"));
        assert!(output.contains("[  PASSED  ] 2 test(s) passed in scope s\n\n"));
        Ok(())
    }

    #[test]
    fn die_on_fail_stops_the_run() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .test("s", "a", logging(&log, "a"))
            .test("s", "b", {
                let log = log.clone();
                move || {
                    log.borrow_mut().push("b".into());
                    assert_true(false);
                }
            })
            .test("s", "c", logging(&log, "c"))
            .test("t", "d", logging(&log, "d"));

        let (summary, output) = run(&registry, RunConfig::default().with_die_on_fail(true))?;

        assert_eq!(*log.borrow(), ["a", "b"]);
        assert_eq!(summary.status, RunStatus::Aborted);
        assert_eq!(summary.exit_code(), 1);
        assert!(output.contains("[  FAILED  ] s.b"));
        assert!(!output.contains("across all scopes"));
        Ok(())
    }

    #[test]
    fn repeat_runs_hooks_around_every_repetition() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .before_each("s", logging(&log, "before"))
            .after_each("s", logging(&log, "after"))
            .test("s", "body", logging(&log, "body"));

        let (summary, _) = run(&registry, RunConfig::default().with_repeat(3))?;

        let counts = log.borrow().iter().fold(BTreeMap::new(), |mut counts, entry| {
            *counts.entry(entry.clone()).or_insert(0) += 1;
            counts
        });
        assert_eq!(counts.get("before"), Some(&3));
        assert_eq!(counts.get("body"), Some(&3));
        assert_eq!(counts.get("after"), Some(&3));
        assert_eq!(
            log.borrow()[..3],
            ["before".to_string(), "body".into(), "after".into()]
        );
        assert_eq!(summary.totals.passed, 1);
        Ok(())
    }

    #[test]
    fn failing_repetition_skips_its_after_hook_and_the_rest() -> anyhow::Result<()> {
        let log = Log::default();
        let runs = Rc::new(RefCell::new(0));
        let mut registry = Registry::new();
        registry
            .before_each("s", logging(&log, "before"))
            .after_each("s", logging(&log, "after"))
            .test("s", "flaky", {
                let runs = runs.clone();
                move || {
                    *runs.borrow_mut() += 1;
                    assert_true(*runs.borrow() < 2);
                }
            });

        let (summary, _) = run(&registry, RunConfig::default().with_repeat(3))?;

        assert_eq!(*runs.borrow(), 2);
        assert_eq!(*log.borrow(), ["before", "after", "before"]);
        assert_eq!(summary.failed_tests, ["s.flaky"]);
        Ok(())
    }

    #[test]
    fn only_the_last_before_hook_runs() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .before_each("s", logging(&log, "first"))
            .before_each("s", logging(&log, "second"))
            .test("s", "t", || {});

        run(&registry, RunConfig::default())?;

        assert_eq!(*log.borrow(), ["second"]);
        Ok(())
    }

    #[test]
    fn shuffle_runs_every_test_once_per_repetition() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        for scope in ["a", "b", "c"] {
            for test in 0..8 {
                registry.test(scope, format!("t{test}"), logging(&log, &format!("{scope}.t{test}")));
            }
        }

        let (summary, _) = run(
            &registry,
            RunConfig::default().with_shuffle(Some(1234)).with_repeat(2),
        )?;

        let mut ran = log.borrow().clone();
        ran.sort();
        let mut expected: Vec<String> = ["a", "b", "c"]
            .iter()
            .flat_map(|scope| (0..8).map(move |test| format!("{scope}.t{test}")))
            .flat_map(|name| [name.clone(), name])
            .collect();
        expected.sort();

        assert_eq!(ran, expected);
        assert_eq!(summary.seed, Some(1234));
        assert_eq!(summary.totals.passed, 24);
        Ok(())
    }

    #[test]
    fn shuffle_order_is_a_permutation() {
        let registry = Registry::new();
        let config = RunConfig::default().with_shuffle(Some(99));
        let reporter = Reporter::new(std::io::sink(), &config);
        let mut runner = TestRunner::new(&registry, config, reporter);

        for len in [0, 1, 2, 17, 100] {
            let mut order = runner.run_order(len);
            order.sort_unstable();
            assert_eq!(order, (0..len).collect::<Vec<_>>());
        }
    }

    #[test]
    fn same_seed_gives_same_order() -> anyhow::Result<()> {
        let first = Log::default();
        let second = Log::default();

        run(&sample_registry(&first), RunConfig::default().with_shuffle(Some(5)))?;
        run(&sample_registry(&second), RunConfig::default().with_shuffle(Some(5)))?;

        assert_eq!(*first.borrow(), *second.borrow());
        Ok(())
    }

    #[test]
    fn scope_counts_sum_to_totals() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = sample_registry(&log);
        registry
            .pending("str", "later", || {})
            .test("str", "broken", || assert_true(false));

        let (summary, _) = run(&registry, RunConfig::default().with_shuffle(Some(3)))?;

        let considered: usize = summary.scopes.iter().map(|s| s.stats.considered).sum();
        let passed: usize = summary.scopes.iter().map(|s| s.stats.passed).sum();
        assert_eq!(considered, summary.totals.considered);
        assert_eq!(passed, summary.totals.passed);
        assert_eq!(summary.totals.considered, 5);
        assert_eq!(summary.totals.failed(), 1);
        Ok(())
    }

    #[test]
    fn scope_header_waits_for_first_selected_test() -> anyhow::Result<()> {
        let mut registry = Registry::new();
        registry
            .test("net", "skipped", || {})
            .test("net", "socket", || {})
            .test("other", "x", || {});

        let (_, output) = run(&registry, RunConfig::default().with_filter("net.so"))?;

        assert_eq!(
            output,
            "\
[==========] Running 1 test(s)
[==========] Running 1 test(s) in scope net
[ RUN      ] net.socket
[       OK ] net.socket [0.00 s]
[  PASSED  ] 1 test(s) passed in scope net

[  PASSED  ] 1 test(s) across all scopes
[==========] Ran 1 test(s) across all scopes
"
        );
        Ok(())
    }

    #[test]
    fn short_output() -> anyhow::Result<()> {
        let mut registry = Registry::new();
        registry
            .test("a", "ok", || {})
            .test("a", "bad", || assert_true(false))
            .pending("a", "todo", || {})
            .test("long_scope", "ok", || {});

        let (summary, output) = run(&registry, RunConfig::default().with_short(true))?;

        assert_eq!(output, "a         : .FP\nlong_scope: .\n");
        assert_eq!(summary.exit_code(), 1);
        Ok(())
    }

    #[test]
    fn duplicate_names_both_run() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .test("s", "same", logging(&log, "first"))
            .test("s", "same", logging(&log, "second"));

        let (summary, _) = run(&registry, RunConfig::default())?;

        assert_eq!(*log.borrow(), ["first", "second"]);
        assert_eq!(summary.totals.passed, 2);
        Ok(())
    }

    #[test]
    fn failing_hook_fails_the_test() -> anyhow::Result<()> {
        let log = Log::default();
        let mut registry = Registry::new();
        registry
            .before_each("s", || assert_true(false))
            .test("s", "t", logging(&log, "t"));

        let (summary, _) = run(&registry, RunConfig::default())?;

        assert!(log.borrow().is_empty());
        assert_eq!(summary.failed_tests, ["s.t"]);
        Ok(())
    }

    #[test]
    fn empty_registry_passes() -> anyhow::Result<()> {
        let (summary, output) = run(&Registry::new(), RunConfig::default())?;

        assert_eq!(summary.status, RunStatus::Passed);
        assert_eq!(
            output,
            "\
[==========] Running 0 test(s)
[  PASSED  ] 0 test(s) across all scopes
[==========] Ran 0 test(s) across all scopes
"
        );
        Ok(())
    }
}
