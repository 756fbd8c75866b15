//! Aggregated results of a run.

/// Counts for a scope or for the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Selected tests encountered, pending ones included.
    pub considered: usize,
    /// Tests whose every repetition completed.
    pub passed: usize,
    /// Selected tests that were declared pending.
    pub pending: usize,
}

impl RunStats {
    /// Tests that ran and failed.
    pub const fn failed(&self) -> usize {
        self.considered - self.passed - self.pending
    }

    fn accumulate(&mut self, other: &Self) {
        self.considered += other.considered;
        self.passed += other.passed;
        self.pending += other.pending;
    }
}

/// Counts for one scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeResults {
    /// Name of the scope.
    pub name: String,
    /// The scope's counts.
    pub stats: RunStats,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunStatus {
    /// Every executed test passed.
    #[default]
    Passed,
    /// At least one test failed.
    Failed,
    /// A test failed with die-on-fail set; the run stopped there.
    Aborted,
    /// List-only mode; nothing ran.
    Listed,
}

/// Everything a run produced, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// How the run ended.
    pub status: RunStatus,
    /// Totals across all scopes.
    pub totals: RunStats,
    /// Per-scope counts, in the order scopes were processed.
    pub scopes: Vec<ScopeResults>,
    /// Qualified names of failed tests, in execution order.
    pub failed_tests: Vec<String>,
    /// Seed used when shuffling.
    pub seed: Option<u64>,
}

impl RunSummary {
    pub(crate) fn add_scope(&mut self, name: &str, stats: RunStats) {
        self.totals.accumulate(&stats);
        self.scopes.push(ScopeResults {
            name: name.to_string(),
            stats,
        });
    }

    pub(crate) fn record_failure(&mut self, qualified_name: String) {
        self.failed_tests.push(qualified_name);
        self.status = RunStatus::Failed;
    }

    /// Process exit code for this run: 0 when nothing failed, 1 otherwise.
    pub const fn exit_code(&self) -> u8 {
        match self.status {
            RunStatus::Passed | RunStatus::Listed => 0,
            RunStatus::Failed | RunStatus::Aborted => 1,
        }
    }
}
