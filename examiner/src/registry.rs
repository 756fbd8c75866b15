//! The test registry: named scopes holding ordered test cases and optional hooks.

use indexmap::IndexMap;

use crate::trace_categories;

/// A parameterless procedure registered as a test body or a hook.
pub type Procedure = Box<dyn Fn()>;

/// Which hook of a scope to set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    /// Runs before every repetition of every test in the scope.
    Before,
    /// Runs after every successful repetition of every test in the scope.
    After,
}

/// A single registered test.
pub struct TestCase {
    scope: String,
    name: String,
    body: Procedure,
    pending: bool,
}

impl TestCase {
    /// Name of the scope this test belongs to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Name of the test within its scope.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `scope.name`, the name used for filtering and listing.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.scope, self.name)
    }

    /// Whether the test is declared but intentionally never run.
    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    pub(crate) fn run(&self) {
        (self.body)();
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// A named group of tests sharing `before`/`after` hooks.
pub struct Scope {
    name: String,
    tests: Vec<TestCase>,
    before: Option<Procedure>,
    after: Option<Procedure>,
}

impl Scope {
    fn new(name: String) -> Self {
        Self {
            name,
            tests: Vec::new(),
            before: None,
            after: None,
        }
    }

    /// Name of the scope.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tests in registration order.
    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    /// Whether a hook of the given kind is set.
    pub const fn has_hook(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Before => self.before.is_some(),
            HookKind::After => self.after.is_some(),
        }
    }

    pub(crate) fn run_hook(&self, kind: HookKind) {
        let hook = match kind {
            HookKind::Before => &self.before,
            HookKind::After => &self.after,
        };

        if let Some(hook) = hook {
            hook();
        }
    }
}

/// All registered scopes, keyed by name in first-registration order.
///
/// Registration happens before the run; the engine only ever borrows the
/// registry immutably.
#[derive(Default)]
pub struct Registry {
    scopes: IndexMap<String, Scope>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a test to `scope`, creating the scope on first use.
    ///
    /// Duplicate `(scope, name)` pairs are kept; both run.
    pub fn register_test(
        &mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        body: impl Fn() + 'static,
        pending: bool,
    ) {
        let scope = scope.into();
        let test = TestCase {
            scope: scope.clone(),
            name: name.into(),
            body: Box::new(body),
            pending,
        };

        tracing::debug!(target: trace_categories::REGISTRY, "registering test {}", test.qualified_name());
        self.scope_entry(scope).tests.push(test);
    }

    /// Sets the `before` or `after` hook of `scope`, creating the scope on first use.
    ///
    /// A later registration for the same role replaces the earlier one.
    pub fn register_hook(
        &mut self,
        scope: impl Into<String>,
        body: impl Fn() + 'static,
        kind: HookKind,
    ) {
        let scope = self.scope_entry(scope.into());
        let slot = match kind {
            HookKind::Before => &mut scope.before,
            HookKind::After => &mut scope.after,
        };

        if slot.is_some() {
            tracing::debug!(target: trace_categories::REGISTRY, "replacing {kind:?} hook of scope {}", scope.name);
        }
        *slot = Some(Box::new(body));
    }

    /// Registers a test that runs.
    pub fn test(
        &mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        body: impl Fn() + 'static,
    ) -> &mut Self {
        self.register_test(scope, name, body, false);
        self
    }

    /// Registers a pending test: it is listed and reported but never run.
    pub fn pending(
        &mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        body: impl Fn() + 'static,
    ) -> &mut Self {
        self.register_test(scope, name, body, true);
        self
    }

    /// Sets the hook run before each test repetition in `scope`.
    pub fn before_each(&mut self, scope: impl Into<String>, body: impl Fn() + 'static) -> &mut Self {
        self.register_hook(scope, body, HookKind::Before);
        self
    }

    /// Sets the hook run after each test repetition in `scope`.
    pub fn after_each(&mut self, scope: impl Into<String>, body: impl Fn() + 'static) -> &mut Self {
        self.register_hook(scope, body, HookKind::After);
        self
    }

    /// Scopes in first-registration order.
    pub fn scopes(&self) -> impl ExactSizeIterator<Item = &Scope> {
        self.scopes.values()
    }

    /// Looks up a scope by name.
    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(name)
    }

    pub(crate) fn scope_at(&self, index: usize) -> Option<&Scope> {
        self.scopes.get_index(index).map(|(_, scope)| scope)
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Total number of registered tests, pending ones included.
    pub fn test_count(&self) -> usize {
        self.scopes.values().map(|scope| scope.tests.len()).sum()
    }

    /// Length of the longest scope name.
    pub fn longest_scope_name(&self) -> usize {
        self.scopes.keys().map(String::len).max().unwrap_or(0)
    }

    fn scope_entry(&mut self, name: String) -> &mut Scope {
        self.scopes.entry(name).or_insert_with_key(|name| {
            tracing::debug!(target: trace_categories::REGISTRY, "creating scope {name}");
            Scope::new(name.clone())
        })
    }
}
