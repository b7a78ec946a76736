//! Property testing with replayable entropy and scored shrinking.
//!
//! A property is a predicate over generated inputs. [`Runner::check`]
//! searches for a counterexample; when it finds one, it minimizes it by
//! walking scored shrink candidates, and records it in a [`FailureStore`]
//! so later runs replay it before searching again.
//!
//! ```
//! use refute::{Runner, ty};
//!
//! let mut runner = Runner::new();
//! let report = runner.check("addition_commutes", |tc| {
//!     let a = tc.arbitrary(&ty("i32"))?.as_i64().unwrap_or(0);
//!     let b = tc.arbitrary(&ty("i32"))?.as_i64().unwrap_or(0);
//!     Ok(a + b == b + a)
//! });
//! assert!(report.passed(), "{}", report.explanation);
//! ```

use std::rc::Rc;

pub mod entropy;
pub mod generators;
pub mod properties;
pub mod status;
pub mod store;
pub mod value;

pub use crate::generators::{ty, Constructor, GenCtx, Output, Registry, TypeExpr};
pub use crate::properties::{CaseError, Config, Property, TestCase, Verdict};
pub use crate::status::Status;
pub use crate::store::{FailureStore, MemoryStore};
pub use crate::value::Value;

/// What one property run concluded.
#[derive(Debug, Clone)]
pub struct Report {
    pub status: Status,
    /// The minimized counterexample, if the run was `Interesting`.
    pub counterexample: Vec<Value>,
    /// A human-readable account of the outcome.
    pub explanation: String,
    /// Total predicate invocations across all phases.
    pub calls: usize,
    /// Whether some attempt requested no generated values at all.
    pub trivial: bool,
}

impl Report {
    /// The property was proved and actually exercised generated data.
    pub fn passed(&self) -> bool {
        self.status == Status::Valid && !self.trivial
    }
}

/// The user entry point: a generator registry, a failure store, and a
/// configuration, reused across property checks.
pub struct Runner<S = MemoryStore> {
    registry: Registry,
    store: S,
    config: Config,
    diagnostic: Option<Rc<dyn Fn(&[Value])>>,
}

impl Runner<MemoryStore> {
    pub fn new() -> Self {
        Runner::with_store(MemoryStore::new())
    }
}

impl Default for Runner<MemoryStore> {
    fn default() -> Self {
        Runner::new()
    }
}

impl<S: FailureStore> Runner<S> {
    pub fn with_store(store: S) -> Self {
        Runner {
            registry: Registry::with_builtins(),
            store,
            config: Config::default(),
            diagnostic: None,
        }
    }

    /// Replaces the generator registry, e.g. one extended with domain types.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Installs a callback invoked with the generated values after every
    /// falsifying predicate call.
    pub fn with_diagnostic(mut self, f: impl Fn(&[Value]) + 'static) -> Self {
        self.diagnostic = Some(Rc::new(f));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one property: replays any recorded failure for `identity`,
    /// searches, shrinks, and updates the store to match the outcome.
    pub fn check<F>(&mut self, identity: &str, predicate: F) -> Report
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        let previous = self.store.lookup(identity);
        let mut property = Property::new(self.registry.clone(), self.config.clone(), previous);
        if let Some(diagnostic) = &self.diagnostic {
            property = property.with_diagnostic(diagnostic.clone());
        }
        property.run(&predicate);

        let report = Report {
            status: property.status(),
            counterexample: match property.status() {
                Status::Interesting => property.counterexample(),
                _ => Vec::new(),
            },
            explanation: property.explain(),
            calls: property.calls(),
            trivial: property.trivial(),
        };

        // Only reproducible outcomes touch the store: a proof erases the
        // entry, a counterexample replaces it.
        if report.trivial {
            self.store.erase(identity);
        } else {
            match report.status {
                Status::Valid => self.store.erase(identity),
                Status::Interesting => self.store.record(identity, report.counterexample.clone()),
                _ => {}
            }
        }
        report
    }
}
