//! The property execution state machine: replay of a recorded failure,
//! random search for a new one, and the scored shrink walk, reduced to a
//! single [`Status`].

use std::any::Any;
use std::cell::RefCell;
use std::panic;
use std::rc::Rc;

use log::{debug, trace};

use crate::entropy::Entropy;
use crate::generators::core::{TypeExpr, ValueGenerator};
use crate::generators::registry::Registry;
use crate::status::Status;
use crate::value::Value;

/// Run configuration, overridable builder-style.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) max_success: usize,
    pub(crate) max_discard_ratio: usize,
    pub(crate) max_entropy_size: usize,
    pub(crate) max_shrink_calls: usize,
    pub(crate) seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_success: 100,
            max_discard_ratio: 10,
            max_entropy_size: 0x100,
            max_shrink_calls: usize::MAX >> 1,
            seed: None,
        }
    }
}

impl Config {
    /// Overrides how many valid cases prove the property.
    pub fn max_success(&self, max_success: usize) -> Self {
        Config {
            max_success,
            ..self.clone()
        }
    }

    /// Overrides how many rejected cases per success are tolerated before
    /// the run gives up as `Exhausted`.
    pub fn max_discard_ratio(&self, max_discard_ratio: usize) -> Self {
        Config {
            max_discard_ratio,
            ..self.clone()
        }
    }

    /// Overrides the entropy budget for a single case.
    pub fn max_entropy_size(&self, max_entropy_size: usize) -> Self {
        Config {
            max_entropy_size,
            ..self.clone()
        }
    }

    /// Overrides the shrink-phase predicate-call budget.
    pub fn max_shrink_calls(&self, max_shrink_calls: usize) -> Self {
        Config {
            max_shrink_calls,
            ..self.clone()
        }
    }

    /// Pins the random seed for a reproducible run.
    pub fn seed(&self, seed: u64) -> Self {
        Config {
            seed: Some(seed),
            ..self.clone()
        }
    }
}

/// How a predicate invocation ended, short of returning a verdict.
#[derive(Debug)]
pub enum CaseError {
    /// An `assume` guard failed; the case is discarded without counting.
    Rejected,
    /// The entropy budget was exceeded while generating.
    Overrun,
    /// The predicate failed in a way that is not a falsification.
    Defect(String),
}

/// What a predicate returns: a verdict, or an early exit via `?`.
pub type Verdict = Result<bool, CaseError>;

/// Handed to the predicate on each invocation; the only way it obtains
/// generated values or discards the current case.
pub struct TestCase {
    registry: Registry,
    entropy: Rc<RefCell<Entropy>>,
    generated: Vec<Rc<ValueGenerator>>,
    forced: Option<Vec<Value>>,
    cursor: usize,
    max_entropy_size: usize,
}

impl TestCase {
    /// Produces a value of the given type. During replay and shrinking the
    /// value is pinned to the corresponding recorded one instead of being
    /// drawn from live entropy.
    pub fn arbitrary(&mut self, ty: &TypeExpr) -> Result<Value, CaseError> {
        match &self.forced {
            Some(values) => {
                if self.cursor >= values.len() {
                    // The record asked for fewer values than the predicate
                    // wants; it cannot stand for this case.
                    return Err(CaseError::Rejected);
                }
                let pinned = values[self.cursor].clone();
                self.cursor += 1;
                let gen = self.registry.instantiate(&self.entropy, ty).force(pinned);
                self.generated.push(gen.clone());
                Ok(gen.value())
            }
            None => {
                let gen = self.registry.instantiate(&self.entropy, ty);
                self.generated.push(gen.clone());
                let value = gen.value();
                if self.entropy.borrow().len() > self.max_entropy_size {
                    return Err(CaseError::Overrun);
                }
                Ok(value)
            }
        }
    }

    /// Discards the current case unless `condition` holds. Discarded cases
    /// are not failures and do not count toward the success target.
    pub fn assume(&mut self, condition: bool) -> Result<(), CaseError> {
        if condition {
            Ok(())
        } else {
            Err(CaseError::Rejected)
        }
    }
}

enum Outcome {
    Pass,
    Fail,
    Rejected,
    Overrun,
    Defect(String),
}

fn panic_message(err: Box<dyn Any + Send>) -> String {
    if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unrecognised panic payload".to_string()
    }
}

/// One property run: owns its entropy source, drives the three phases, and
/// accumulates the outcome.
pub struct Property {
    registry: Registry,
    entropy: Rc<RefCell<Entropy>>,
    config: Config,
    previous_failure: Vec<Value>,
    status: Status,
    generated: Vec<Rc<ValueGenerator>>,
    calls: usize,
    valid_cases: usize,
    trivial: bool,
    replayed: bool,
    defect: Option<String>,
    diagnostic: Option<Rc<dyn Fn(&[Value])>>,
}

impl Property {
    pub fn new(registry: Registry, config: Config, previous_failure: Vec<Value>) -> Self {
        let entropy = match config.seed {
            Some(seed) => Entropy::from_seed(seed),
            None => Entropy::random(),
        };
        Property {
            registry,
            entropy: Rc::new(RefCell::new(entropy)),
            config,
            previous_failure,
            status: Status::Unknown,
            generated: Vec::new(),
            calls: 0,
            valid_cases: 0,
            trivial: false,
            replayed: false,
            defect: None,
            diagnostic: None,
        }
    }

    /// Installs a callback invoked with the generated values after every
    /// falsifying predicate call.
    pub fn with_diagnostic(mut self, f: Rc<dyn Fn(&[Value])>) -> Self {
        self.diagnostic = Some(f);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn trivial(&self) -> bool {
        self.trivial
    }

    pub fn defect(&self) -> Option<&str> {
        self.defect.as_deref()
    }

    /// The values generated by the falsifying call, minimized if the shrink
    /// phase ran.
    pub fn counterexample(&self) -> Vec<Value> {
        self.generated.iter().map(|g| g.value()).collect()
    }

    pub fn run<F>(&mut self, predicate: &F)
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        self.replay(predicate);
        self.search(predicate);
        self.shrink(predicate);
    }

    fn attempt<F>(&mut self, predicate: &F, forced: Option<&[Value]>) -> (Outcome, Vec<Rc<ValueGenerator>>)
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        self.entropy.borrow_mut().reset();
        let mut case = TestCase {
            registry: self.registry.clone(),
            entropy: self.entropy.clone(),
            generated: Vec::new(),
            forced: forced.map(|v| v.to_vec()),
            cursor: 0,
            max_entropy_size: self.config.max_entropy_size,
        };
        self.calls += 1;
        let verdict = panic::catch_unwind(panic::AssertUnwindSafe(|| predicate(&mut case)));
        let outcome = match verdict {
            Ok(Ok(true)) => Outcome::Pass,
            Ok(Ok(false)) => Outcome::Fail,
            Ok(Err(CaseError::Rejected)) => Outcome::Rejected,
            Ok(Err(CaseError::Overrun)) => Outcome::Overrun,
            Ok(Err(CaseError::Defect(message))) => Outcome::Defect(message),
            Err(payload) => Outcome::Defect(panic_message(payload)),
        };
        if let (Outcome::Fail, Some(diagnostic)) = (&outcome, &self.diagnostic) {
            let values: Vec<Value> = case.generated.iter().map(|g| g.value()).collect();
            diagnostic(&values);
        }
        (outcome, case.generated)
    }

    /// Phase 1: re-run the predicate against the recorded counterexample.
    /// A still-failing record ends the run; a passing or rejected one is
    /// stale and the search starts from scratch.
    fn replay<F>(&mut self, predicate: &F)
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        if self.previous_failure.is_empty() {
            return;
        }
        trace!(
            "replaying a recorded failure of {} values",
            self.previous_failure.len()
        );
        let forced = self.previous_failure.clone();
        let (outcome, generated) = self.attempt(predicate, Some(&forced));
        match outcome {
            Outcome::Fail => {
                debug!("recorded failure still falsifies");
                self.status = Status::Interesting;
                self.generated = generated;
                self.replayed = true;
            }
            Outcome::Defect(message) => {
                self.status = Status::Invalid;
                self.defect = Some(message);
            }
            _ => {
                debug!("recorded failure is stale; searching afresh");
            }
        }
    }

    /// Phase 2: random search until a falsification, the success target, or
    /// a budget ends it.
    fn search<F>(&mut self, predicate: &F)
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        while self.continue_search() {
            let (outcome, generated) = self.attempt(predicate, None);
            let requested = generated.len();
            match outcome {
                Outcome::Pass => {
                    if self.status == Status::Unknown {
                        self.status = Status::Valid;
                    }
                    self.valid_cases += 1;
                }
                Outcome::Fail => {
                    debug!("falsified after {} valid cases", self.valid_cases);
                    self.status = Status::Interesting;
                    self.generated = generated;
                }
                Outcome::Rejected => {
                    trace!("case rejected by assume");
                }
                Outcome::Overrun => {
                    self.status = Status::Overrun;
                }
                Outcome::Defect(message) => {
                    self.status = Status::Invalid;
                    self.defect = Some(message);
                }
            }
            // Hitting the call bound on the final valid case is still a
            // completed run, not exhaustion.
            if self.status.searchable()
                && self.valid_cases < self.config.max_success
                && self.calls >= self.config.max_success * (self.config.max_discard_ratio + 1)
            {
                self.status = Status::Exhausted;
            }
            if requested == 0 {
                self.trivial = true;
            }
        }
    }

    fn continue_search(&self) -> bool {
        !self.trivial && self.status.searchable() && self.valid_cases < self.config.max_success
    }

    /// Phase 3: walk the cross product of per-value shrink candidates in
    /// ascending total-score order; the first combination that still
    /// falsifies is minimal among those tried and becomes the result.
    fn shrink<F>(&mut self, predicate: &F)
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        if self.status != Status::Interesting || self.replayed || self.generated.is_empty() {
            return;
        }

        let mut best = self.generated.clone();
        let best_score = best
            .iter()
            .fold(0u64, |acc, g| acc.saturating_add(g.score()));

        // Each slot offers its candidates plus the original value, so one
        // slot can vary while the others hold still.
        let slots: Vec<Vec<(u64, Value)>> = self
            .generated
            .iter()
            .map(|g| {
                let mut candidates = g.shrink_candidates();
                candidates.push((g.score(), g.value()));
                candidates
            })
            .collect();

        let mut combinations: Vec<Vec<(u64, Value)>> = vec![Vec::new()];
        for slot in &slots {
            let mut extended = Vec::with_capacity(combinations.len() * slot.len());
            for prefix in &combinations {
                for candidate in slot {
                    let mut combo = prefix.clone();
                    combo.push(candidate.clone());
                    extended.push(combo);
                }
            }
            combinations = extended;
        }

        let total = |combo: &[(u64, Value)]| {
            combo
                .iter()
                .fold(0u64, |acc, (score, _)| acc.saturating_add(*score))
        };
        combinations.sort_by(|a, b| total(a).cmp(&total(b)).then_with(|| a.cmp(b)));
        combinations.dedup();
        debug!(
            "shrink walk over {} combinations from best score {}",
            combinations.len(),
            best_score
        );

        let mut shrink_calls = 0;
        for combo in combinations {
            if shrink_calls >= self.config.max_shrink_calls {
                debug!("shrink budget exhausted after {} calls", shrink_calls);
                break;
            }
            if total(&combo) > best_score {
                continue;
            }
            let values: Vec<Value> = combo.into_iter().map(|(_, v)| v).collect();
            let (outcome, generated) = self.attempt(predicate, Some(&values));
            shrink_calls += 1;
            match outcome {
                Outcome::Fail => {
                    // Pre-sorted by score: the first hit is minimal among
                    // those tried.
                    trace!("shrunk to total score {}", total_of(&generated));
                    best = generated;
                    break;
                }
                Outcome::Defect(message) => {
                    self.status = Status::Invalid;
                    self.defect = Some(message);
                    break;
                }
                _ => {}
            }
        }
        self.generated = best;
    }

    /// A human-readable account of the outcome, covering every status.
    pub fn explain(&self) -> String {
        let account = match self.status {
            Status::Valid => format!(
                "The property was proved to satisfaction across {} valid cases.",
                self.valid_cases
            ),
            Status::Invalid => format!(
                "The property was determined to be invalid due to an unexpected error: {}",
                self.defect.as_deref().unwrap_or("unknown")
            ),
            Status::Overrun => format!(
                "The property attempted to draw more than {} values of entropy, violating \
                 its maximum size. This might be rectified by increasing max_entropy_size.",
                self.config.max_entropy_size
            ),
            Status::Unknown => "The property has not yet been tested.".to_string(),
            Status::Interesting => {
                let values = self
                    .counterexample()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "The property found the following counterexample after {} valid case{}:\n    [{}]",
                    self.valid_cases,
                    if self.valid_cases == 1 { "" } else { "s" },
                    values
                )
            }
            Status::Exhausted => format!(
                "The property was unable to generate {} test cases before generating {} \
                 rejected cases. This might be a problem with the property's assume conditions.",
                self.config.max_success,
                self.config.max_success * self.config.max_discard_ratio
            ),
        };
        if self.trivial {
            account
                + "\nThe test does not appear to use any generated values; consider reworking \
                   it to make use of arbitrary data."
        } else {
            account
        }
    }
}

fn total_of(generated: &[Rc<ValueGenerator>]) -> u64 {
    generated
        .iter()
        .fold(0u64, |acc, g| acc.saturating_add(g.score()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::core::ty;

    fn run_one<F>(config: Config, predicate: F) -> Property
    where
        F: Fn(&mut TestCase) -> Verdict,
    {
        let mut property = Property::new(Registry::with_builtins(), config, Vec::new());
        property.run(&predicate);
        property
    }

    #[test]
    fn a_tautology_is_valid() {
        let property = run_one(Config::default().seed(1), |case| {
            let n = case.arbitrary(&ty("u8"))?;
            Ok(n.as_u64().is_some())
        });
        assert_eq!(property.status(), Status::Valid);
        assert!(!property.trivial());
        assert_eq!(property.calls(), 100);
    }

    #[test]
    fn a_predicate_that_draws_nothing_is_trivial() {
        let property = run_one(Config::default().seed(2), |_| Ok(true));
        assert!(property.trivial());
        assert_eq!(property.calls(), 1);
        assert!(property.explain().contains("does not appear to use"));
    }

    #[test]
    fn a_panicking_predicate_is_invalid() {
        let property = run_one(Config::default().seed(3), |case| {
            let _ = case.arbitrary(&ty("u8"))?;
            panic!("boom");
        });
        assert_eq!(property.status(), Status::Invalid);
        assert_eq!(property.defect(), Some("boom"));
        assert!(property.explain().contains("boom"));
    }

    #[test]
    fn an_erring_predicate_is_invalid() {
        let property = run_one(Config::default().seed(4), |case| {
            let _ = case.arbitrary(&ty("u8"))?;
            Err(CaseError::Defect("io failure".to_string()))
        });
        assert_eq!(property.status(), Status::Invalid);
        assert_eq!(property.defect(), Some("io failure"));
    }

    #[test]
    fn impossible_assumptions_exhaust_the_run() {
        let config = Config::default().seed(5).max_success(10).max_discard_ratio(4);
        let property = run_one(config, |case| {
            let _ = case.arbitrary(&ty("u8"))?;
            case.assume(false)?;
            Ok(true)
        });
        assert_eq!(property.status(), Status::Exhausted);
        assert_eq!(property.calls(), 50);
        assert_eq!(property.valid_cases, 0);
    }

    #[test]
    fn entropy_hogs_overrun_the_budget() {
        let config = Config::default().seed(6).max_entropy_size(2);
        let property = run_one(config, |case| {
            let _ = case.arbitrary(&ty("vec").with(ty("u64")))?;
            Ok(true)
        });
        assert_eq!(property.status(), Status::Overrun);
        assert!(property.explain().contains("max_entropy_size"));
    }

    #[test]
    fn constant_falsehood_minimizes_completely() {
        let property = run_one(Config::default().seed(7), |case| {
            let _ = case.arbitrary(&ty("u32"))?;
            Ok(false)
        });
        assert_eq!(property.status(), Status::Interesting);
        assert_eq!(property.counterexample(), vec![Value::U32(0)]);
    }

    #[test]
    fn replay_short_circuits_when_the_record_still_fails() {
        let mut property = Property::new(
            Registry::with_builtins(),
            Config::default().seed(8),
            vec![Value::U8(77)],
        );
        property.run(&|case: &mut TestCase| {
            let n = case.arbitrary(&ty("u8"))?;
            Ok(n.as_u64() != Some(77))
        });
        assert_eq!(property.status(), Status::Interesting);
        assert_eq!(property.calls(), 1);
        assert_eq!(property.counterexample(), vec![Value::U8(77)]);
    }

    #[test]
    fn stale_records_are_discarded() {
        let mut property = Property::new(
            Registry::with_builtins(),
            Config::default().seed(9),
            vec![Value::U8(77)],
        );
        property.run(&|case: &mut TestCase| {
            let n = case.arbitrary(&ty("u8"))?;
            Ok(n.as_u64().is_some())
        });
        assert_eq!(property.status(), Status::Valid);
        assert_eq!(property.calls(), 101);
    }

    #[test]
    fn diagnostics_fire_on_every_falsification() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut property =
            Property::new(Registry::with_builtins(), Config::default().seed(10), Vec::new())
                .with_diagnostic(Rc::new(move |values: &[Value]| {
                    sink.borrow_mut().push(values.to_vec());
                }));
        property.run(&|case: &mut TestCase| {
            let _ = case.arbitrary(&ty("u8"))?;
            Ok(false)
        });
        assert_eq!(property.status(), Status::Interesting);
        let seen = seen.borrow();
        // The original falsification plus the winning shrink attempt.
        assert!(seen.len() >= 1);
        assert_eq!(seen.last(), Some(&property.counterexample()));
    }
}
