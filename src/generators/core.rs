//! The generator machinery itself: registered constructors, instantiated
//! value generators, and the context handed to a constructor while it runs.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::entropy::Entropy;
use crate::generators::registry::Registry;
use crate::value::Value;

/// Resolution steps allowed before a constructor that keeps deferring to
/// other generators is declared non-terminating.
pub const MAX_RESOLVE_DEPTH: usize = 64;

/// A type tag with zero or more parameter tags, e.g. `map` of `string` to
/// `vec` of `i8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub tag: String,
    pub params: Vec<TypeExpr>,
}

impl TypeExpr {
    pub fn new(tag: impl Into<String>) -> Self {
        TypeExpr {
            tag: tag.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter type, returning the extended expression.
    pub fn with(mut self, param: TypeExpr) -> Self {
        self.params.push(param);
        self
    }
}

/// Shorthand for an unparameterized [`TypeExpr`].
pub fn ty(tag: &str) -> TypeExpr {
    TypeExpr::new(tag)
}

/// What a constructor returns: either a terminal value, or another
/// generator to resolve in its place.
pub enum Output {
    Value(Value),
    Pending(Rc<ValueGenerator>),
}

pub type ConstructFn = Box<dyn Fn(&mut GenCtx<'_>) -> Output>;
pub type ShrinkFn = Box<dyn Fn(&[Rc<ValueGenerator>], &Value) -> Vec<Value>>;
pub type ScoreFn = Box<dyn Fn(&[Rc<ValueGenerator>], &Value) -> u64>;
pub type AppendFn = Box<dyn Fn(Value, Value) -> Value>;
pub type EmptyFn = Box<dyn Fn() -> Value>;

/// A registered recipe for one type tag: how to construct a value, and
/// optionally how to shrink, score, and build repeated structures.
pub struct Constructor {
    pub(crate) construct: ConstructFn,
    pub(crate) shrink: ShrinkFn,
    pub(crate) score: ScoreFn,
    pub(crate) append: Option<AppendFn>,
    pub(crate) empty: Option<EmptyFn>,
    pub(crate) bound_min: u64,
    pub(crate) bound_max: u64,
}

impl Constructor {
    pub fn new(construct: impl Fn(&mut GenCtx<'_>) -> Output + 'static) -> Self {
        Constructor {
            construct: Box::new(construct),
            shrink: Box::new(|_, v| vec![v.clone()]),
            score: Box::new(|_, v| v.magnitude()),
            append: None,
            empty: None,
            bound_min: 0,
            bound_max: 1,
        }
    }

    /// Overrides the shrink function. It receives the parameter generators
    /// (whose own shrink/score functions it may call) and the value.
    pub fn with_shrink(
        mut self,
        f: impl Fn(&[Rc<ValueGenerator>], &Value) -> Vec<Value> + 'static,
    ) -> Self {
        self.shrink = Box::new(f);
        self
    }

    /// Overrides the score function. Defaults to absolute magnitude.
    pub fn with_score(
        mut self,
        f: impl Fn(&[Rc<ValueGenerator>], &Value) -> u64 + 'static,
    ) -> Self {
        self.score = Box::new(f);
        self
    }

    /// Declares this a repeated structure: instantiation draws a count in
    /// `bound_min..=bound_max` and folds that many fresh instances into the
    /// empty value with `f`.
    pub fn with_append(
        mut self,
        bound_min: u64,
        bound_max: u64,
        f: impl Fn(Value, Value) -> Value + 'static,
    ) -> Self {
        assert!(
            bound_min <= bound_max,
            "append bounds are inverted: {} > {}",
            bound_min,
            bound_max
        );
        self.bound_min = bound_min;
        self.bound_max = bound_max;
        self.append = Some(Box::new(f));
        self
    }

    /// The base value repeated structures start from.
    pub fn with_empty(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.empty = Some(Box::new(f));
        self
    }
}

/// Handed to a constructor while it runs: bounded draws, parameter access,
/// and instantiation of further generators.
pub struct GenCtx<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) entropy: &'a Rc<RefCell<Entropy>>,
    pub(crate) trace: &'a mut Vec<u64>,
    pub(crate) params: &'a [Rc<ValueGenerator>],
}

impl<'a> GenCtx<'a> {
    /// Draws a value in `0..=max`, recording it in the generator's own
    /// sub-trace as well as the run's trace.
    pub fn sized(&mut self, max: u64) -> u64 {
        let value = self.entropy.borrow_mut().draw(max);
        self.trace.push(value);
        value
    }

    /// Picks one of the given items uniformly.
    pub fn pick<'b, T>(&mut self, items: &'b [T]) -> &'b T {
        assert!(!items.is_empty(), "pick requires at least one item");
        let index = self.sized(items.len() as u64 - 1) as usize;
        &items[index]
    }

    /// The realized value of the `index`th parameter generator.
    pub fn param_value(&self, index: usize) -> Value {
        self.params[index].value()
    }

    /// A freshly instantiated generator of the `index`th parameter's type,
    /// for compound values that need more than one draw per parameter.
    pub fn fresh_param(&mut self, index: usize) -> Rc<ValueGenerator> {
        let ty = self.params[index].type_expr().clone();
        self.registry.instantiate(self.entropy, &ty)
    }

    /// Instantiates any registered type; the usual way to defer from one
    /// constructor to another via [`Output::Pending`].
    pub fn instantiate(&mut self, ty: &TypeExpr) -> Rc<ValueGenerator> {
        self.registry.instantiate(self.entropy, ty)
    }
}

/// An instantiated generator: owns its entropy sub-trace, shares its
/// parameter generators read-only, and memoizes its value once computed.
pub struct ValueGenerator {
    ty: TypeExpr,
    def: Rc<Constructor>,
    params: Vec<Rc<ValueGenerator>>,
    registry: Registry,
    entropy: Rc<RefCell<Entropy>>,
    trace: RefCell<Vec<u64>>,
    value: RefCell<Option<Value>>,
}

impl ValueGenerator {
    pub(crate) fn new(
        registry: &Registry,
        entropy: &Rc<RefCell<Entropy>>,
        ty: &TypeExpr,
        def: &Rc<Constructor>,
        params: Vec<Rc<ValueGenerator>>,
        preset: Option<Value>,
    ) -> Rc<Self> {
        Rc::new(ValueGenerator {
            ty: ty.clone(),
            def: def.clone(),
            params,
            registry: registry.clone(),
            entropy: entropy.clone(),
            trace: RefCell::new(Vec::new()),
            value: RefCell::new(preset),
        })
    }

    pub fn type_expr(&self) -> &TypeExpr {
        &self.ty
    }

    /// The draws this generator consumed while constructing its value.
    pub fn trace(&self) -> Vec<u64> {
        self.trace.borrow().clone()
    }

    fn memoized(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    fn construct_raw(&self) -> Output {
        let mut trace = self.trace.borrow_mut();
        let mut ctx = GenCtx {
            registry: &self.registry,
            entropy: &self.entropy,
            trace: &mut *trace,
            params: &self.params,
        };
        (self.def.construct)(&mut ctx)
    }

    /// Forces evaluation, resolving deferred generators until a terminal
    /// value is produced, and memoizes the result.
    pub fn value(&self) -> Value {
        if let Some(v) = self.memoized() {
            return v;
        }
        let mut output = self.construct_raw();
        for _ in 0..MAX_RESOLVE_DEPTH {
            match output {
                Output::Value(v) => {
                    *self.value.borrow_mut() = Some(v.clone());
                    return v;
                }
                Output::Pending(gen) => {
                    output = match gen.memoized() {
                        Some(v) => Output::Value(v),
                        None => gen.construct_raw(),
                    };
                }
            }
        }
        panic!(
            "generator for type tag `{}` did not produce a terminal value within {} resolution steps",
            self.ty.tag, MAX_RESOLVE_DEPTH
        );
    }

    /// A new generator pinned to `value`, keeping this one's type
    /// parameters so scoring and shrinking stay meaningful.
    pub fn force(&self, value: Value) -> Rc<ValueGenerator> {
        Rc::new(ValueGenerator {
            ty: self.ty.clone(),
            def: self.def.clone(),
            params: self.params.clone(),
            registry: self.registry.clone(),
            entropy: self.entropy.clone(),
            trace: RefCell::new(Vec::new()),
            value: RefCell::new(Some(value)),
        })
    }

    /// Folds another instance into this one via the registered append
    /// function; a no-op for types without one.
    pub(crate) fn append(&self, other: &ValueGenerator) {
        if let Some(append) = &self.def.append {
            let combined = append(self.value(), other.value());
            *self.value.borrow_mut() = Some(combined);
            let mut trace = self.trace.borrow_mut();
            trace.extend(other.trace.borrow().iter());
        }
    }

    pub fn score(&self) -> u64 {
        let value = self.value();
        self.score_of(&value)
    }

    /// Scores an arbitrary value with this generator's score function.
    pub fn score_of(&self, value: &Value) -> u64 {
        (self.def.score)(&self.params, value)
    }

    /// Raw shrink output for an arbitrary value, unfiltered.
    pub fn shrinks_of(&self, value: &Value) -> Vec<Value> {
        (self.def.shrink)(&self.params, value)
    }

    /// Scored shrink candidates: only those no more complex than the
    /// current value, ascending by score, deduplicated.
    pub fn shrink_candidates(&self) -> Vec<(u64, Value)> {
        let original = self.value();
        let bar = self.score_of(&original);
        let mut candidates: Vec<(u64, Value)> = self
            .shrinks_of(&original)
            .into_iter()
            .map(|c| (self.score_of(&c), c))
            .filter(|(score, _)| *score <= bar)
            .collect();
        candidates.sort();
        candidates.dedup();
        debug!(
            "{} shrink candidates for `{}` below score {}",
            candidates.len(),
            self.ty.tag,
            bar
        );
        candidates
    }
}

impl fmt::Debug for ValueGenerator {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ValueGenerator")
            .field("ty", &self.ty)
            .field("value", &self.value.borrow())
            .finish()
    }
}
