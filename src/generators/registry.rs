//! The tag-to-constructor registry and the instantiation protocol that
//! builds ready generators, including repeated structures and nested type
//! parameters.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::entropy::Entropy;
use crate::generators::core::{Constructor, TypeExpr, ValueGenerator};
use crate::generators::{collections, compound, numbers};

/// Immutable-after-init mapping from type tags to constructors. Built once,
/// then shared read-only by every property run; cloning is cheap and shares
/// the underlying table.
#[derive(Clone, Default)]
pub struct Registry {
    defs: Rc<HashMap<String, Rc<Constructor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// A registry preloaded with every built-in type tag.
    pub fn with_builtins() -> Self {
        let mut registry = Registry::new();
        numbers::install(&mut registry);
        collections::install(&mut registry);
        compound::install(&mut registry);
        registry
    }

    /// Installs a constructor for `tag`. Re-registering a tag replaces the
    /// previous constructor.
    pub fn register(&mut self, tag: impl Into<String>, def: Constructor) {
        Rc::make_mut(&mut self.defs).insert(tag.into(), Rc::new(def));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.defs.contains_key(tag)
    }

    fn lookup(&self, tag: &str) -> Rc<Constructor> {
        match self.defs.get(tag) {
            Some(def) => def.clone(),
            None => panic!(
                "no generator registered for type tag `{}`; add one with Registry::register",
                tag
            ),
        }
    }

    /// Builds a ready generator for `ty`, recursively instantiating one
    /// generator per parameter tag. Types with an append function are
    /// repeated structures: a count drawn in `bound_min..=bound_max` decides
    /// how many fresh instances (each with freshly instantiated parameters)
    /// get folded into the type's empty value.
    pub fn instantiate(
        &self,
        entropy: &Rc<RefCell<Entropy>>,
        ty: &TypeExpr,
    ) -> Rc<ValueGenerator> {
        trace!("instantiate {:?}", ty);
        let def = self.lookup(&ty.tag);
        let instantiate_params = || {
            ty.params
                .iter()
                .map(|param| self.instantiate(entropy, param))
                .collect::<Vec<_>>()
        };

        if def.append.is_none() {
            return ValueGenerator::new(self, entropy, ty, &def, instantiate_params(), None);
        }

        let count = self.repetitions(entropy, &def);
        let base = self.empty_base(entropy, ty, &def, instantiate_params());
        for _ in 0..count {
            let item = ValueGenerator::new(self, entropy, ty, &def, instantiate_params(), None);
            base.append(&item);
        }
        base
    }

    fn repetitions(&self, entropy: &Rc<RefCell<Entropy>>, def: &Rc<Constructor>) -> u64 {
        let span = def.bound_max - def.bound_min;
        if span == 0 {
            return def.bound_min;
        }
        entropy.borrow_mut().draw(span) + def.bound_min
    }

    fn empty_base(
        &self,
        entropy: &Rc<RefCell<Entropy>>,
        ty: &TypeExpr,
        def: &Rc<Constructor>,
        params: Vec<Rc<ValueGenerator>>,
    ) -> Rc<ValueGenerator> {
        let preset = def.empty.as_ref().map(|f| f());
        ValueGenerator::new(self, entropy, ty, def, params, preset)
    }
}
