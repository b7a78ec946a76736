use std::cell::RefCell;
use std::rc::Rc;

use refute::entropy::Entropy;
use refute::generators::{ty, Registry, TypeExpr};
use refute::Value;

fn init_logger() {
    let _ = env_logger::try_init();
}

fn builtin_exprs() -> Vec<TypeExpr> {
    vec![
        ty("bool"),
        ty("i8"),
        ty("i16"),
        ty("i32"),
        ty("i64"),
        ty("u8"),
        ty("u16"),
        ty("u32"),
        ty("u64"),
        ty("f32"),
        ty("f64"),
        ty("ascii_char"),
        ty("char"),
        ty("string"),
        ty("vec").with(ty("i16")),
        ty("map").with(ty("u8")).with(ty("string")),
        ty("set").with(ty("u8")),
        ty("range").with(ty("i32")),
        ty("rational"),
        ty("complex"),
        ty("map").with(ty("string")).with(ty("vec").with(ty("i8"))),
    ]
}

fn container_len(v: &Value) -> usize {
    match v {
        Value::Str(s) => s.chars().count(),
        Value::Seq(xs) => xs.len(),
        Value::Map(m) => m.len(),
        Value::Set(s) => s.len(),
        _ => 0,
    }
}

#[test]
fn every_builtin_reproduces_from_its_recorded_trace() {
    init_logger();
    let registry = Registry::with_builtins();
    for ty_expr in builtin_exprs() {
        for seed in 0..8 {
            let live = Rc::new(RefCell::new(Entropy::from_seed(seed)));
            let gen = registry.instantiate(&live, &ty_expr);
            let value = gen.value();
            let trace = live.borrow().trace().to_vec();

            let replay = Rc::new(RefCell::new(Entropy::replay(trace)));
            let gen = registry.instantiate(&replay, &ty_expr);
            assert_eq!(
                gen.value(),
                value,
                "replay diverged for {:?} with seed {}",
                ty_expr,
                seed
            );
        }
    }
}

#[test]
fn seeded_sources_generate_identical_values() {
    init_logger();
    let registry = Registry::with_builtins();
    for ty_expr in builtin_exprs() {
        let a = {
            let entropy = Rc::new(RefCell::new(Entropy::from_seed(42)));
            registry.instantiate(&entropy, &ty_expr).value()
        };
        let b = {
            let entropy = Rc::new(RefCell::new(Entropy::from_seed(42)));
            registry.instantiate(&entropy, &ty_expr).value()
        };
        assert_eq!(a, b, "seed 42 disagreed with itself for {:?}", ty_expr);
    }
}

#[test]
fn forcing_pins_the_value_regardless_of_entropy_state() {
    init_logger();
    let registry = Registry::with_builtins();
    let entropy = Rc::new(RefCell::new(Entropy::from_seed(17)));
    let pinned = vec![
        (ty("i8"), Value::I8(-5)),
        (ty("u64"), Value::U64(u64::MAX)),
        (ty("f64"), Value::F64(f64::NAN)),
        (ty("string"), Value::Str("forced".into())),
        (
            ty("vec").with(ty("u8")),
            Value::Seq(vec![Value::U8(9), Value::U8(0)]),
        ),
    ];
    for (ty_expr, v) in pinned {
        let forced = registry.instantiate(&entropy, &ty_expr).force(v.clone());
        entropy.borrow_mut().draw(0xffff);
        assert_eq!(forced.value(), v, "force failed to pin {:?}", ty_expr);
    }
}

#[test]
fn integral_candidates_obey_the_magnitude_and_score_laws() {
    init_logger();
    let registry = Registry::with_builtins();
    let entropy = Rc::new(RefCell::new(Entropy::from_seed(7)));
    for _ in 0..64 {
        let gen = registry.instantiate(&entropy, &ty("i32"));
        let n = gen.value().as_i64().expect("an i32");
        for (score, candidate) in gen.shrink_candidates() {
            let x = candidate.as_i64().expect("an i32 candidate");
            assert!(x.unsigned_abs() <= n.unsigned_abs());
            assert_eq!(score, x.unsigned_abs());
        }
    }
}

#[test]
fn container_candidates_obey_the_length_and_score_laws() {
    init_logger();
    let registry = Registry::with_builtins();
    let exprs = [
        ty("string"),
        ty("vec").with(ty("i16")),
        ty("map").with(ty("u8")).with(ty("u16")),
        ty("set").with(ty("u8")),
    ];
    for ty_expr in &exprs {
        let entropy = Rc::new(RefCell::new(Entropy::from_seed(99)));
        for _ in 0..16 {
            let gen = registry.instantiate(&entropy, ty_expr);
            let len = container_len(&gen.value());
            let bar = gen.score();
            for (score, candidate) in gen.shrink_candidates() {
                assert!(
                    container_len(&candidate) <= len,
                    "{:?} candidate grew",
                    ty_expr
                );
                assert!(score <= bar, "{:?} candidate got more complex", ty_expr);
            }
        }
    }
}

#[test]
fn candidate_lists_are_sorted_and_deduplicated() {
    init_logger();
    let registry = Registry::with_builtins();
    for ty_expr in builtin_exprs() {
        let entropy = Rc::new(RefCell::new(Entropy::from_seed(3)));
        let gen = registry.instantiate(&entropy, &ty_expr);
        let candidates = gen.shrink_candidates();
        for pair in candidates.windows(2) {
            assert!(pair[0].0 <= pair[1].0, "{:?} is out of order", ty_expr);
            assert!(pair[0] != pair[1], "{:?} has duplicates", ty_expr);
        }
    }
}
