//! Built-in generators for the fixed-width numeric types and booleans.
//! Signed widths decode two's complement from raw entropy bits so random
//! draws shrink toward zero; floats are built from raw bit patterns so the
//! whole representable range (NaN and subnormals included) is reachable.

use crate::generators::core::{Constructor, Output};
use crate::generators::registry::Registry;
use crate::generators::shrinkers::{float_shrink, integral_shrink};
use crate::value::{float_score, Value};

macro_rules! signed_integer_gen {
    ($registry:expr, $tag:expr, $variant:ident, $ty:ty, $uty:ty, $mask:expr) => {
        $registry.register(
            $tag,
            Constructor::new(|ctx| {
                let bits = ctx.sized($mask);
                Output::Value(Value::$variant(bits as $uty as $ty))
            })
            .with_shrink(|_, v| {
                let x = match v {
                    Value::$variant(n) => *n as i128,
                    _ => return Vec::new(),
                };
                integral_shrink(x)
                    .into_iter()
                    .map(|c| Value::$variant(c as $ty))
                    .collect()
            }),
        );
    };
}

macro_rules! unsigned_integer_gen {
    ($registry:expr, $tag:expr, $variant:ident, $ty:ty, $mask:expr) => {
        $registry.register(
            $tag,
            Constructor::new(|ctx| Output::Value(Value::$variant(ctx.sized($mask) as $ty)))
                .with_shrink(|_, v| {
                    let x = match v {
                        Value::$variant(n) => *n as i128,
                        _ => return Vec::new(),
                    };
                    integral_shrink(x)
                        .into_iter()
                        .filter(|c| *c >= 0)
                        .map(|c| Value::$variant(c as $ty))
                        .collect()
                }),
        );
    };
}

// Candidates are pre-filtered to strictly smaller scores; NaN and infinity
// score zero, so once a value goes non-finite it has nowhere left to go.
macro_rules! float_gen {
    ($registry:expr, $tag:expr, $variant:ident, $ty:ty, $bits:ty, $mask:expr) => {
        $registry.register(
            $tag,
            Constructor::new(|ctx| {
                let bits = ctx.sized($mask);
                Output::Value(Value::$variant(<$ty>::from_bits(bits as $bits)))
            })
            .with_shrink(|_, v| {
                let x = match v {
                    Value::$variant(f) => *f as f64,
                    _ => return Vec::new(),
                };
                let bar = float_score(x);
                float_shrink(x)
                    .into_iter()
                    .filter(|c| float_score(*c) < bar)
                    .map(|c| Value::$variant(c as $ty))
                    .collect()
            }),
        );
    };
}

pub(crate) fn install(registry: &mut Registry) {
    signed_integer_gen!(registry, "i8", I8, i8, u8, 0xff);
    signed_integer_gen!(registry, "i16", I16, i16, u16, 0xffff);
    signed_integer_gen!(registry, "i32", I32, i32, u32, 0xffff_ffff);
    signed_integer_gen!(registry, "i64", I64, i64, u64, u64::MAX);

    unsigned_integer_gen!(registry, "u8", U8, u8, 0xff);
    unsigned_integer_gen!(registry, "u16", U16, u16, 0xffff);
    unsigned_integer_gen!(registry, "u32", U32, u32, 0xffff_ffff);
    unsigned_integer_gen!(registry, "u64", U64, u64, u64::MAX);

    float_gen!(registry, "f32", F32, f32, u32, 0xffff_ffff);
    float_gen!(registry, "f64", F64, f64, u64, u64::MAX);

    registry.register(
        "bool",
        Constructor::new(|ctx| Output::Value(Value::Bool(ctx.sized(1) == 1)))
            .with_shrink(|_, _| vec![Value::Bool(false)])
            .with_score(|_, _| 1),
    );
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::entropy::Entropy;
    use crate::generators::core::{ty, ValueGenerator};
    use crate::generators::registry::Registry;
    use crate::value::Value;

    fn forced(tag: &str, v: Value) -> Rc<ValueGenerator> {
        let registry = Registry::with_builtins();
        let entropy = Rc::new(RefCell::new(Entropy::from_seed(0)));
        registry.instantiate(&entropy, &ty(tag)).force(v)
    }

    #[test]
    fn i8_candidates_respect_the_shrink_laws() {
        for &n in &[i8::MIN, -100, -1, 0, 1, 37, i8::MAX] {
            for (score, v) in forced("i8", Value::I8(n)).shrink_candidates() {
                let x = v.as_i64().expect("an i8 candidate");
                assert!(x.unsigned_abs() <= n.unsigned_abs() as u64);
                assert_eq!(score, x.unsigned_abs());
                if n < 0 {
                    assert!(x <= 1);
                } else {
                    assert!(x >= -1);
                }
            }
        }
    }

    #[test]
    fn i64_candidates_respect_the_shrink_laws() {
        for &n in &[i64::MIN, -0x1_0000_0001, -1, 0, 1, 0x7654_3210] {
            for (score, v) in forced("i64", Value::I64(n)).shrink_candidates() {
                let x = v.as_i64().expect("an i64 candidate");
                assert!(x.unsigned_abs() <= n.unsigned_abs());
                assert_eq!(score, x.unsigned_abs());
            }
        }
    }

    #[test]
    fn unsigned_candidates_never_go_negative() {
        for &n in &[0u64, 1, 2, 0xffff, u64::MAX] {
            for (score, v) in forced("u64", Value::U64(n)).shrink_candidates() {
                let x = v.as_u64().expect("a u64 candidate");
                assert!(x <= n);
                assert_eq!(score, x);
            }
        }
    }

    #[test]
    fn nonzero_integers_shrink_towards_zero() {
        let candidates = forced("i16", Value::I16(300)).shrink_candidates();
        assert_eq!(candidates.first().map(|(s, _)| *s), Some(0));
    }

    #[test]
    fn float_candidates_strictly_reduce_the_score() {
        for &x in &[-1234.5f64, 2.0, 1e9] {
            let bar = x.abs().ceil() as u64;
            let candidates = forced("f64", Value::F64(x)).shrink_candidates();
            assert!(!candidates.is_empty());
            for (score, _) in candidates {
                assert!(score < bar);
            }
        }
    }

    #[test]
    fn float_candidates_include_the_non_finite_poles_at_score_zero() {
        let candidates = forced("f64", Value::F64(100.5)).shrink_candidates();
        assert!(candidates
            .iter()
            .any(|(s, v)| *s == 0 && v.as_f64().map(f64::is_nan).unwrap_or(false)));
        assert!(candidates
            .iter()
            .any(|(s, v)| *s == 0 && v.as_f64() == Some(f64::INFINITY)));
    }

    #[test]
    fn non_finite_floats_have_nothing_simpler() {
        assert!(forced("f64", Value::F64(f64::NAN))
            .shrink_candidates()
            .is_empty());
        assert!(forced("f32", Value::F32(f32::INFINITY))
            .shrink_candidates()
            .is_empty());
    }

    #[test]
    fn bools_shrink_to_false() {
        let candidates = forced("bool", Value::Bool(true)).shrink_candidates();
        assert_eq!(candidates, vec![(1, Value::Bool(false))]);
    }
}
