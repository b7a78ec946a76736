//! Built-in generators for structured numerics: ranges, rationals, and
//! complex numbers. These shrink component-wise: each structural component
//! offers its own candidates (the original value included, so the other
//! component can be held fixed), the cross product is taken, and only
//! strictly improving combinations survive.

use std::rc::Rc;

use crate::generators::core::{Constructor, Output, ValueGenerator};
use crate::generators::registry::Registry;
use crate::generators::shrinkers::{float_shrink, integral_shrink};
use crate::value::{float_score, Value};

fn endpoint_score(params: &[Rc<ValueGenerator>], value: &Value) -> u64 {
    match params.first() {
        Some(p) => p.score_of(value),
        None => value.magnitude(),
    }
}

fn ranges(registry: &mut Registry) {
    registry.register(
        "range",
        Constructor::new(|ctx| {
            let a = ctx.param_value(0);
            let b = ctx.fresh_param(0).value();
            // Endpoints are normalized so the value is well-formed whatever
            // the draw order produced.
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            Output::Value(Value::Range(Box::new(lo), Box::new(hi)))
        })
        .with_shrink(|params, v| {
            let (lo, hi) = match v {
                Value::Range(lo, hi) => (lo.as_ref(), hi.as_ref()),
                _ => return Vec::new(),
            };
            let original = endpoint_score(params, lo).saturating_add(endpoint_score(params, hi));
            let mut lo_candidates = match params.first() {
                Some(p) => p.shrinks_of(lo),
                None => Vec::new(),
            };
            lo_candidates.push(lo.clone());
            let mut hi_candidates = match params.first() {
                Some(p) => p.shrinks_of(hi),
                None => Vec::new(),
            };
            hi_candidates.push(hi.clone());

            let mut out = Vec::new();
            for l in &lo_candidates {
                for h in &hi_candidates {
                    let score =
                        endpoint_score(params, l).saturating_add(endpoint_score(params, h));
                    if score < original {
                        let (l, h) = if l <= h { (l, h) } else { (h, l) };
                        out.push(Value::Range(Box::new(l.clone()), Box::new(h.clone())));
                    }
                }
            }
            out
        })
        .with_score(|params, v| match v {
            Value::Range(lo, hi) => {
                endpoint_score(params, lo).saturating_add(endpoint_score(params, hi))
            }
            _ => 0,
        }),
    );
}

fn rationals(registry: &mut Registry) {
    registry.register(
        "rational",
        Constructor::new(|ctx| {
            let num = ctx.sized(0xffff_ffff) as u32 as i32 as i64;
            let den = ctx.sized(0xfffe) as i64 + 1;
            Output::Value(Value::Rational { num, den })
        })
        .with_shrink(|_, v| {
            let (num, den) = match v {
                Value::Rational { num, den } => (*num, *den),
                _ => return Vec::new(),
            };
            let original = num.unsigned_abs().saturating_add(den.unsigned_abs());
            let mut num_candidates: Vec<i64> = integral_shrink(num as i128)
                .into_iter()
                .map(|c| c as i64)
                .collect();
            num_candidates.push(num);
            let mut den_candidates: Vec<i64> = integral_shrink(den as i128)
                .into_iter()
                .filter(|c| *c >= 1)
                .map(|c| c as i64)
                .collect();
            den_candidates.push(den);

            let mut out = Vec::new();
            for &n in &num_candidates {
                for &d in &den_candidates {
                    if n.unsigned_abs().saturating_add(d.unsigned_abs()) < original {
                        out.push(Value::Rational { num: n, den: d });
                    }
                }
            }
            out
        })
        .with_score(|_, v| match v {
            Value::Rational { num, den } => {
                num.unsigned_abs().saturating_add(den.unsigned_abs())
            }
            _ => 0,
        }),
    );
}

fn complexes(registry: &mut Registry) {
    registry.register(
        "complex",
        Constructor::new(|ctx| {
            let re = f64::from_bits(ctx.sized(u64::MAX));
            let im = f64::from_bits(ctx.sized(u64::MAX));
            Output::Value(Value::Complex { re, im })
        })
        .with_shrink(|_, v| {
            let (re, im) = match v {
                Value::Complex { re, im } => (*re, *im),
                _ => return Vec::new(),
            };
            let original = float_score(re).saturating_add(float_score(im));
            let mut re_candidates = float_shrink(re);
            re_candidates.push(re);
            let mut im_candidates = float_shrink(im);
            im_candidates.push(im);

            let mut out = Vec::new();
            for &r in &re_candidates {
                for &i in &im_candidates {
                    if float_score(r).saturating_add(float_score(i)) < original {
                        out.push(Value::Complex { re: r, im: i });
                    }
                }
            }
            out
        })
        .with_score(|_, v| match v {
            Value::Complex { re, im } => float_score(*re).saturating_add(float_score(*im)),
            _ => 0,
        }),
    );
}

pub(crate) fn install(registry: &mut Registry) {
    ranges(registry);
    rationals(registry);
    complexes(registry);
}
