//! Built-in generators for characters, strings, and the container types.
//! Containers are repeated structures: instantiation draws a length and
//! folds that many fresh instances into the empty value, and shrinking runs
//! the chunk-removal scheme before shrinking elements in place.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::generators::core::{Constructor, Output, ValueGenerator};
use crate::generators::registry::Registry;
use crate::generators::shrinkers::{integral_shrink, list_shrink, map_shrink};
use crate::value::Value;

fn factor(score: u64) -> u64 {
    if score > 0 {
        score + 1
    } else {
        1
    }
}

fn char_gen(max_ord: u64) -> Constructor {
    Constructor::new(move |ctx| {
        Output::Value(Value::Char(char::from(ctx.sized(max_ord) as u8)))
    })
    .with_shrink(|_, v| {
        let ord = match v {
            Value::Char(c) => *c as i128,
            _ => return Vec::new(),
        };
        integral_shrink(ord)
            .into_iter()
            .filter(|c| *c >= 0)
            .map(|c| Value::Char(char::from(c as u8)))
            .collect()
    })
}

fn strings(registry: &mut Registry) {
    registry.register(
        "string",
        Constructor::new(|ctx| {
            Output::Value(Value::Str(char::from(ctx.sized(0xff) as u8).to_string()))
        })
        .with_shrink(|_, v| {
            let s = match v {
                Value::Str(s) => s,
                _ => return Vec::new(),
            };
            let ords: Vec<i128> = s.chars().map(|c| c as i128).collect();
            list_shrink(&|&x: &i128| integral_shrink(x), &ords)
                .into_iter()
                .map(|cand| {
                    Value::Str(
                        cand.into_iter()
                            .map(|t| char::from((t & 0xff) as u8))
                            .collect(),
                    )
                })
                .collect()
        })
        .with_score(|_, v| match v {
            Value::Str(s) => s
                .chars()
                .fold(1u64, |c, x| c.saturating_mul(factor(x as u64))),
            _ => 0,
        })
        .with_append(0, 0x20, |x, y| match (x, y) {
            (Value::Str(mut a), Value::Str(b)) => {
                a.push_str(&b);
                Value::Str(a)
            }
            (a, _) => a,
        })
        .with_empty(|| Value::Str(String::new())),
    );
}

fn elem_shrinks(params: &[Rc<ValueGenerator>], index: usize, value: &Value) -> Vec<Value> {
    match params.get(index) {
        Some(p) => p.shrinks_of(value),
        None => Vec::new(),
    }
}

fn elem_score(params: &[Rc<ValueGenerator>], index: usize, value: &Value) -> u64 {
    match params.get(index) {
        Some(p) => p.score_of(value),
        None => value.magnitude(),
    }
}

fn vecs(registry: &mut Registry) {
    registry.register(
        "vec",
        Constructor::new(|ctx| Output::Value(Value::Seq(vec![ctx.param_value(0)])))
            .with_shrink(|params, v| {
                let xs = match v {
                    Value::Seq(xs) => xs,
                    _ => return Vec::new(),
                };
                list_shrink(&|x: &Value| elem_shrinks(params, 0, x), xs)
                    .into_iter()
                    .map(Value::Seq)
                    .collect()
            })
            .with_score(|params, v| match v {
                Value::Seq(xs) => xs
                    .iter()
                    .fold(1u64, |c, x| c.saturating_mul(factor(elem_score(params, 0, x))))
                    .saturating_mul(xs.len() as u64),
                _ => 0,
            })
            .with_append(0, 0x10, |a, b| match (a, b) {
                (Value::Seq(mut xs), Value::Seq(ys)) => {
                    xs.extend(ys);
                    Value::Seq(xs)
                }
                (a, _) => a,
            })
            .with_empty(|| Value::Seq(Vec::new())),
    );
}

fn maps(registry: &mut Registry) {
    registry.register(
        "map",
        Constructor::new(|ctx| {
            let mut m = BTreeMap::new();
            let key = ctx.param_value(0);
            let value = ctx.param_value(1);
            m.insert(key, value);
            Output::Value(Value::Map(m))
        })
        .with_shrink(|params, v| {
            let m = match v {
                Value::Map(m) => m,
                _ => return Vec::new(),
            };
            let pairs: Vec<(Value, Value)> =
                m.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            let mut out: Vec<Value> = map_shrink(&pairs)
                .into_iter()
                .map(|cand| Value::Map(cand.into_iter().collect()))
                .collect();
            // Values shrink in place; keys are left alone so pairs cannot
            // collide and silently drop.
            for (i, (_, value)) in pairs.iter().enumerate() {
                for cand in elem_shrinks(params, 1, value) {
                    let mut shrunk = pairs.clone();
                    shrunk[i].1 = cand;
                    out.push(Value::Map(shrunk.into_iter().collect()));
                }
            }
            out
        })
        .with_score(|params, v| match v {
            Value::Map(m) => m.iter().fold(1u64, |c, (k, v)| {
                let sk = factor(elem_score(params, 0, k));
                let sv = factor(elem_score(params, 1, v));
                c.saturating_mul(sk.saturating_add(sv))
            }),
            _ => 0,
        })
        .with_append(0, 0x10, |a, b| match (a, b) {
            (Value::Map(mut xm), Value::Map(ym)) => {
                xm.extend(ym);
                Value::Map(xm)
            }
            (a, _) => a,
        })
        .with_empty(|| Value::Map(BTreeMap::new())),
    );
}

fn sets(registry: &mut Registry) {
    registry.register(
        "set",
        Constructor::new(|ctx| {
            let mut s = BTreeSet::new();
            s.insert(ctx.param_value(0));
            Output::Value(Value::Set(s))
        })
        .with_shrink(|params, v| {
            let s = match v {
                Value::Set(s) => s,
                _ => return Vec::new(),
            };
            let xs: Vec<Value> = s.iter().cloned().collect();
            list_shrink(&|x: &Value| elem_shrinks(params, 0, x), &xs)
                .into_iter()
                .map(|cand| Value::Set(cand.into_iter().collect()))
                .collect()
        })
        .with_score(|params, v| match v {
            Value::Set(s) => s
                .iter()
                .fold(1u64, |c, x| c.saturating_mul(factor(elem_score(params, 0, x))))
                .saturating_mul(s.len() as u64),
            _ => 0,
        })
        .with_append(0, 0x10, |a, b| match (a, b) {
            (Value::Set(mut xs), Value::Set(ys)) => {
                xs.extend(ys);
                Value::Set(xs)
            }
            (a, _) => a,
        })
        .with_empty(|| Value::Set(BTreeSet::new())),
    );
}

pub(crate) fn install(registry: &mut Registry) {
    registry.register("ascii_char", char_gen(0x7f));
    registry.register("char", char_gen(0xff));
    strings(registry);
    vecs(registry);
    maps(registry);
    sets(registry);
}
