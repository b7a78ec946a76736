//! The bounded random source every generator draws from. Each draw is
//! recorded, in order, into a trace; replaying a trace through the same
//! generator composition reproduces the same values.

use std::fmt;

use hex_slice::AsHex;
use log::trace;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

enum Source {
    Rng(XorShiftRng),
    Replay { draws: Vec<u64>, cursor: usize },
}

/// A seeded (or replayed) source of bounded draws with a recorded trace.
pub struct Entropy {
    source: Source,
    trace: Vec<u64>,
}

impl Entropy {
    /// Creates a source seeded deterministically from `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Entropy {
            source: Source::Rng(XorShiftRng::seed_from_u64(seed)),
            trace: Vec::new(),
        }
    }

    /// Creates a source with a randomly drawn seed.
    pub fn random() -> Self {
        Entropy::from_seed(rand::random())
    }

    /// Creates a source that serves the given draws back in order, yielding
    /// zero once they run out.
    pub fn replay(draws: Vec<u64>) -> Self {
        Entropy {
            source: Source::Replay { draws, cursor: 0 },
            trace: Vec::new(),
        }
    }

    /// Draws a value in `0..=max` and records it.
    pub fn draw(&mut self, max: u64) -> u64 {
        let value = match &mut self.source {
            Source::Rng(rng) => {
                if max == u64::MAX {
                    rng.gen::<u64>()
                } else {
                    rng.gen_range(0..=max)
                }
            }
            Source::Replay { draws, cursor } => {
                let raw = draws.get(*cursor).copied().unwrap_or(0);
                *cursor += 1;
                if max == u64::MAX {
                    raw
                } else {
                    raw % (max + 1)
                }
            }
        };
        trace!("draw(<= {:#x}) -> {:#x}", max, value);
        self.trace.push(value);
        value
    }

    /// The draws made so far, in order.
    pub fn trace(&self) -> &[u64] {
        &self.trace
    }

    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }

    /// Clears the trace ahead of a fresh attempt. The underlying random
    /// stream continues where it left off.
    pub fn reset(&mut self) {
        self.trace.clear();
    }
}

impl fmt::Debug for Entropy {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Entropy")
            .field("trace", &format_args!("{:x}", self.trace.as_hex()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_draw_in_order() {
        let mut e = Entropy::from_seed(1);
        let v0 = e.draw(0xff);
        let v1 = e.draw(0xffff);
        let v2 = e.draw(1);
        assert_eq!(e.trace(), &[v0, v1, v2]);
    }

    #[test]
    fn draws_respect_the_bound() {
        let mut e = Entropy::from_seed(2);
        for _ in 0..1024 {
            assert!(e.draw(16) <= 16);
        }
    }

    #[test]
    fn seeded_sources_agree() {
        let mut a = Entropy::from_seed(42);
        let mut b = Entropy::from_seed(42);
        for _ in 0..64 {
            assert_eq!(a.draw(0xffff), b.draw(0xffff));
        }
    }

    #[test]
    fn replay_reproduces_the_trace() {
        let mut live = Entropy::from_seed(3);
        for bound in &[0xffu64, 0xffff, 7, u64::MAX] {
            live.draw(*bound);
        }

        let mut replayed = Entropy::replay(live.trace().to_vec());
        for bound in &[0xffu64, 0xffff, 7, u64::MAX] {
            replayed.draw(*bound);
        }
        assert_eq!(live.trace(), replayed.trace());
    }

    #[test]
    fn exhausted_replay_yields_zero() {
        let mut e = Entropy::replay(vec![9]);
        assert_eq!(e.draw(0xff), 9);
        assert_eq!(e.draw(0xff), 0);
        assert_eq!(e.draw(0xff), 0);
    }

    #[test]
    fn reset_clears_the_trace_only() {
        let mut e = Entropy::from_seed(4);
        e.draw(0xff);
        e.reset();
        assert!(e.is_empty());
        e.draw(0xff);
        assert_eq!(e.len(), 1);
    }
}
