//! Successor selection
//!
//! At a loop boundary a clip with several successors hands off to one of
//! them, chosen uniformly at random. The choice is a trait so tests and
//! offline renders can make it deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Chooses the next clip among a clip's successors
pub trait SuccessorPicker: Send {
    /// Index into `successors`; `None` only when `successors` is empty
    fn pick(&mut self, successors: &[String]) -> Option<usize>;
}

/// Uniform random choice
#[derive(Debug)]
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    /// Seeded for reproducible sessions, or from OS entropy when `seed` is `None`
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Default for RandomPicker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SuccessorPicker for RandomPicker {
    fn pick(&mut self, successors: &[String]) -> Option<usize> {
        if successors.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(0..successors.len()))
        }
    }
}

/// Picks clips by name from a script, then the first successor
///
/// A scripted name that is not among the successors is skipped.
#[derive(Debug, Default)]
pub struct ScriptedPicker {
    script: VecDeque<String>,
}

impl ScriptedPicker {
    /// Create a picker that follows `script`
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(Into::into).collect(),
        }
    }
}

impl SuccessorPicker for ScriptedPicker {
    fn pick(&mut self, successors: &[String]) -> Option<usize> {
        if successors.is_empty() {
            return None;
        }
        while let Some(name) = self.script.pop_front() {
            if let Some(index) = successors.iter().position(|s| *s == name) {
                return Some(index);
            }
        }
        Some(0)
    }
}
