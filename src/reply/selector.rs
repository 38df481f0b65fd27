//! Strategies for picking one canned reply

use rand::Rng;

/// Picks an index in `0..choices`
///
/// `choices` is always at least 1.
pub trait ReplySelector: Send + Sync {
    fn select(&self, choices: usize) -> usize;
}

/// Uniform random choice
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl ReplySelector for RandomSelector {
    fn select(&self, choices: usize) -> usize {
        rand::thread_rng().gen_range(0..choices)
    }
}

/// Always the same index, wrapped into range
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedSelector(pub usize);

#[cfg(test)]
impl ReplySelector for FixedSelector {
    fn select(&self, choices: usize) -> usize {
        self.0 % choices
    }
}
