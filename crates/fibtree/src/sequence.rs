use crate::Fib;

/// A restartable producer of consecutive Fibonacci terms.
///
/// Starting from the seed state `(0, 1)`, successive calls to
/// [`Sequence::advance`] yield `1, 1, 2, 3, 5, 8, ...`, i.e. `fib(1)`,
/// `fib(2)`, ... under the same 1-indexed convention the task tree uses. The
/// `k`-th call therefore agrees with evaluating `fib(k)` on a
/// [`TaskTree`](crate::TaskTree).
///
/// Terms saturate at `u64::MAX` past `fib(93)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sequence {
    prev: Fib,
    curr: Fib,
}

impl Default for Sequence {
    fn default() -> Self {
        Self { prev: 0, curr: 1 }
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps the state forward and returns the next term.
    pub fn advance(&mut self) -> Fib {
        let next = self.prev.saturating_add(self.curr);
        self.prev = self.curr;
        self.curr = next;
        self.prev
    }

    /// Rewinds to the seed state; the next `advance` yields `1` again.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Collects the first `count` terms.
    pub fn first(count: usize) -> Vec<Fib> {
        Self::new().take(count).collect()
    }
}

impl Iterator for Sequence {
    type Item = Fib;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.advance())
    }
}
