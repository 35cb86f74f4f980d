use core::time::Duration;

/// A result type for evaluator operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All ways an evaluation can end without producing a value.
///
/// Neither variant carries a partial result: once a tree is torn down its
/// intermediate sums are discarded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The deadline elapsed before the root of the task tree delivered a
    /// value. The token was fired and the tree is being torn down.
    #[error("computation did not finish within {budget:?}")]
    DeadlineExceeded { budget: Duration },

    /// The request token was fired by someone other than the deadline, for
    /// example a service-wide shutdown, and the root closed without a value.
    #[error("computation was cancelled before it finished")]
    Cancelled,
}
