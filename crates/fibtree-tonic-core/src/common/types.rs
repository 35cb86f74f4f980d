//! # Wire-level limits and conversions
//!
//! The protocol carries every value as a protobuf `int32`, while the
//! evaluator works in [`Fib`] (`u64`). This module pins down where the two
//! meet.
//!
//! ## Constants
//!
//! - [`MAX_INT32_INDEX`] - the largest `n` whose `fib(n)` fits an `int32`.
//!   Both `Number` and `Sequence` are capped at this index; servers may
//!   configure a lower cap but never a higher one.

use crate::{Error, Result};
use fibtree::Fib;

/// `fib(46) = 1_836_311_903` is the last term below `i32::MAX`.
pub const MAX_INT32_INDEX: i32 = 46;

/// Converts an evaluator value to its wire representation.
///
/// # Errors
///
/// Returns [`Error::OutOfRange`] if `value` does not fit an `int32`.
pub fn to_wire(value: Fib) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::OutOfRange {
        reason: format!("value {value} does not fit in int32"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fibtree::Sequence;

    #[test]
    fn the_last_representable_index_is_46() {
        let terms = Sequence::first(MAX_INT32_INDEX as usize + 1);
        assert!(to_wire(terms[MAX_INT32_INDEX as usize - 1]).is_ok());
        assert!(matches!(
            to_wire(terms[MAX_INT32_INDEX as usize]),
            Err(Error::OutOfRange { .. })
        ));
    }
}
