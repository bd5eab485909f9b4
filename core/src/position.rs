//! Logical clock and commit ordering types.
//!
//! The ledger's only notion of time is the block height. Every committed event
//! additionally gets a log sequence number, so `(height, sequence)` is a total
//! order over the whole event log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height: the ledger's logical clock.
///
/// # Examples
///
/// ```
/// use seatsale_core::position::BlockHeight;
///
/// let h1 = BlockHeight::new(1);
/// assert_eq!(h1.next(), BlockHeight::new(2));
/// assert_eq!(h1 + 9, BlockHeight::new(10));
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// The genesis height
    pub const GENESIS: Self = Self(0);

    /// Create a new `BlockHeight`
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the height value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The following block
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for BlockHeight {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<BlockHeight> for u64 {
    fn from(height: BlockHeight) -> Self {
        height.0
    }
}

/// Saturating addition of a block count.
impl std::ops::Add<u64> for BlockHeight {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

/// Where an event sits in the event log.
///
/// Ordered first by block height, then by the log-wide sequence number, which
/// also orders events committed inside the same block.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitPosition {
    /// Block the event was committed in
    pub height: BlockHeight,
    /// Log-wide sequence number, strictly increasing in append order
    pub sequence: u64,
}

impl CommitPosition {
    /// Creates a new `CommitPosition`
    #[must_use]
    pub const fn new(height: BlockHeight, sequence: u64) -> Self {
        Self { height, sequence }
    }
}

impl fmt::Display for CommitPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.height, self.sequence)
    }
}
