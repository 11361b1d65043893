//! LRU-K (K = 2) victim selection.
//!
//! Every frame remembers the logical time of its two most recent pins.
//! Among unpinned candidates:
//!
//! ```text
//! cold = fewer than 2 recorded pins (second_last == INFINITE)
//! warm = both timestamps set
//!
//! any cold?  evict the cold frame with the oldest `last`
//! else       evict the warm frame with the oldest `second_last`
//! ```
//!
//! A page touched once is always preferred for eviction over a page touched
//! twice, however recent that single touch was.

use crate::common::FrameId;

/// Timestamp meaning "no recorded access".
pub const INFINITE: u64 = u64::MAX;

/// The two most recent pin timestamps of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessHistory {
    pub last: u64,
    pub second_last: u64,
}

impl AccessHistory {
    /// History of a frame that has never been pinned since its last reset.
    pub const EMPTY: AccessHistory = AccessHistory {
        last: INFINITE,
        second_last: INFINITE,
    };

    /// Fewer than two accesses recorded.
    #[inline]
    pub fn is_cold(&self) -> bool {
        self.second_last == INFINITE
    }

    /// History after one more access at `now`.
    #[inline]
    pub fn record(self, now: u64) -> AccessHistory {
        AccessHistory {
            last: now,
            second_last: self.last,
        }
    }
}

impl Default for AccessHistory {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Stateless LRU-2 policy over a snapshot of candidate frames.
///
/// The pool owns the access history (it lives in each frame), so the
/// replacer only ranks what it is shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct LruKReplacer;

impl LruKReplacer {
    pub fn new() -> Self {
        LruKReplacer
    }

    /// Pick the frame to evict, or `None` if there are no candidates.
    ///
    /// Callers pass only unpinned, assigned frames.
    pub fn select_victim<I>(&self, candidates: I) -> Option<FrameId>
    where
        I: IntoIterator<Item = (FrameId, AccessHistory)>,
    {
        let mut coldest: Option<(u64, FrameId)> = None;
        let mut warmest: Option<(u64, FrameId)> = None;

        for (frame_id, history) in candidates {
            if history.is_cold() {
                let key = (history.last, frame_id);
                if coldest.map_or(true, |best| key < best) {
                    coldest = Some(key);
                }
            } else {
                let key = (history.second_last, frame_id);
                if warmest.map_or(true, |best| key < best) {
                    warmest = Some(key);
                }
            }
        }

        coldest.or(warmest).map(|(_, frame_id)| frame_id)
    }
}
