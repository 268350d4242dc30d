/// In-memory ordered bar series for a single asset
///
/// The store is the canonical source of what the rendering surface shows.
/// Invariants: bars are sorted ascending by `time`, no two bars share a
/// `time`, and only the last bar is still updatable.
use tracing::debug;

use crate::types::Bar;

/// Outcome of merging a live bar into the series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// Store was empty; the bar became the first element
    Inserted,
    /// Bar time matched the last stored bar; overwritten in place
    Updated,
    /// Bar time was strictly greater than the last stored bar; appended
    Appended,
    /// Bar time was older than the last stored bar; discarded
    Stale,
}

/// Ordered, timestamp-keyed bar series for exactly one symbol
pub struct SeriesStore {
    symbol: String,
    bars: Vec<Bar>,
}

impl SeriesStore {
    pub fn new(symbol: String) -> Self {
        SeriesStore {
            symbol,
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Replace the entire series with a freshly loaded history window
    ///
    /// Input order is not trusted: bars are sorted ascending by `time` and
    /// deduplicated by `time` with last-write-wins on upstream duplicates.
    pub fn replace(&mut self, bars: Vec<Bar>) {
        let mut incoming = bars;
        // Stable sort keeps later duplicates after earlier ones, so the
        // dedup pass below resolves duplicates last-write-wins.
        incoming.sort_by_key(|bar| bar.time);

        self.bars.clear();
        for bar in incoming {
            match self.bars.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => self.bars.push(bar),
            }
        }

        debug!(
            "Replaced series for {}: {} bars",
            self.symbol,
            self.bars.len()
        );
    }

    /// Merge the latest live bar into the tail of the series
    ///
    /// Out-of-order bars are discarded rather than inserted mid-series:
    /// only the last bar is open to updates.
    pub fn merge_latest(&mut self, bar: Bar) -> MergeResult {
        let last_time = match self.bars.last() {
            Some(last) => last.time,
            None => {
                self.bars.push(bar);
                return MergeResult::Inserted;
            }
        };

        if bar.time == last_time {
            // Same-period tick: the open bar evolves in place
            if let Some(last) = self.bars.last_mut() {
                *last = bar;
            }
            MergeResult::Updated
        } else if bar.time > last_time {
            self.bars.push(bar);
            MergeResult::Appended
        } else {
            debug!(
                "Discarding stale bar for {}: t={} < last t={}",
                self.symbol, bar.time, last_time
            );
            MergeResult::Stale
        }
    }

    /// Owned ordered copy for the rendering surface
    pub fn snapshot(&self) -> Vec<Bar> {
        self.bars.clone()
    }

    /// Get the last bar (most recent, possibly still open)
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}
