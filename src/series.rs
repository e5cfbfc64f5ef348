use crate::{Error, Price};
use std::collections::VecDeque;

/// Retention policy of a [`Series`].
///
/// Bounded retention is purely an optimization: within the retained window,
/// lag-based lookups behave exactly as if the series were unbounded. Reading
/// a lag beyond the retained window fails with [`Error::OutOfRange`], so the
/// bound must cover the deepest lag any consumer reads.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Lookback {
    /// Keep every bar slot for the lifetime of the series.
    Unbounded,
    /// Keep only the `n` most recent bar slots (`n > 0`).
    Bounded(usize),
}

/// Default bounded retention for smoothing streams whose consumers only read
/// shallow lags.
pub(crate) const DEFAULT_LOOKBACK: Lookback = Lookback::Bounded(256);

/// An append-only, lag-indexed bar series.
///
/// One slot per processed bar, addressed by lag from the current bar
/// (lag 0 = current, lag 1 = previous, ...). A slot is immutable once its bar
/// has closed; only the newest slot may be rewritten, which is how intrabar
/// ticks repaint the forming bar.
///
/// # Example
///
/// ```
/// use bartrend::{BarSeries, Lookback};
///
/// let mut s = BarSeries::new(Lookback::Unbounded);
/// s.advance(10.0);
/// s.advance(20.0);
/// s.repaint(25.0); // intrabar tick rewrites lag 0
///
/// assert_eq!(s.at(0), Ok(25.0));
/// assert_eq!(s.at(1), Ok(10.0));
/// assert!(s.at(2).is_err());
/// ```
#[derive(Clone, Debug)]
pub struct Series<T> {
    slots: VecDeque<T>,
    bars: usize,
    lookback: Lookback,
}

/// A [`Series`] of prices — the container every recurrence reads and writes.
pub type BarSeries = Series<Price>;

impl<T: Copy> Series<T> {
    /// Creates an empty series with the given retention policy.
    #[must_use]
    pub fn new(lookback: Lookback) -> Self {
        debug_assert!(
            !matches!(lookback, Lookback::Bounded(0)),
            "bounded lookback must retain at least one slot"
        );

        let capacity = match lookback {
            Lookback::Bounded(n) => n,
            Lookback::Unbounded => 0,
        };

        Self {
            slots: VecDeque::with_capacity(capacity),
            bars: 0,
            lookback,
        }
    }

    /// Opens a new logical bar slot holding `value`.
    pub fn advance(&mut self, value: T) {
        if let Lookback::Bounded(n) = self.lookback
            && self.slots.len() == n
        {
            self.slots.pop_front();
        }
        self.slots.push_back(value);
        self.bars += 1;
    }

    /// Replaces the value of the current (lag 0) slot without advancing.
    ///
    /// # Panics
    ///
    /// Panics if no bar has been opened yet — repainting an empty series is a
    /// contract violation, not a recoverable state.
    pub fn repaint(&mut self, value: T) {
        let slot = self
            .slots
            .back_mut()
            .expect("Series invariant violation: repaint before the first advance");
        *slot = value;
    }

    /// Advances on the first tick of a bar, repaints on subsequent ticks.
    #[inline]
    pub fn write(&mut self, value: T, new_bar: bool) {
        if new_bar {
            self.advance(value);
        } else {
            self.repaint(value);
        }
    }

    /// Value at `lag` bars back from the current bar.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] when fewer than `lag + 1` bars have been
    /// processed, or when the slot has been evicted by bounded retention.
    #[inline]
    pub fn at(&self, lag: usize) -> Result<T, Error> {
        if lag >= self.slots.len() {
            return Err(Error::OutOfRange {
                lag,
                len: self.slots.len(),
            });
        }
        Ok(self.slots[self.slots.len() - 1 - lag])
    }

    /// Value at `lag`, or `None` when out of range.
    #[inline]
    #[must_use]
    pub fn get(&self, lag: usize) -> Option<T> {
        self.at(lag).ok()
    }

    /// Value of the current (lag 0) slot, or `None` before the first bar.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<T> {
        self.slots.back().copied()
    }

    /// Number of logical bars processed so far (including evicted slots).
    #[inline]
    #[must_use]
    pub fn bars(&self) -> usize {
        self.bars
    }

    /// `true` until the first bar slot is opened.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars == 0
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn series() -> BarSeries {
        BarSeries::new(Lookback::Unbounded)
    }

    mod lag_access {
        use super::*;

        #[test]
        fn empty_series_has_no_current() {
            let s = series();
            assert!(s.is_empty());
            assert_eq!(s.current(), None);
            assert_eq!(s.at(0), Err(Error::OutOfRange { lag: 0, len: 0 }));
        }

        #[test]
        fn lag_zero_is_newest() {
            let mut s = series();
            s.advance(1.0);
            s.advance(2.0);
            s.advance(3.0);
            assert_eq!(s.at(0), Ok(3.0));
            assert_eq!(s.at(1), Ok(2.0));
            assert_eq!(s.at(2), Ok(1.0));
        }

        #[test]
        fn excessive_lag_fails() {
            let mut s = series();
            s.advance(1.0);
            assert_eq!(s.at(1), Err(Error::OutOfRange { lag: 1, len: 1 }));
            assert_eq!(s.get(1), None);
        }

        #[test]
        fn bars_counts_logical_slots() {
            let mut s = series();
            assert_eq!(s.bars(), 0);
            s.advance(1.0);
            s.advance(2.0);
            assert_eq!(s.bars(), 2);
        }
    }

    mod repaint {
        use super::*;

        #[test]
        fn rewrites_only_lag_zero() {
            let mut s = series();
            s.advance(1.0);
            s.advance(2.0);
            s.repaint(9.0);
            assert_eq!(s.at(0), Ok(9.0));
            assert_eq!(s.at(1), Ok(1.0));
        }

        #[test]
        fn write_dispatches_on_new_bar_flag() {
            let mut s = series();
            s.write(1.0, true);
            s.write(5.0, false);
            s.write(2.0, true);
            assert_eq!(s.at(0), Ok(2.0));
            assert_eq!(s.at(1), Ok(5.0));
            assert_eq!(s.bars(), 2);
        }

        #[test]
        #[should_panic(expected = "repaint before the first advance")]
        fn repaint_on_empty_panics() {
            let mut s = series();
            s.repaint(1.0);
        }
    }

    mod bounded {
        use super::*;

        #[test]
        fn evicts_oldest_slot() {
            let mut s = BarSeries::new(Lookback::Bounded(2));
            s.advance(1.0);
            s.advance(2.0);
            s.advance(3.0);
            assert_eq!(s.at(0), Ok(3.0));
            assert_eq!(s.at(1), Ok(2.0));
            // slot for 1.0 evicted; logical bar count still grows
            assert_eq!(s.at(2), Err(Error::OutOfRange { lag: 2, len: 2 }));
            assert_eq!(s.bars(), 3);
        }

        #[test]
        fn behaves_as_unbounded_within_window() {
            let mut bounded = BarSeries::new(Lookback::Bounded(3));
            let mut unbounded = series();
            for i in 0..10 {
                let v = f64::from(i);
                bounded.advance(v);
                unbounded.advance(v);
            }
            for lag in 0..3 {
                assert_eq!(bounded.at(lag), unbounded.at(lag));
            }
        }

        #[test]
        fn repaint_works_after_eviction() {
            let mut s = BarSeries::new(Lookback::Bounded(2));
            s.advance(1.0);
            s.advance(2.0);
            s.advance(3.0);
            s.repaint(7.0);
            assert_eq!(s.at(0), Ok(7.0));
            assert_eq!(s.at(1), Ok(2.0));
        }
    }

    mod generic_value {
        use super::*;
        use crate::Trend;

        #[test]
        fn stores_non_price_values() {
            let mut s: Series<Trend> = Series::new(Lookback::Unbounded);
            s.advance(Trend::Neutral);
            s.advance(Trend::Up);
            assert_eq!(s.at(1), Ok(Trend::Neutral));
            assert_eq!(s.current(), Some(Trend::Up));
        }
    }
}
