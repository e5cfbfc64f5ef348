use crate::{Ohlcv, Price};

use std::fmt::Display;

/// Price source extracted from an [`Ohlcv`] bar before feeding into an
/// indicator.
///
/// The source is part of the indicator configuration and therefore part of
/// the identity a [`Session`](crate::Session) deduplicates instances by.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum PriceSource {
    /// Opening price.
    Open,
    /// Highest price.
    High,
    /// Lowest price.
    Low,
    /// Closing price.
    #[default]
    Close,
    /// Median price: `(high + low) / 2`.
    Median,
    /// Typical price: `(high + low + close) / 3`.
    Typical,
    /// Average price: `(open + high + low + close) / 4`.
    Ohlc4,
    /// True range: `max(high - low, |high - prev_close|, |low - prev_close|)`.
    ///
    /// On the first bar (no previous close), falls back to `high - low`.
    TrueRange,
}

impl Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl PriceSource {
    /// Extracts the configured value from a bar. `prev_close` is the close of
    /// the previous *completed* bar and is only consulted by
    /// [`TrueRange`](PriceSource::TrueRange).
    #[inline]
    pub(crate) fn extract(self, bar: &impl Ohlcv, prev_close: Option<Price>) -> Price {
        match self {
            Self::Open => bar.open(),
            Self::High => bar.high(),
            Self::Low => bar.low(),
            Self::Close => bar.close(),
            Self::Median => bar.median(),
            Self::Typical => (bar.high() + bar.low() + bar.close()) / 3.0,
            Self::Ohlc4 => (bar.open() + bar.high() + bar.low() + bar.close()) / 4.0,
            Self::TrueRange => {
                let hl = bar.high() - bar.low();

                match prev_close {
                    Some(prev_close) => {
                        let hc = (bar.high() - prev_close).abs();
                        let lc = (bar.low() - prev_close).abs();
                        hl.max(hc).max(lc)
                    }
                    None => hl,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_util::Bar;

    fn bar() -> Bar {
        Bar::new(10.0, 30.0, 5.0, 20.0)
    }

    #[test]
    fn extract_single_fields() {
        assert_eq!(PriceSource::Open.extract(&bar(), None), 10.0);
        assert_eq!(PriceSource::High.extract(&bar(), None), 30.0);
        assert_eq!(PriceSource::Low.extract(&bar(), None), 5.0);
        assert_eq!(PriceSource::Close.extract(&bar(), None), 20.0);
    }

    #[test]
    fn extract_median() {
        // (30 + 5) / 2 = 17.5
        assert_eq!(PriceSource::Median.extract(&bar(), None), 17.5);
    }

    #[test]
    fn extract_typical() {
        // (30 + 5 + 20) / 3 = 18.333...
        let result = PriceSource::Typical.extract(&bar(), None);
        crate::test_util::assert_approx!(result, 55.0 / 3.0);
    }

    #[test]
    fn extract_ohlc4() {
        // (10 + 30 + 5 + 20) / 4 = 16.25
        assert_eq!(PriceSource::Ohlc4.extract(&bar(), None), 16.25);
    }

    // TrueRange: max(high - low, |high - prev_close|, |low - prev_close|)

    #[test]
    fn true_range_without_prev_close_falls_back_to_hl() {
        assert_eq!(PriceSource::TrueRange.extract(&bar(), None), 25.0);
    }

    #[test]
    fn true_range_hl_wins() {
        // prev_close inside the bar range: hl dominates
        // hl = 25, |30 - 15| = 15, |5 - 15| = 10
        assert_eq!(PriceSource::TrueRange.extract(&bar(), Some(15.0)), 25.0);
    }

    #[test]
    fn true_range_gap_up() {
        // hl = 25, |30 - (-10)| = 40, |5 - (-10)| = 15
        assert_eq!(PriceSource::TrueRange.extract(&bar(), Some(-10.0)), 40.0);
    }

    #[test]
    fn true_range_gap_down() {
        // hl = 25, |30 - 50| = 20, |5 - 50| = 45
        assert_eq!(PriceSource::TrueRange.extract(&bar(), Some(50.0)), 45.0);
    }

    #[test]
    fn default_is_close() {
        assert_eq!(PriceSource::default(), PriceSource::Close);
    }
}
