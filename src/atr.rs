use std::{
    fmt::Display,
    num::NonZero,
};

use crate::{
    BarSeries, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price,
    PriceSource, Timestamp, series::DEFAULT_LOOKBACK,
};

/// Configuration for the [`Atr`] indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct AtrConfig {
    period: usize,
}

impl IndicatorConfig for AtrConfig {
    type Builder = AtrConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        AtrConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl AtrConfig {
    /// ATR over the given period.
    #[must_use]
    pub fn of(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }
}

impl Display for AtrConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtrConfig({})", self.period)
    }
}

/// Builder for [`AtrConfig`]. Default period = 14.
pub struct AtrConfigBuilder {
    period: usize,
}

impl AtrConfigBuilder {
    fn new() -> Self {
        Self { period: 14 }
    }
}

impl IndicatorConfigBuilder<AtrConfig> for AtrConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = period.get();
        self
    }

    #[inline]
    fn build(self) -> AtrConfig {
        AtrConfig { period: self.period }
    }
}

/// Average True Range with Wilder smoothing.
///
/// The true range always reads from the raw bar (high, low, previous close),
/// so no price source is configurable. Warm-up is progressive: with `k + 1`
/// bars seen and `n = min(k + 1, period)`, the recurrence is
/// `atr = ((n - 1) * atr₁ + tr) / n`. On the very first bar the true range
/// collapses to `high - low` and becomes the seed.
#[derive(Clone, Debug)]
pub struct Atr {
    config: AtrConfig,
    values: BarSeries,
    last_open_time: Option<Timestamp>,
    cur_close: Option<Price>,
    prev_close: Option<Price>,
}

impl Atr {
    /// Output value at `lag` bars back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    #[inline]
    pub fn value_at(&self, lag: usize) -> Result<Price, Error> {
        self.values.at(lag)
    }
}

impl Indicator for Atr {
    type Config = AtrConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            values: BarSeries::new(DEFAULT_LOOKBACK),
            last_open_time: None,
            cur_close: None,
            prev_close: None,
        }
    }

    fn update(&mut self, bar: &impl Ohlcv) -> Result<Price, Error> {
        debug_assert!(
            self.last_open_time.is_none_or(|t| t <= bar.open_time()),
            "open_time must be non-decreasing: last={}, got={}",
            self.last_open_time.unwrap_or(0),
            bar.open_time(),
        );

        let new_bar = self.last_open_time.is_none_or(|t| t < bar.open_time());
        if new_bar {
            self.last_open_time = Some(bar.open_time());
            self.prev_close = self.cur_close;
        }

        let tr = PriceSource::TrueRange.extract(bar, self.prev_close);
        self.cur_close = Some(bar.close());

        if new_bar {
            self.values.advance(tr);
        }

        let out = match self.values.at(1) {
            Ok(prev) => {
                #[allow(clippy::cast_precision_loss)]
                let n = self.values.bars().min(self.config.period) as f64;
                (n - 1.0).mul_add(prev, tr) / n
            }
            Err(_) => tr,
        };
        self.values.repaint(out);

        Ok(out)
    }

    #[inline]
    fn value(&self) -> Option<Price> {
        self.values.current()
    }
}

impl Display for Atr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ATR({})", self.config.period)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_util::{Bar, assert_approx, nz};

    fn atr(period: usize) -> Atr {
        Atr::new(AtrConfig::of(nz(period)))
    }

    mod warm_up {
        use super::*;

        #[test]
        fn first_bar_seeds_with_the_range() {
            let mut a = atr(14);
            let v = a.update(&Bar::new(10.0, 13.0, 9.0, 12.0).at(1)).unwrap();
            assert_eq!(v, 4.0);
        }

        #[test]
        fn averages_over_bars_seen_until_period() {
            let mut a = atr(14);
            a.update(&Bar::new(10.0, 13.0, 9.0, 12.0).at(1)).unwrap();
            // tr = max(14, prev close 12) - min(11, 12) = 3; n = 2 -> (4 + 3) / 2
            let v = a.update(&Bar::new(12.0, 14.0, 11.0, 13.0).at(2)).unwrap();
            assert_eq!(v, 3.5);
        }
    }

    mod steady_state {
        use super::*;

        #[test]
        fn wilder_recurrence_once_period_bars_exist() {
            let mut a = atr(2);
            a.update(&Bar::new(10.0, 12.0, 8.0, 10.0).at(1)).unwrap(); // tr 4
            a.update(&Bar::new(10.0, 11.0, 9.0, 10.0).at(2)).unwrap(); // tr 2, atr 3
            // tr = 6, n stays 2 -> (3 + 6) / 2
            let v = a.update(&Bar::new(10.0, 14.0, 8.0, 10.0).at(3)).unwrap();
            assert_eq!(v, 4.5);
        }

        #[test]
        fn gap_extends_the_true_range() {
            let mut a = atr(2);
            a.update(&Bar::new(10.0, 11.0, 9.0, 10.0).at(1)).unwrap(); // tr 2
            // gap up: prev close 10, low 14 -> tr = 16 - 10 = 6
            let v = a.update(&Bar::new(15.0, 16.0, 14.0, 15.0).at(2)).unwrap();
            assert_eq!(v, 4.0);
        }

        #[test]
        fn constant_range_converges_immediately() {
            let mut a = atr(5);
            for t in 1..=20 {
                let v = a
                    .update(&Bar::new(10.0, 11.0, 9.0, 10.0).at(t))
                    .unwrap();
                assert_approx!(v, 2.0);
            }
        }
    }

    mod repaint {
        use super::*;

        #[test]
        fn intrabar_tick_recomputes_from_the_closed_bar() {
            let mut a = atr(14);
            a.update(&Bar::new(10.0, 13.0, 9.0, 12.0).at(1)).unwrap(); // atr 4
            a.update(&Bar::new(12.0, 14.0, 11.0, 13.0).at(2)).unwrap(); // atr 3.5
            // widening the forming bar repaints: tr = 5, (4 + 5) / 2
            let v = a.update(&Bar::new(12.0, 16.0, 11.0, 15.0).at(2)).unwrap();
            assert_eq!(v, 4.5);
        }
    }
}
