use std::{
    fmt::Display,
    num::NonZero,
};

use crate::{
    BarSeries, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Lookback, Ohlcv, Price,
    Timestamp, series::DEFAULT_LOOKBACK,
};

/// Configuration for the [`TpoMean`] indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct TpoMeanConfig {
    period: usize,
}

impl IndicatorConfig for TpoMeanConfig {
    type Builder = TpoMeanConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        TpoMeanConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl TpoMeanConfig {
    /// TPO mean over the given period.
    #[must_use]
    pub fn of(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }
}

impl Display for TpoMeanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TpoMeanConfig({})", self.period)
    }
}

/// Builder for [`TpoMeanConfig`]. Default period = 20.
pub struct TpoMeanConfigBuilder {
    period: usize,
}

impl TpoMeanConfigBuilder {
    fn new() -> Self {
        Self { period: 20 }
    }
}

impl IndicatorConfigBuilder<TpoMeanConfig> for TpoMeanConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = period.get();
        self
    }

    #[inline]
    fn build(self) -> TpoMeanConfig {
        TpoMeanConfig { period: self.period }
    }
}

/// Time Price Opportunity count of one bar: the number of tick levels its
/// high-low range spans. A bar always contributes at least one opportunity;
/// without a known tick size every bar counts as exactly one, which collapses
/// the mean into a plain average of bar medians.
fn tpo_count(high: Price, low: Price, tick_size: f64) -> f64 {
    if tick_size > f64::EPSILON {
        1.0 + ((high - low) / tick_size).floor()
    } else {
        1.0
    }
}

/// Moving mean of Time Price Opportunities.
///
/// Each of the last `period` bars contributes its median price, weighted by
/// the number of tick levels the bar spans. Wide-range bars therefore pull
/// the mean harder than narrow ones. The lagged contributions are summed once
/// at the first tick of a bar; intrabar ticks only recompute the forming
/// bar's own term.
///
/// The calculation needs real high/low/tick data, so it refuses derived
/// single-value streams with [`Error::NonPriceInput`].
#[derive(Clone, Debug)]
pub struct TpoMean {
    config: TpoMeanConfig,
    highs: BarSeries,
    lows: BarSeries,
    medians: BarSeries,
    values: BarSeries,
    // closed-bar contributions, frozen at the first tick of each bar
    pre_count: f64,
    pre_sum: f64,
    available: bool,
    last_open_time: Option<Timestamp>,
}

impl TpoMean {
    /// Output value at `lag` bars back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    #[inline]
    pub fn value_at(&self, lag: usize) -> Result<Price, Error> {
        self.values.at(lag)
    }

    /// Marks this instance as wired to a derived stream, where no real
    /// high/low data exists. Every subsequent update fails.
    pub(crate) fn mark_derived(&mut self) {
        self.available = false;
    }
}

impl Indicator for TpoMean {
    type Config = TpoMeanConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            highs: BarSeries::new(Lookback::Bounded(config.period)),
            lows: BarSeries::new(Lookback::Bounded(config.period)),
            medians: BarSeries::new(Lookback::Bounded(config.period)),
            values: BarSeries::new(DEFAULT_LOOKBACK),
            pre_count: 0.0,
            pre_sum: 0.0,
            available: true,
            last_open_time: None,
        }
    }

    fn update(&mut self, bar: &impl Ohlcv) -> Result<Price, Error> {
        if !self.available {
            return Err(Error::NonPriceInput);
        }

        debug_assert!(
            self.last_open_time.is_none_or(|t| t <= bar.open_time()),
            "open_time must be non-decreasing: last={}, got={}",
            self.last_open_time.unwrap_or(0),
            bar.open_time(),
        );

        let new_bar = self.last_open_time.is_none_or(|t| t < bar.open_time());
        if new_bar {
            self.last_open_time = Some(bar.open_time());
        }

        let tick_size = bar.tick_size();
        self.highs.write(bar.high(), new_bar);
        self.lows.write(bar.low(), new_bar);
        self.medians.write(bar.median(), new_bar);

        if new_bar {
            self.pre_count = 0.0;
            self.pre_sum = 0.0;
            let lookback = self.highs.bars().min(self.config.period);
            for lag in 1..lookback {
                let high = self
                    .highs
                    .at(lag)
                    .expect("TpoMean invariant violation: lookback within bounded retention");
                let low = self
                    .lows
                    .at(lag)
                    .expect("TpoMean invariant violation: lookback within bounded retention");
                let median = self
                    .medians
                    .at(lag)
                    .expect("TpoMean invariant violation: lookback within bounded retention");
                let count = tpo_count(high, low, tick_size);
                self.pre_count += count;
                self.pre_sum += count * median;
            }
        }

        let count = tpo_count(bar.high(), bar.low(), tick_size);
        let total = self.pre_count + count;
        let out = if total > f64::EPSILON {
            count.mul_add(bar.median(), self.pre_sum) / total
        } else {
            bar.median()
        };
        self.values.write(out, new_bar);

        Ok(out)
    }

    #[inline]
    fn value(&self) -> Option<Price> {
        self.values.current()
    }
}

impl Display for TpoMean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TPOMean({})", self.config.period)
    }
}
