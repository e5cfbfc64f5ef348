use std::{
    fmt::Display,
    num::NonZero,
};

use crate::{
    BarSeries, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Ohlcv, Price,
    PriceSource, Series, Timestamp, Trend, series::DEFAULT_LOOKBACK,
};

/// Configuration for the [`Ema`] indicator.
///
/// # Example
///
/// ```
/// use bartrend::{EmaConfig, IndicatorConfig, IndicatorConfigBuilder, PriceSource};
/// use std::num::NonZero;
///
/// let config = EmaConfig::builder()
///     .period(NonZero::new(21).unwrap())
///     .source(PriceSource::Median)
///     .build();
/// assert_eq!(config.period(), 21);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct EmaConfig {
    period: usize,
    source: PriceSource,
}

impl IndicatorConfig for EmaConfig {
    type Builder = EmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        EmaConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl EmaConfig {
    /// Price source extracted from each bar.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &PriceSource {
        &self.source
    }

    /// EMA of the closing price.
    #[must_use]
    pub fn close(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }
}

impl Display for EmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmaConfig({}, {})", self.period, self.source)
    }
}

/// Builder for [`EmaConfig`].
///
/// Defaults: period = 14, source = [`PriceSource::Close`].
pub struct EmaConfigBuilder {
    period: usize,
    source: PriceSource,
}

impl EmaConfigBuilder {
    fn new() -> Self {
        Self {
            period: 14,
            source: PriceSource::Close,
        }
    }

    /// Sets the price source.
    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

impl IndicatorConfigBuilder<EmaConfig> for EmaConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = period.get();
        self
    }

    #[inline]
    fn build(self) -> EmaConfig {
        EmaConfig {
            period: self.period,
            source: self.source,
        }
    }
}

/// Exponential Moving Average.
///
/// Seeded with the raw input on the first bar, then follows the recurrence
/// `ema = ema₁ + alpha * (price - ema₁)` with `alpha = 2 / (period + 1)`.
/// There is no averaging seed window: from bar 1 onward the output is the
/// full recurrence, which matches how a charting EMA plots from the very
/// first bar.
///
/// Trend is the sign of the slope against the previous closed bar.
#[derive(Clone, Debug)]
pub struct Ema {
    config: EmaConfig,
    alpha: f64,
    values: BarSeries,
    trend: Series<Trend>,
    last_open_time: Option<Timestamp>,
    cur_close: Option<Price>,
    prev_close: Option<Price>,
}

impl Ema {
    /// Output value at `lag` bars back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    #[inline]
    pub fn value_at(&self, lag: usize) -> Result<Price, Error> {
        self.values.at(lag)
    }

    /// Trend classification at `lag` bars back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    #[inline]
    pub fn trend_at(&self, lag: usize) -> Result<Trend, Error> {
        self.trend.at(lag)
    }
}

impl Indicator for Ema {
    type Config = EmaConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let alpha = 2.0 / (config.period as f64 + 1.0);
        Self {
            config,
            alpha,
            values: BarSeries::new(DEFAULT_LOOKBACK),
            trend: Series::new(DEFAULT_LOOKBACK),
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

        let price = self.config.source.extract(bar, self.prev_close);
        self.cur_close = Some(bar.close());

        if new_bar {
            self.values.advance(price);
            self.trend.advance(Trend::Neutral);
        }

        let out = match self.values.at(1) {
            Ok(prev) => {
                let out = self.alpha.mul_add(price - prev, prev);
                self.trend.repaint(Trend::of_slope(out, prev));
                out
            }
            // first bar: seed with the raw input
            Err(_) => price,
        };
        self.values.repaint(out);

        Ok(out)
    }

    #[inline]
    fn value(&self) -> Option<Price> {
        self.values.current()
    }

    #[inline]
    fn trend(&self) -> Trend {
        self.trend.current().unwrap_or_default()
    }
}

impl Display for Ema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EMA({}, {})", self.config.period, self.config.source)
    }
}
