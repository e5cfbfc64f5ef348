use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    num::NonZero,
};

use crate::{
    Atr, AtrConfig, BarSeries, Error, ExtremaConfig, Indicator, IndicatorConfig,
    IndicatorConfigBuilder, Lookback, Maximum, Minimum, Ohlcv, Price, PriceSource, Series,
    Timestamp, Trend, series::DEFAULT_LOOKBACK,
};

/// Positive band multiplier, comparable and hashable by bit pattern.
///
/// The bit-pattern identity is what lets [`AdxvmaConfig`] act as a hash key;
/// two configs built from the same literal always collide.
#[derive(Clone, Copy, Debug)]
pub struct Multiplier(f64);

impl Multiplier {
    #[inline]
    #[must_use]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Multiplier {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Multiplier {}

impl Hash for Multiplier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Configuration for the [`Adxvma`] indicator.
///
/// # Example
///
/// ```
/// use bartrend::{AdxvmaConfig, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// let config = AdxvmaConfig::builder()
///     .period(NonZero::new(12).unwrap())
///     .multiplier(0.75)
///     .build();
/// assert_eq!(config.period(), 12);
/// assert_eq!(config.multiplier().get(), 0.75);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct AdxvmaConfig {
    period: usize,
    multiplier: Multiplier,
    source: PriceSource,
}

impl IndicatorConfig for AdxvmaConfig {
    type Builder = AdxvmaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        AdxvmaConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl AdxvmaConfig {
    /// Trend band multiplier.
    #[inline]
    #[must_use]
    pub fn multiplier(&self) -> Multiplier {
        self.multiplier
    }

    /// Price source extracted from each bar.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &PriceSource {
        &self.source
    }

    /// ADXVMA of the closing price.
    #[must_use]
    pub fn close(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }
}

impl Display for AdxvmaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AdxvmaConfig({}, {}, {})",
            self.period,
            self.multiplier.get(),
            self.source
        )
    }
}

/// Builder for [`AdxvmaConfig`].
///
/// Defaults: period = 8, multiplier = 0.5, source = [`PriceSource::Close`].
/// Non-positive multipliers are clamped up to [`f64::EPSILON`].
pub struct AdxvmaConfigBuilder {
    period: usize,
    multiplier: f64,
    source: PriceSource,
}

impl AdxvmaConfigBuilder {
    fn new() -> Self {
        Self {
            period: 8,
            multiplier: 0.5,
            source: PriceSource::Close,
        }
    }

    /// Sets the trend band multiplier.
    #[inline]
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the price source.
    #[inline]
    #[must_use]
    pub fn source(mut self, source: PriceSource) -> Self {
        self.source = source;
        self
    }
}

impl IndicatorConfigBuilder<AdxvmaConfig> for AdxvmaConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = period.get();
        self
    }

    #[inline]
    fn build(self) -> AdxvmaConfig {
        AdxvmaConfig {
            period: self.period,
            multiplier: Multiplier(self.multiplier.max(f64::EPSILON)),
            source: self.source,
        }
    }
}

/// ADX Volatility-adjusted Moving Average.
///
/// A moving average whose per-bar smoothing weight is the normalized position
/// of a directional-movement index inside its own rolling high/low channel.
/// When the index pins the channel edge the average tracks price with weight
/// `1/period`; when direction washes out the weight collapses and the average
/// flattens into a support or resistance shelf.
///
/// Trend classification opens only after `40 * round(sqrt(period))` bars and
/// uses a volatility band of `3 * delta` around the sum of the two previous
/// outputs, where `delta = multiplier / (10 * sqrt(period)) * ATR(10 *
/// period)`. The band blocks direct up/down flips: a reversal always passes
/// through at least one neutral bar.
#[derive(Clone, Debug)]
pub struct Adxvma {
    config: AdxvmaConfig,
    k: f64,
    delta_factor: f64,
    bars_to_classify: usize,
    inputs: BarSeries,
    up: BarSeries,
    down: BarSeries,
    ups: BarSeries,
    downs: BarSeries,
    index: BarSeries,
    values: BarSeries,
    trend: Series<Trend>,
    max_index: Maximum,
    min_index: Minimum,
    volatility: Atr,
    // per-bar terms, frozen at the first tick of each bar
    ref_value: f64,
    delta: f64,
    channel_hi: f64,
    channel_lo: f64,
    last_open_time: Option<Timestamp>,
    cur_close: Option<Price>,
    prev_close: Option<Price>,
}

/// Reads a lagged term that the priming regime guarantees to exist.
fn term(series: &BarSeries, lag: usize) -> Price {
    series
        .at(lag)
        .expect("Adxvma invariant violation: priming covers recurrence depth")
}

impl Adxvma {
    /// Number of bars before trend classification opens.
    #[inline]
    #[must_use]
    pub fn bars_to_classify(&self) -> usize {
        self.bars_to_classify
    }

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

    fn smooth(&self, series: &BarSeries, current: f64) -> f64 {
        let prev = term(series, 1);
        self.k.mul_add(current - prev, prev)
    }
}

impl Indicator for Adxvma {
    type Config = AdxvmaConfig;
    type Output = Price;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn new(config: Self::Config) -> Self {
        let period = config.period;
        let nz = |n: usize| NonZero::new(n).expect("config period is non-zero");
        let root = (period as f64).sqrt();
        Self {
            config,
            k: 1.0 / period as f64,
            delta_factor: config.multiplier.get() / (10.0 * root),
            bars_to_classify: 40 * root.round() as usize,
            inputs: BarSeries::new(Lookback::Bounded(4)),
            up: BarSeries::new(DEFAULT_LOOKBACK),
            down: BarSeries::new(DEFAULT_LOOKBACK),
            ups: BarSeries::new(DEFAULT_LOOKBACK),
            downs: BarSeries::new(DEFAULT_LOOKBACK),
            index: BarSeries::new(DEFAULT_LOOKBACK),
            values: BarSeries::new(DEFAULT_LOOKBACK),
            trend: Series::new(Lookback::Unbounded),
            max_index: Maximum::new(ExtremaConfig::close(nz(period))),
            min_index: Minimum::new(ExtremaConfig::close(nz(period))),
            volatility: Atr::new(AtrConfig::of(nz(10 * period))),
            ref_value: 0.0,
            delta: 0.0,
            channel_hi: 0.0,
            channel_lo: 0.0,
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

        // the volatility band reads the raw bar, keep it in lockstep
        self.volatility.update(bar)?;

        self.inputs.write(price, new_bar);
        if new_bar {
            self.up.advance(0.0);
            self.down.advance(0.0);
            self.ups.advance(0.0);
            self.downs.advance(0.0);
            self.index.advance(0.0);
            self.values.advance(price);
            self.trend.advance(Trend::Neutral);
        }

        let current_bar = self.values.bars() - 1;
        if current_bar < 2 {
            // priming regime: smoothing streams stay zero
            self.max_index.tick_value(0.0, new_bar);
            self.min_index.tick_value(0.0, new_bar);
            self.values.repaint(price);
            return Ok(price);
        }

        let prev_input = term(&self.inputs, 1);
        let current_up = (price - prev_input).max(0.0);
        let current_down = (prev_input - price).max(0.0);
        let up0 = self.smooth(&self.up, current_up);
        let down0 = self.smooth(&self.down, current_down);
        self.up.repaint(up0);
        self.down.repaint(down0);

        let sum = up0 + down0;
        let (fraction_up, fraction_down) = if sum > f64::EPSILON {
            (up0 / sum, down0 / sum)
        } else {
            (0.0, 0.0)
        };
        let ups0 = self.smooth(&self.ups, fraction_up);
        let downs0 = self.smooth(&self.downs, fraction_down);
        self.ups.repaint(ups0);
        self.downs.repaint(downs0);

        let norm_diff = (ups0 - downs0).abs();
        let norm_sum = ups0 + downs0;
        let norm_fraction = if norm_sum > f64::EPSILON {
            norm_diff / norm_sum
        } else {
            0.0
        };
        let index0 = self.smooth(&self.index, norm_fraction);
        self.index.repaint(index0);

        // the channel must see this bar's slot before its lag-1 edges are
        // frozen below
        self.max_index.tick_value(index0, new_bar);
        self.min_index.tick_value(index0, new_bar);

        if new_bar {
            self.ref_value = term(&self.values, 1) + term(&self.values, 2);
            self.delta = self.delta_factor
                * self
                    .volatility
                    .value_at(1)
                    .expect("Adxvma invariant violation: volatility runs in lockstep");
            self.channel_hi = self
                .max_index
                .value_at(1)
                .expect("Adxvma invariant violation: channel runs in lockstep");
            self.channel_lo = self
                .min_index
                .value_at(1)
                .expect("Adxvma invariant violation: channel runs in lockstep");
        }

        let hh = index0.max(self.channel_hi);
        let ll = index0.min(self.channel_lo);
        let v_diff = hh - ll;
        let v_index = if v_diff > f64::EPSILON {
            (index0 - ll) / v_diff
        } else {
            0.0
        };

        let prev_value = term(&self.values, 1);
        let out = (self.k * v_index).mul_add(price - prev_value, prev_value);
        self.values.repaint(out);

        if current_bar < self.bars_to_classify {
            self.trend.repaint(Trend::Neutral);
        } else {
            let prev_trend = self
                .trend
                .at(1)
                .expect("Adxvma invariant violation: classification starts after priming");
            self.trend.repaint(Trend::with_bands(
                prev_trend,
                2.0 * out,
                self.ref_value,
                3.0 * self.delta,
            ));
        }

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

impl Display for Adxvma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ADXVMA({}, {})", self.config.period, self.config.source)
    }
}
