use std::{
    fmt::Display,
    num::NonZero,
};

use crate::{
    BarSeries, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Lookback, Ohlcv, Price,
    PriceSource, Timestamp, series::DEFAULT_LOOKBACK,
};

/// Configuration for the rolling [`Maximum`] and [`Minimum`] indicators.
///
/// # Example
///
/// ```
/// use bartrend::{ExtremaConfig, IndicatorConfig};
/// use std::num::NonZero;
///
/// let config = ExtremaConfig::close(NonZero::new(14).unwrap());
/// assert_eq!(config.period(), 14);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ExtremaConfig {
    period: usize,
    source: PriceSource,
}

impl IndicatorConfig for ExtremaConfig {
    type Builder = ExtremaConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        ExtremaConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl ExtremaConfig {
    /// Price source extracted from each bar.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &PriceSource {
        &self.source
    }

    /// Rolling extremum of the closing price.
    #[must_use]
    pub fn close(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }

    /// Rolling extremum of the high price.
    #[must_use]
    pub fn high(period: NonZero<usize>) -> Self {
        Self::builder()
            .period(period)
            .source(PriceSource::High)
            .build()
    }

    /// Rolling extremum of the low price.
    #[must_use]
    pub fn low(period: NonZero<usize>) -> Self {
        Self::builder()
            .period(period)
            .source(PriceSource::Low)
            .build()
    }
}

impl Display for ExtremaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExtremaConfig({}, {})", self.period, self.source)
    }
}

/// Builder for [`ExtremaConfig`].
///
/// Defaults: source = [`PriceSource::Close`]. Period must be set before
/// calling [`build`](IndicatorConfigBuilder::build).
pub struct ExtremaConfigBuilder {
    period: Option<usize>,
    source: PriceSource,
}

impl ExtremaConfigBuilder {
    fn new() -> Self {
        Self {
            period: None,
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

impl IndicatorConfigBuilder<ExtremaConfig> for ExtremaConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = Some(period.get());
        self
    }

    #[inline]
    fn build(self) -> ExtremaConfig {
        ExtremaConfig {
            period: self.period.expect("period is required"),
            source: self.source,
        }
    }
}

/// Shared rolling-window machinery of [`Maximum`] and [`Minimum`].
///
/// Keeps the raw input slots for the last `period` bars (including the
/// forming one) and rescans them on every tick. The window grows with the
/// bar count until `period` bars exist — the extremum over a partial window
/// is the defined warm-up output, no pass-through regime is needed.
#[derive(Clone, Debug)]
struct RollingWindow {
    period: usize,
    inputs: BarSeries,
    values: BarSeries,
}

impl RollingWindow {
    fn new(period: usize) -> Self {
        Self {
            period,
            inputs: BarSeries::new(Lookback::Bounded(period)),
            values: BarSeries::new(DEFAULT_LOOKBACK),
        }
    }

    fn tick(&mut self, value: Price, new_bar: bool, maximum: bool) -> Price {
        self.inputs.write(value, new_bar);

        let span = self.period.min(self.inputs.bars());
        let mut extreme = value;
        for lag in 1..span {
            let v = self
                .inputs
                .at(lag)
                .expect("RollingWindow invariant violation: lag within bounded retention");
            extreme = if maximum { extreme.max(v) } else { extreme.min(v) };
        }

        self.values.write(extreme, new_bar);
        extreme
    }
}

macro_rules! extremum_indicator {
    ($type:ident, $maximum:expr, $label:expr, $doc:expr) => {
        #[doc = $doc]
        ///
        /// Output at each bar is the extremum over the last `period` values of
        /// the input, including the still-forming bar (which repaints on every
        /// intrabar tick). Until `period` bars exist the window simply covers
        /// all bars seen so far.
        #[derive(Clone, Debug)]
        pub struct $type {
            config: ExtremaConfig,
            window: RollingWindow,
            last_open_time: Option<Timestamp>,
            cur_close: Option<Price>,
            prev_close: Option<Price>,
        }

        impl $type {
            /// Drives the rolling window from a derived value stream instead
            /// of price bars. Bar boundary handling is the caller's job.
            pub(crate) fn tick_value(&mut self, value: Price, new_bar: bool) -> Price {
                self.window.tick(value, new_bar, $maximum)
            }

            /// Output value at `lag` bars back.
            ///
            /// # Errors
            ///
            /// [`Error::OutOfRange`] past the available history.
            #[inline]
            pub fn value_at(&self, lag: usize) -> Result<Price, Error> {
                self.window.values.at(lag)
            }
        }

        impl Indicator for $type {
            type Config = ExtremaConfig;
            type Output = Price;

            fn new(config: Self::Config) -> Self {
                Self {
                    config,
                    window: RollingWindow::new(config.period),
                    last_open_time: None,
                    cur_close: None,
                    prev_close: None,
                }
            }

            #[inline]
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

                Ok(self.tick_value(price, new_bar))
            }

            #[inline]
            fn value(&self) -> Option<Price> {
                self.window.values.current()
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({}, {})", $label, self.config.period, self.config.source)
            }
        }
    };
}

extremum_indicator!(
    Maximum,
    true,
    "Maximum",
    "Rolling maximum over the last `period` bars."
);
extremum_indicator!(
    Minimum,
    false,
    "Minimum",
    "Rolling minimum over the last `period` bars."
);
