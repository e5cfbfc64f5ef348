use crate::{Error, Ohlcv, Trend};

use std::{
    fmt::{Debug, Display},
    hash::Hash,
    num::NonZero,
};

/// Configuration for a technical [`Indicator`].
///
/// Every indicator has a corresponding config type that holds its parameters
/// (period, pole count, price source, ...). Configs are value types: cheap to
/// copy, compare, and hash — a [`Session`](crate::Session) uses them as part
/// of the identity it deduplicates instances by.
///
/// Out-of-range parameters are clamped to the nearest valid value at build
/// time (poles to `{2, 3}`, the ADXVMA multiplier to positive); periods are
/// non-zero by construction ([`NonZero`]). Validation never happens again
/// after construction.
pub trait IndicatorConfig: Sized + Copy + PartialEq + Eq + Hash + Display + Debug {
    /// Builder type for constructing this config.
    type Builder: IndicatorConfigBuilder<Self>;

    /// Returns a new builder with default values.
    fn builder() -> Self::Builder;

    /// Lookback period (number of bars).
    fn period(&self) -> usize;
}

/// Builder for an [`IndicatorConfig`].
pub trait IndicatorConfigBuilder<Config>
where
    Config: IndicatorConfig,
{
    /// Sets the indicator period.
    #[must_use]
    fn period(self, period: NonZero<usize>) -> Self;

    /// Builds the config, clamping any out-of-range parameter.
    #[must_use]
    fn build(self) -> Config;
}

/// A streaming technical indicator.
///
/// Indicators maintain internal state ([`Series`](crate::Series) history plus
/// scalar recurrence state) and advance incrementally on each call to
/// [`update`](Indicator::update). Bar boundaries are detected from
/// [`open_time`](Ohlcv::open_time): a larger timestamp is the first tick of a
/// new bar, where per-bar terms are frozen and every series gains a slot; the
/// same timestamp is an intrabar tick that repaints only lag-0 slots.
///
/// There is no warm-up gap in the output: until enough history exists for the
/// full recurrence, the raw input value is passed through unchanged.
///
/// # Example
///
/// ```
/// use bartrend::{Ema, EmaConfig, Indicator, IndicatorConfig, Trend};
/// use std::num::NonZero;
/// # use bartrend::{Ohlcv, Price, Timestamp};
/// #
/// # struct Bar(f64, u64);
/// # impl Ohlcv for Bar {
/// #     fn open(&self) -> Price { self.0 }
/// #     fn high(&self) -> Price { self.0 }
/// #     fn low(&self) -> Price { self.0 }
/// #     fn close(&self) -> Price { self.0 }
/// #     fn open_time(&self) -> Timestamp { self.1 }
/// # }
///
/// let mut ema = Ema::new(EmaConfig::close(NonZero::new(3).unwrap()));
///
/// assert_eq!(ema.update(&Bar(2.0, 1)), Ok(2.0)); // bar 0: pass-through
/// assert_eq!(ema.update(&Bar(4.0, 2)), Ok(3.0)); // alpha = 0.5
/// assert_eq!(ema.trend(), Trend::Up);
/// ```
pub trait Indicator: Sized + Clone + Display + Debug {
    /// Configuration type for this indicator.
    type Config: IndicatorConfig;

    /// Computed output type.
    type Output: Send + Sync + Copy + Display + Debug;

    /// Creates a new indicator from the given config.
    fn new(config: Self::Config) -> Self;

    /// Feeds one tick and returns the updated indicator value.
    ///
    /// # Errors
    ///
    /// [`Error::NonPriceInput`] from indicators that only work on raw price
    /// bars but were wired to a derived stream. Warm-up is never an error.
    fn update(&mut self, bar: &impl Ohlcv) -> Result<Self::Output, Error>;

    /// Returns the last computed value without advancing state, or `None`
    /// before the first update.
    ///
    /// This is a cached field read — O(1) with no computation.
    fn value(&self) -> Option<Self::Output>;

    /// Current trend classification.
    ///
    /// Indicators without a trend series always report
    /// [`Neutral`](Trend::Neutral).
    fn trend(&self) -> Trend {
        Trend::Neutral
    }
}
