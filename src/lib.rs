//! Streaming trend-classified technical indicators for Rust.
//!
//! Indicators accept any type implementing [`Ohlcv`] and advance on every
//! tick: the first tick with a larger [`open_time`](Ohlcv::open_time) closes
//! the previous bar, further ticks with the same timestamp repaint the
//! forming one. There is no warm-up gap in the output. Until enough history
//! exists for the full recurrence, every indicator passes its input through
//! (or averages what it has), exactly like the charting platforms these
//! recurrences come from.
//!
//! Each indicator type ([`Butterworth`], [`Ema`], [`Adxvma`], [`TpoMean`],
//! [`Maximum`], [`Minimum`], [`Atr`]) exposes [`new`](Butterworth::new),
//! [`update`](Butterworth::update), [`value`](Butterworth::value) and
//! [`trend`](Butterworth::trend) as inherent methods — no trait import
//! needed. Import [`Indicator`] only for generic code.
//!
//! A [`Session`] registers indicators by config, deduplicates identical
//! requests, and lets one indicator feed another through [`Feed::Output`].

mod adxvma;
mod atr;
mod butterworth;
mod ema;
mod error;
mod extrema;
mod indicator;
mod ohlcv;
mod price_source;
mod series;
mod session;
mod tpo;
mod trend;

pub use crate::error::Error;
pub use crate::indicator::{Indicator, IndicatorConfig, IndicatorConfigBuilder};
pub use crate::ohlcv::{Ohlcv, Price, Timestamp};
pub use crate::price_source::PriceSource;
pub use crate::series::{BarSeries, Lookback, Series};
pub use crate::trend::Trend;

pub use crate::adxvma::{Adxvma, AdxvmaConfig, AdxvmaConfigBuilder, Multiplier};
pub use crate::atr::{Atr, AtrConfig, AtrConfigBuilder};
pub use crate::butterworth::{Butterworth, ButterworthConfig, ButterworthConfigBuilder};
pub use crate::ema::{Ema, EmaConfig, EmaConfigBuilder};
pub use crate::extrema::{ExtremaConfig, ExtremaConfigBuilder, Maximum, Minimum};
pub use crate::session::{Feed, IndicatorHandle, Session};
pub use crate::tpo::{TpoMean, TpoMeanConfig, TpoMeanConfigBuilder};

macro_rules! impl_indicator_methods {
    ($type:ty, $config:ty, $output:ty) => {
        impl $type {
            /// See [`Indicator::new`].
            #[must_use]
            pub fn new(config: $config) -> Self {
                <Self as Indicator>::new(config)
            }

            /// See [`Indicator::update`].
            ///
            /// # Errors
            ///
            /// See [`Indicator::update`].
            #[inline]
            pub fn update(&mut self, bar: &impl Ohlcv) -> Result<$output, Error> {
                <Self as Indicator>::update(self, bar)
            }

            /// See [`Indicator::value`].
            #[must_use]
            #[inline]
            pub fn value(&self) -> Option<$output> {
                <Self as Indicator>::value(self)
            }

            /// See [`Indicator::trend`].
            #[must_use]
            #[inline]
            pub fn trend(&self) -> Trend {
                <Self as Indicator>::trend(self)
            }
        }
    };
}

impl_indicator_methods!(Butterworth, ButterworthConfig, Price);
impl_indicator_methods!(Ema, EmaConfig, Price);
impl_indicator_methods!(Adxvma, AdxvmaConfig, Price);
impl_indicator_methods!(TpoMean, TpoMeanConfig, Price);
impl_indicator_methods!(Maximum, ExtremaConfig, Price);
impl_indicator_methods!(Minimum, ExtremaConfig, Price);
impl_indicator_methods!(Atr, AtrConfig, Price);

#[cfg(test)]
mod test_util;
