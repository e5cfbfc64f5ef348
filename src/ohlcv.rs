/// A price value.
///
/// Semantic alias for [`f64`]. Documents intent in function signatures
/// without introducing newtype construction overhead.
pub type Price = f64;

/// Bar open timestamp or sequence number.
///
/// Used for bar boundary detection. Must be non-decreasing
/// between consecutive calls to [`Indicator::update`](crate::Indicator::update).
pub type Timestamp = u64;

/// OHLC bar data used as input to all indicators.
///
/// Implement this on your own kline/candle type to avoid per-tick
/// conversion. Indicators accept `&impl Ohlcv` and extract the
/// configured [`PriceSource`](crate::PriceSource) internally.
///
/// # Bar boundaries and intrabar ticks
///
/// Indicators detect new bars by comparing [`open_time`](Ohlcv::open_time)
/// values: a call with a larger timestamp opens a new bar (the "first tick",
/// where per-bar terms are frozen), and any further calls with the same
/// timestamp are intrabar ticks that repaint only the current bar slot.
///
/// # Example
///
/// ```
/// use bartrend::{Ohlcv, Price, Timestamp};
///
/// struct MyKline {
///     o: f64, h: f64, l: f64, c: f64,
///     ts: u64,
/// }
///
/// impl Ohlcv for MyKline {
///     fn open(&self) -> Price { self.o }
///     fn high(&self) -> Price { self.h }
///     fn low(&self) -> Price { self.l }
///     fn close(&self) -> Price { self.c }
///     fn open_time(&self) -> Timestamp { self.ts }
/// }
/// ```
pub trait Ohlcv {
    /// Opening price of the bar.
    fn open(&self) -> Price;

    /// Highest price during the bar so far.
    fn high(&self) -> Price;

    /// Lowest price during the bar so far.
    fn low(&self) -> Price;

    /// Closing (or latest) price of the bar.
    fn close(&self) -> Price;

    /// Bar open timestamp or sequence number.
    ///
    /// Consecutive calls with the same value repaint the current bar; a new
    /// value advances the indicator by one bar. Values must be non-decreasing
    /// between calls (debug builds assert).
    fn open_time(&self) -> Timestamp;

    /// Bar median price: `(high + low) / 2`.
    #[inline]
    fn median(&self) -> Price {
        f64::midpoint(self.high(), self.low())
    }

    /// Minimum price increment of the instrument. Defaults to `0.0`.
    ///
    /// Override this for TPO-based indicators ([`TpoMean`](crate::TpoMean)),
    /// which count discrete price levels inside each bar's range. A zero or
    /// degenerate tick size collapses every bar to a single price opportunity.
    fn tick_size(&self) -> f64 {
        0.0
    }
}
