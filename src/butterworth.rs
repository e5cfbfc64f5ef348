use std::{
    f64::consts::PI,
    fmt::Display,
    num::NonZero,
};

use crate::{
    BarSeries, Error, Indicator, IndicatorConfig, IndicatorConfigBuilder, Lookback, Ohlcv, Price,
    PriceSource, Series, Timestamp, Trend, series::DEFAULT_LOOKBACK,
};

/// Configuration for the [`Butterworth`] filter.
///
/// # Example
///
/// ```
/// use bartrend::{ButterworthConfig, IndicatorConfig, IndicatorConfigBuilder};
/// use std::num::NonZero;
///
/// let config = ButterworthConfig::builder()
///     .period(NonZero::new(30).unwrap())
///     .poles(2)
///     .build();
/// assert_eq!(config.period(), 30);
/// assert_eq!(config.poles(), 2);
/// ```
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct ButterworthConfig {
    period: usize,
    poles: u8,
    source: PriceSource,
}

impl IndicatorConfig for ButterworthConfig {
    type Builder = ButterworthConfigBuilder;

    #[inline]
    fn builder() -> Self::Builder {
        ButterworthConfigBuilder::new()
    }

    #[inline]
    fn period(&self) -> usize {
        self.period
    }
}

impl ButterworthConfig {
    /// Number of filter poles, 2 or 3.
    #[inline]
    #[must_use]
    pub fn poles(&self) -> u8 {
        self.poles
    }

    /// Price source extracted from each bar.
    #[inline]
    #[must_use]
    pub fn source(&self) -> &PriceSource {
        &self.source
    }

    /// Three-pole filter of the closing price.
    #[must_use]
    pub fn close(period: NonZero<usize>) -> Self {
        Self::builder().period(period).build()
    }
}

impl Display for ButterworthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ButterworthConfig({}, {}, {})",
            self.period, self.poles, self.source
        )
    }
}

/// Builder for [`ButterworthConfig`].
///
/// Defaults: period = 20, poles = 3, source = [`PriceSource::Close`].
/// The pole count is clamped to `{2, 3}` at build time.
pub struct ButterworthConfigBuilder {
    period: usize,
    poles: u8,
    source: PriceSource,
}

impl ButterworthConfigBuilder {
    fn new() -> Self {
        Self {
            period: 20,
            poles: 3,
            source: PriceSource::Close,
        }
    }

    /// Sets the pole count. Values outside `{2, 3}` are clamped.
    #[inline]
    #[must_use]
    pub fn poles(mut self, poles: u8) -> Self {
        self.poles = poles;
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

impl IndicatorConfigBuilder<ButterworthConfig> for ButterworthConfigBuilder {
    #[inline]
    fn period(mut self, period: NonZero<usize>) -> Self {
        self.period = period.get();
        self
    }

    #[inline]
    fn build(self) -> ButterworthConfig {
        ButterworthConfig {
            period: self.period,
            poles: self.poles.clamp(2, 3),
            source: self.source,
        }
    }
}

/// Filter coefficients, derived once from period and pole count.
///
/// `c4` is zero for the two-pole variant. In both variants the coefficients
/// sum to unity over the recurrence (`4*c1 + c2 + c3` resp.
/// `8*c1 + c2 + c3 + c4`), so a constant input is a fixed point.
#[derive(Clone, Copy, Debug)]
struct Coefficients {
    c1: f64,
    c2: f64,
    c3: f64,
    c4: f64,
}

impl Coefficients {
    #[allow(clippy::cast_precision_loss)]
    fn derive(period: usize, poles: u8) -> Self {
        let p = period as f64;
        if poles == 2 {
            let a = (-std::f64::consts::SQRT_2 * PI / p).exp();
            let b = 2.0 * a * (std::f64::consts::SQRT_2 * PI / p).cos();
            Self {
                c1: (1.0 - b + a * a) / 4.0,
                c2: b,
                c3: -(a * a),
                c4: 0.0,
            }
        } else {
            let a = (-PI / p).exp();
            let b = 2.0 * a * (3.0_f64.sqrt() * PI / p).cos();
            let c = a * a;
            Self {
                c1: (1.0 - b + c) * (1.0 - c) / 8.0,
                c2: b + c,
                c3: -(c + b * c),
                c4: c * c,
            }
        }
    }
}

/// Ehlers-style Butterworth low-pass filter, two or three poles.
///
/// The recurrence mixes a weighted window of recent inputs with recent
/// outputs. For the three-pole variant:
///
/// `out = c1 * (price + 3*in₁ + 3*in₂ + in₃) + c2*out₁ + c3*out₂ + c4*out₃`
///
/// Until `max(period, poles)` bars have closed, the input is passed through
/// unchanged and the trend stays [`Neutral`](Trend::Neutral). On the first
/// tick of each steady-state bar all lagged terms are frozen into a single
/// scalar; intrabar ticks then only add the `c1 * price` contribution, so a
/// repainted bar is bit-identical to a bar fed in one tick.
#[derive(Clone, Debug)]
pub struct Butterworth {
    config: ButterworthConfig,
    coefficients: Coefficients,
    min_bars: usize,
    inputs: BarSeries,
    values: BarSeries,
    trend: Series<Trend>,
    // lagged terms of the forming bar, frozen at its first tick
    recursive: f64,
    last_open_time: Option<Timestamp>,
    cur_close: Option<Price>,
    prev_close: Option<Price>,
}

impl Butterworth {
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

    fn freeze_recursive(&mut self) {
        let input = |lag| {
            self.inputs
                .at(lag)
                .expect("Butterworth invariant violation: warm-up covers input depth")
        };
        let output = |lag| {
            self.values
                .at(lag)
                .expect("Butterworth invariant violation: warm-up covers output depth")
        };

        let Coefficients { c1, c2, c3, c4 } = self.coefficients;
        self.recursive = if self.config.poles == 2 {
            c1 * 2.0f64.mul_add(input(1), input(2))
                + c2.mul_add(output(1), c3 * output(2))
        } else {
            c1 * (3.0 * input(1) + 3.0 * input(2) + input(3))
                + c2.mul_add(output(1), c3.mul_add(output(2), c4 * output(3)))
        };
    }
}

impl Indicator for Butterworth {
    type Config = ButterworthConfig;
    type Output = Price;

    fn new(config: Self::Config) -> Self {
        Self {
            config,
            coefficients: Coefficients::derive(config.period, config.poles),
            min_bars: config.period.max(usize::from(config.poles)),
            inputs: BarSeries::new(Lookback::Bounded(4)),
            values: BarSeries::new(DEFAULT_LOOKBACK),
            trend: Series::new(DEFAULT_LOOKBACK),
            recursive: 0.0,
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

        self.inputs.write(price, new_bar);
        if new_bar {
            self.values.advance(price);
            self.trend.advance(Trend::Neutral);
        }

        let current_bar = self.values.bars() - 1;
        if current_bar < self.min_bars {
            self.values.repaint(price);
            return Ok(price);
        }

        if new_bar {
            self.freeze_recursive();
        }
        let out = self.coefficients.c1.mul_add(price, self.recursive);
        self.values.repaint(out);

        let prev = self
            .values
            .at(1)
            .expect("Butterworth invariant violation: steady state implies a closed bar");
        self.trend.repaint(Trend::of_slope(out, prev));

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

impl Display for Butterworth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Butterworth({}, {}, {})",
            self.config.period, self.config.poles, self.config.source
        )
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::test_util::{assert_approx, bar, nz};

    fn filter(period: usize, poles: u8) -> Butterworth {
        Butterworth::new(
            ButterworthConfig::builder()
                .period(nz(period))
                .poles(poles)
                .build(),
        )
    }

    mod warm_up {
        use super::*;

        #[test]
        fn passes_input_through_before_min_bars() {
            let mut f = filter(4, 3);
            for t in 1..=4u32 {
                let price = f64::from(t) * 10.0;
                assert_eq!(f.update(&bar(price, u64::from(t))), Ok(price));
            }
        }

        #[test]
        fn recurrence_starts_exactly_at_min_bars() {
            let mut f = filter(4, 3);
            for t in 1..=4u64 {
                f.update(&bar(100.0, t)).unwrap();
            }
            // bar index 4 is the first recurrent one; a jump no longer
            // passes through
            let v = f.update(&bar(200.0, 5)).unwrap();
            assert!(v < 200.0, "expected smoothing, got {v}");
        }

        #[test]
        fn trend_is_neutral_during_warm_up() {
            let mut f = filter(5, 2);
            for t in 1..=5u64 {
                f.update(&bar(f64::from(u32::try_from(t).unwrap()), t))
                    .unwrap();
                assert_eq!(f.trend(), Trend::Neutral);
            }
        }

        #[test]
        fn pole_count_raises_the_floor() {
            // period 2 with 3 poles still needs 3 closed bars
            let mut f = filter(2, 3);
            assert_eq!(f.min_bars, 3);
            for t in 1..=3u64 {
                let price = 50.0 + f64::from(u32::try_from(t).unwrap());
                assert_eq!(f.update(&bar(price, t)), Ok(price));
            }
        }
    }

    mod steady_state {
        use super::*;

        #[test]
        fn constant_input_is_a_fixed_point() {
            for poles in [2u8, 3] {
                let mut f = filter(10, poles);
                for t in 1..=60 {
                    let v = f.update(&bar(42.0, t)).unwrap();
                    assert_approx!(v, 42.0);
                }
            }
        }

        #[test]
        fn two_pole_step_response_matches_coefficients() {
            let mut f = filter(10, 2);
            for t in 1..=10u64 {
                f.update(&bar(0.0, t)).unwrap();
            }
            // all lagged terms are zero, so the step contributes c1 * price
            let c = Coefficients::derive(10, 2);
            let v = f.update(&bar(1.0, 11)).unwrap();
            assert_eq!(v, c.c1);
        }

        #[test]
        fn three_pole_step_response_matches_coefficients() {
            let mut f = filter(10, 3);
            for t in 1..=10u64 {
                f.update(&bar(0.0, t)).unwrap();
            }
            let c = Coefficients::derive(10, 3);
            let v = f.update(&bar(1.0, 11)).unwrap();
            assert_eq!(v, c.c1);
        }

        #[test]
        fn coefficients_sum_to_unity() {
            let two = Coefficients::derive(14, 2);
            assert_approx!(4.0 * two.c1 + two.c2 + two.c3, 1.0);

            let three = Coefficients::derive(14, 3);
            assert_approx!(8.0 * three.c1 + three.c2 + three.c3 + three.c4, 1.0);
        }

        #[test]
        fn rising_input_turns_the_trend_up() {
            let mut f = filter(3, 2);
            for t in 1..=10u64 {
                f.update(&bar(f64::from(u32::try_from(t).unwrap()) * 5.0, t))
                    .unwrap();
            }
            assert_eq!(f.trend(), Trend::Up);
        }
    }

    mod repaint {
        use super::*;

        #[test]
        fn ticked_bar_matches_single_tick_bar() {
            let mut ticked = filter(3, 3);
            let mut closed = filter(3, 3);
            for t in 1..=8u64 {
                let price = 100.0 + f64::from(u32::try_from(t).unwrap());
                ticked.update(&bar(price - 0.5, t)).unwrap();
                ticked.update(&bar(price + 0.5, t)).unwrap();
                ticked.update(&bar(price, t)).unwrap();
                closed.update(&bar(price, t)).unwrap();
            }
            // bit-identical, not just approximately equal
            assert_eq!(ticked.value(), closed.value());
        }

        #[test]
        fn repaint_is_idempotent() {
            let mut f = filter(3, 2);
            for t in 1..=6u64 {
                f.update(&bar(10.0 + f64::from(u32::try_from(t).unwrap()), t))
                    .unwrap();
            }
            let first = f.update(&bar(33.0, 6)).unwrap();
            let second = f.update(&bar(33.0, 6)).unwrap();
            assert_eq!(first, second);
        }
    }

    mod config {
        use super::*;

        #[test]
        fn poles_are_clamped() {
            let low = ButterworthConfig::builder().poles(0).build();
            assert_eq!(low.poles(), 2);
            let high = ButterworthConfig::builder().poles(9).build();
            assert_eq!(high.poles(), 3);
        }

        #[test]
        fn formats_correctly() {
            let f = filter(20, 3);
            assert_eq!(f.to_string(), "Butterworth(20, 3, Close)");
        }
    }
}
