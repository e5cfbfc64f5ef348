use std::collections::HashMap;

use crate::{
    Adxvma, AdxvmaConfig, Atr, AtrConfig, Butterworth, ButterworthConfig, Ema, EmaConfig, Error,
    ExtremaConfig, Maximum, Minimum, Ohlcv, Price, Timestamp, TpoMean, TpoMeanConfig, Trend,
};

/// Opaque reference to an indicator registered in a [`Session`].
///
/// Handles are only meaningful within the session that issued them.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct IndicatorHandle(usize);

/// Input wiring of a registered indicator.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum Feed {
    /// The raw price bars pushed into [`Session::update`].
    Bars,
    /// The output stream of a previously registered indicator.
    Output(IndicatorHandle),
}

/// One-value bar synthesized from an upstream indicator output.
///
/// All four prices collapse to the upstream value and the tick size is
/// unknown, which is exactly why [`TpoMean`] refuses this input.
struct DerivedBar {
    value: Price,
    open_time: Timestamp,
}

impl Ohlcv for DerivedBar {
    fn open(&self) -> Price {
        self.value
    }
    fn high(&self) -> Price {
        self.value
    }
    fn low(&self) -> Price {
        self.value
    }
    fn close(&self) -> Price {
        self.value
    }
    fn open_time(&self) -> Timestamp {
        self.open_time
    }
}

#[derive(Clone, Debug)]
enum Slot {
    Butterworth(Butterworth),
    Ema(Ema),
    Adxvma(Adxvma),
    TpoMean(TpoMean),
    Maximum(Maximum),
    Minimum(Minimum),
    Atr(Atr),
}

/// Identity an indicator instance is deduplicated by: its type, its config
/// and its input wiring.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
enum SlotKey {
    Butterworth(ButterworthConfig, Feed),
    Ema(EmaConfig, Feed),
    Adxvma(AdxvmaConfig, Feed),
    TpoMean(TpoMeanConfig, Feed),
    Maximum(ExtremaConfig, Feed),
    Minimum(ExtremaConfig, Feed),
    Atr(AtrConfig, Feed),
}

macro_rules! dispatch {
    ($slot:expr, $inner:pat => $body:expr) => {
        match $slot {
            Slot::Butterworth($inner) => $body,
            Slot::Ema($inner) => $body,
            Slot::Adxvma($inner) => $body,
            Slot::TpoMean($inner) => $body,
            Slot::Maximum($inner) => $body,
            Slot::Minimum($inner) => $body,
            Slot::Atr($inner) => $body,
        }
    };
}

impl Slot {
    fn update(&mut self, bar: &impl Ohlcv) -> Result<Price, Error> {
        dispatch!(self, i => i.update(bar))
    }

    fn value(&self) -> Option<Price> {
        dispatch!(self, i => i.value())
    }

    fn trend(&self) -> Trend {
        dispatch!(self, i => i.trend())
    }

    fn value_at(&self, lag: usize) -> Result<Price, Error> {
        dispatch!(self, i => i.value_at(lag))
    }

    fn trend_at(&self, lag: usize) -> Result<Trend, Error> {
        match self {
            Slot::Butterworth(i) => i.trend_at(lag),
            Slot::Ema(i) => i.trend_at(lag),
            Slot::Adxvma(i) => i.trend_at(lag),
            // trendless indicators report a constant, but the lag still has
            // to address an existing bar slot
            trendless => trendless.value_at(lag).map(|_| Trend::Neutral),
        }
    }
}

/// Registry of live indicator instances over one bar stream.
///
/// Registering the same indicator type with the same config and feed twice
/// returns the original handle, so diamond-shaped wirings share state and
/// work instead of recomputing it. Instances are evaluated in registration
/// order on every [`update`](Session::update), which makes registration
/// order a valid topological order by construction: an upstream handle must
/// exist before anything can be wired to it.
///
/// # Example
///
/// ```
/// use bartrend::{ButterworthConfig, EmaConfig, Feed, Session};
/// use std::num::NonZero;
/// # use bartrend::{Ohlcv, Price, Timestamp};
/// # struct Bar(f64, u64);
/// # impl Ohlcv for Bar {
/// #     fn open(&self) -> Price { self.0 }
/// #     fn high(&self) -> Price { self.0 }
/// #     fn low(&self) -> Price { self.0 }
/// #     fn close(&self) -> Price { self.0 }
/// #     fn open_time(&self) -> Timestamp { self.1 }
/// # }
///
/// let mut session = Session::new();
/// let filter = session.butterworth(ButterworthConfig::close(NonZero::new(10).unwrap()), Feed::Bars);
/// let smoothed = session.ema(EmaConfig::close(NonZero::new(5).unwrap()), Feed::Output(filter));
///
/// for t in 1..=20 {
///     session.update(&Bar(100.0, t));
/// }
/// assert_eq!(session.value(filter), Some(100.0));
/// assert_eq!(session.value(smoothed), Some(100.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Session {
    slots: Vec<(Feed, Slot)>,
    index: HashMap<SlotKey, usize>,
}

macro_rules! register_method {
    ($(#[$attr:meta])* $name:ident, $type:ident, $config:ty) => {
        $(#[$attr])*
        ///
        /// # Panics
        ///
        /// Panics if `feed` refers to a handle that was not issued by this
        /// session.
        pub fn $name(&mut self, config: $config, feed: Feed) -> IndicatorHandle {
            self.get_or_create(SlotKey::$type(config, feed), feed, || {
                Slot::$type($type::new(config))
            })
        }
    };
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered indicator instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no indicator has been registered yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    register_method!(
        /// Registers a [`Butterworth`] filter, reusing an existing instance
        /// with the same config and feed.
        butterworth,
        Butterworth,
        ButterworthConfig
    );
    register_method!(
        /// Registers an [`Ema`], reusing an existing instance with the same
        /// config and feed.
        ema,
        Ema,
        EmaConfig
    );
    register_method!(
        /// Registers an [`Adxvma`], reusing an existing instance with the
        /// same config and feed.
        adxvma,
        Adxvma,
        AdxvmaConfig
    );
    register_method!(
        /// Registers a rolling [`Maximum`], reusing an existing instance
        /// with the same config and feed.
        maximum,
        Maximum,
        ExtremaConfig
    );
    register_method!(
        /// Registers a rolling [`Minimum`], reusing an existing instance
        /// with the same config and feed.
        minimum,
        Minimum,
        ExtremaConfig
    );
    register_method!(
        /// Registers an [`Atr`], reusing an existing instance with the same
        /// config and feed.
        atr,
        Atr,
        AtrConfig
    );

    /// Registers a [`TpoMean`], reusing an existing instance with the same
    /// config and feed.
    ///
    /// A TPO mean wired to [`Feed::Output`] is registered in a permanently
    /// unavailable state: it needs real high/low/tick data, which a derived
    /// stream cannot provide. Its value stays `None` and everything fed from
    /// it is skipped.
    ///
    /// # Panics
    ///
    /// Panics if `feed` refers to a handle that was not issued by this
    /// session.
    pub fn tpo_mean(&mut self, config: TpoMeanConfig, feed: Feed) -> IndicatorHandle {
        self.get_or_create(SlotKey::TpoMean(config, feed), feed, || {
            let mut tpo = TpoMean::new(config);
            if matches!(feed, Feed::Output(_)) {
                tpo.mark_derived();
            }
            Slot::TpoMean(tpo)
        })
    }

    fn get_or_create(
        &mut self,
        key: SlotKey,
        feed: Feed,
        create: impl FnOnce() -> Slot,
    ) -> IndicatorHandle {
        if let Feed::Output(upstream) = feed {
            assert!(
                upstream.0 < self.slots.len(),
                "upstream handle must be registered in this session first"
            );
        }
        if let Some(&slot) = self.index.get(&key) {
            return IndicatorHandle(slot);
        }
        let slot = self.slots.len();
        self.slots.push((feed, create()));
        self.index.insert(key, slot);
        IndicatorHandle(slot)
    }

    /// Feeds one tick to every registered indicator, in registration order.
    ///
    /// Bar-fed indicators see the tick as-is. Output-fed indicators see a
    /// synthesized one-value bar carrying the upstream's freshly updated
    /// value and the tick's `open_time`; while the upstream has no value yet
    /// they are skipped and see nothing.
    pub fn update(&mut self, bar: &impl Ohlcv) {
        for slot in 0..self.slots.len() {
            match self.slots[slot].0 {
                Feed::Bars => {
                    let _ = self.slots[slot].1.update(bar);
                }
                Feed::Output(upstream) => {
                    let Some(value) = self.slots[upstream.0].1.value() else {
                        continue;
                    };
                    let derived = DerivedBar {
                        value,
                        open_time: bar.open_time(),
                    };
                    let _ = self.slots[slot].1.update(&derived);
                }
            }
        }
    }

    fn slot(&self, handle: IndicatorHandle) -> &Slot {
        &self
            .slots
            .get(handle.0)
            .expect("handle must be issued by this session")
            .1
    }

    /// Current value of the referenced indicator, or `None` before its first
    /// bar (or forever, for an unavailable instance).
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this session.
    #[must_use]
    pub fn value(&self, handle: IndicatorHandle) -> Option<Price> {
        self.slot(handle).value()
    }

    /// Current trend of the referenced indicator.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this session.
    #[must_use]
    pub fn trend(&self, handle: IndicatorHandle) -> Trend {
        self.slot(handle).trend()
    }

    /// Value of the referenced indicator `lag` bars back.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this session.
    pub fn at(&self, handle: IndicatorHandle, lag: usize) -> Result<Price, Error> {
        self.slot(handle).value_at(lag)
    }

    /// Trend of the referenced indicator `lag` bars back. Trendless
    /// indicators report [`Neutral`](Trend::Neutral) at every valid lag.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] past the available history.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was not issued by this session.
    pub fn trend_at(&self, handle: IndicatorHandle, lag: usize) -> Result<Trend, Error> {
        self.slot(handle).trend_at(lag)
    }
}
