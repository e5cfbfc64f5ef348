use std::fmt::Display;

/// Discrete trend state derived from an indicator's primary output.
///
/// Classification is pure: both constructors below are functions of their
/// arguments only, and indicators write the result into their own trend
/// series. Rendering and alerting collaborators read that series by lag and
/// never feed back into the computation.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Default, Debug)]
pub enum Trend {
    /// Falling / bearish.
    Down,
    /// No established direction.
    #[default]
    Neutral,
    /// Rising / bullish.
    Up,
}

impl Trend {
    /// Classifies by comparing consecutive output values.
    #[inline]
    #[must_use]
    pub fn of_slope(current: f64, previous: f64) -> Self {
        if current > previous {
            Self::Up
        } else if current < previous {
            Self::Down
        } else {
            Self::Neutral
        }
    }

    /// Hysteretic band classifier.
    ///
    /// `value` flips the state to [`Up`](Trend::Up) only when it exceeds
    /// `reference + band` *and* the previous state is not already
    /// [`Down`](Trend::Down); symmetrically for `Down`. When neither
    /// threshold holds the state re-enters [`Neutral`](Trend::Neutral).
    ///
    /// The opposite-side guard means a direct `Up -> Down` (or `Down -> Up`)
    /// transition is impossible: the state must pass through `Neutral` first,
    /// which is what suppresses chatter at the band edges.
    #[inline]
    #[must_use]
    pub fn with_bands(previous: Self, value: f64, reference: f64, band: f64) -> Self {
        if previous != Self::Down && value > reference + band {
            Self::Up
        } else if previous != Self::Up && value < reference - band {
            Self::Down
        } else {
            Self::Neutral
        }
    }

    /// The conventional integer encoding: `-1`, `0`, `+1`.
    #[inline]
    #[must_use]
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Down => -1,
            Self::Neutral => 0,
            Self::Up => 1,
        }
    }
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
