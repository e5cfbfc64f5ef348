use thiserror::Error;

/// Errors surfaced by lag-indexed reads and indicator updates.
///
/// Warm-up is never an error: indicators pass the raw input through until
/// enough history exists. Contract violations (reading a dependency that has
/// not been evaluated this bar) are panics, not `Error` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A lag-indexed read past the available history.
    ///
    /// `len` is the number of bar slots retained by the series; with bounded
    /// retention this may be smaller than the number of bars processed.
    #[error("lag {lag} out of range: {len} bar(s) retained")]
    OutOfRange {
        /// Requested lag (0 = current bar).
        lag: usize,
        /// Retained bar slots at the time of the read.
        len: usize,
    },

    /// The indicator only works on raw price bars but was wired to a derived
    /// series. The instance stays in a display-only state: `value()` remains
    /// `None` and no numeric state is ever touched.
    #[error("indicator requires raw price bars, not a derived series")]
    NonPriceInput,
}
