#![allow(dead_code)]

use bartrend::{Ohlcv, Price, Timestamp};
use serde::{Deserialize, de::DeserializeOwned};

/// Tick size of the fixture instrument (ES-style quarter points).
pub const TICK_SIZE: f64 = 0.25;

/// OHLC bar parsed from the fixture CSV.
#[derive(Debug, Clone, Deserialize)]
pub struct RefBar {
    pub open_time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlcv for RefBar {
    fn open(&self) -> Price {
        self.open
    }

    fn high(&self) -> Price {
        self.high
    }

    fn low(&self) -> Price {
        self.low
    }

    fn close(&self) -> Price {
        self.close
    }

    fn open_time(&self) -> Timestamp {
        self.open_time
    }

    fn tick_size(&self) -> f64 {
        TICK_SIZE
    }
}

const OHLC_PATH: &str = "tests/fixtures/data/es-1m.csv";

/// Load the fixture bar stream (240 one-minute bars, tick-aligned).
pub fn load_reference_ohlc() -> Vec<RefBar> {
    load_records(OHLC_PATH, "invalid OHLC record")
}

/// Creates perturbed versions of a bar to simulate live repaints.
///
/// Returns 2 intermediate bars (narrower range, provisional close) followed
/// by the original bar. All share the same `open_time`, so an indicator sees
/// them as ticks of one forming bar.
pub fn repaint_sequence(bar: &RefBar) -> Vec<RefBar> {
    let t = bar.open_time;
    vec![
        // First tick: only the open is known
        RefBar {
            open: bar.open,
            high: bar.open + TICK_SIZE,
            low: bar.open - TICK_SIZE,
            close: bar.open,
            open_time: t,
        },
        // Mid-bar: partial movement toward final values
        RefBar {
            open: bar.open,
            high: bar.open.midpoint(bar.high),
            low: bar.open.midpoint(bar.low),
            close: bar.open.midpoint(bar.close),
            open_time: t,
        },
        // Final: real OHLC values
        RefBar {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            open_time: t,
        },
    ]
}

fn load_records<D>(path: &str, expect_msg: &str) -> Vec<D>
where
    D: DeserializeOwned,
{
    let mut rdr =
        csv::Reader::from_path(path).unwrap_or_else(|e| panic!("failed to open {path}: {e}"));

    rdr.deserialize().map(|r| r.expect(expect_msg)).collect()
}
