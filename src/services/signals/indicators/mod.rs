//! Technical indicator implementations.
//!
//! Every indicator is a pure function returning `None` when the series is
//! too short for its lookback; absent values are never substituted with
//! zeros or NaN.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod cci;
pub mod donchian;
pub mod ema;
pub mod fisher;
pub mod hull;
pub mod keltner;
pub mod macd;
pub mod momentum;
pub mod psar;
pub mod rsi;
pub mod sma;
pub mod stats;
pub mod stochastic;
pub mod supertrend;
pub mod ultimate;
pub mod volume;
pub mod williams;

use crate::types::{Candle, IndicatorValues};

/// Build the working series: closed candles, optionally followed by the
/// forming candle's current OHLC.
pub fn working_series(closed: &[Candle], forming: Option<&Candle>) -> Vec<Candle> {
    let mut series = Vec::with_capacity(closed.len() + 1);
    series.extend_from_slice(closed);
    if let Some(candle) = forming {
        series.push(candle.clone());
    }
    series
}

/// Compute the full indicator record for a candle series.
pub fn compute(closed: &[Candle], forming: Option<&Candle>) -> IndicatorValues {
    let series = working_series(closed, forming);
    if series.is_empty() {
        return IndicatorValues::default();
    }
    let closes: Vec<f64> = series.iter().map(|c| c.close).collect();

    IndicatorValues {
        ema_5: ema::ema(&closes, 5),
        ema_9: ema::ema(&closes, 9),
        ema_12: ema::ema(&closes, 12),
        ema_21: ema::ema(&closes, 21),
        ema_50: ema::ema(&closes, 50),
        sma_20: sma::sma(&closes, 20),
        sma_50: sma::sma(&closes, 50),
        sma_200: sma::sma(&closes, 200),
        macd: macd::macd(&closes),
        rsi_14: rsi::rsi(&closes, 14),
        stochastic: stochastic::stochastic(&series),
        atr_14: atr::atr(&series, 14),
        adx_14: adx::adx(&series, 14),
        cci_20: cci::cci(&series, 20),
        williams_r: williams::williams_r(&series, 14),
        bollinger: bollinger::bollinger(&closes, 20, 2.0),
        keltner: keltner::keltner(&series, 20, 2.0),
        hull_9: hull::hull(&closes, 9),
        supertrend: supertrend::supertrend(&series, 10, 3.0),
        roc_12: momentum::roc(&closes, 12),
        momentum_10: momentum::momentum(&closes, 10),
        vwap: volume::vwap(&series),
        obv: volume::obv(&series),
        chaikin: volume::chaikin(&series),
        fisher_10: fisher::fisher(&series, 10),
        donchian: donchian::donchian(&series, 20),
        psar: psar::psar(&series, 0.02, 0.2),
        ultimate: ultimate::ultimate(&series),
        zscore_20: stats::zscore(&closes, 20),
        linreg_slope_14: stats::linreg_slope(&closes, 14),
        atr_bands: atr::atr_bands(&series, 14, 2.0),
        range_percentile: stats::range_percentile(&series, 20),
        ema_ribbon: stats::ema_ribbon(&closes),
    }
}
