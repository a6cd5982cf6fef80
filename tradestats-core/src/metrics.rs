//! Performance metrics: pure functions that compute trade statistics.
//!
//! Every metric is a pure function: cleaned series or validated table in,
//! scalar out. Degenerate input (no trades, no wins, nothing parseable)
//! yields the metric's documented zero instead of `NaN` or an error. Only the
//! drawdown functions can fail, and only on structural problems.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::{Outcome, ValidatedTrades};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cannot compute drawdown: peak value of -100% at index {index}")]
    PeakAtMinusHundred { index: usize },

    #[error("cannot compute drawdown: non-finite value at index {index}")]
    NonFinite { index: usize },
}

// ─── Win rate ───────────────────────────────────────────────────────

/// `wins / (wins + losses)`; breakevens do not count. 0.0 with no decisive trades.
pub fn win_rate(wins: usize, losses: usize) -> f64 {
    let decisive = wins + losses;
    if decisive == 0 {
        return 0.0;
    }
    wins as f64 / decisive as f64
}

/// `wins / total`, where `total` includes breakevens and unlabelled rows.
pub fn win_rate_with_breakevens(wins: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    wins as f64 / total as f64
}

/// Outcome tallies for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
    /// Every row, labelled or not.
    pub total: usize,
}

impl OutcomeCounts {
    pub fn from_outcomes(outcomes: &[Option<Outcome>]) -> Self {
        let mut counts = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in outcomes.iter().flatten() {
            match outcome {
                Outcome::Win => counts.wins += 1,
                Outcome::Loss => counts.losses += 1,
                Outcome::Breakeven => counts.breakevens += 1,
            }
        }
        counts
    }

    pub fn from_trades(trades: &ValidatedTrades<'_>) -> Self {
        Self::from_outcomes(&trades.outcomes())
    }

    pub fn win_rate(&self) -> f64 {
        win_rate(self.wins, self.losses)
    }

    pub fn win_rate_with_breakevens(&self) -> f64 {
        win_rate_with_breakevens(self.wins, self.total)
    }
}

// ─── Averages ───────────────────────────────────────────────────────

/// Averages over cleaned P/L, risk and R/R series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageMetrics {
    /// Mean of P/L values > 0.
    pub avg_win: f64,
    /// Mean magnitude of P/L values < 0 (non-negative).
    pub avg_loss: f64,
    pub avg_risk: f64,
    pub avg_rr: f64,
}

/// Average win, average loss (as a positive magnitude), average risk and
/// average R/R. Any empty subset averages to 0.0.
pub fn avg_metrics(pl: &[f64], risk: &[f64], rr: &[f64]) -> AverageMetrics {
    let wins: Vec<f64> = pl.iter().copied().filter(|v| *v > 0.0).collect();
    let losses: Vec<f64> = pl.iter().copied().filter(|v| *v < 0.0).collect();
    AverageMetrics {
        avg_win: mean_f64(&wins),
        avg_loss: mean_f64(&losses).abs(),
        avg_risk: mean_f64(risk),
        avg_rr: mean_f64(rr),
    }
}

/// Largest and smallest P/L. `(0.0, 0.0)` when empty.
pub fn best_worst_trade(pl: &[f64]) -> (f64, f64) {
    if pl.is_empty() {
        return (0.0, 0.0);
    }
    let best = pl.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst = pl.iter().copied().fold(f64::INFINITY, f64::min);
    (best, worst)
}

/// Plain sum of P/L.
pub fn total_pl(pl: &[f64]) -> f64 {
    pl.iter().sum()
}

// ─── Expectancy ─────────────────────────────────────────────────────

/// Expected P/L per trade: `win_rate * avg_win - (1 - win_rate) * avg_loss`.
///
/// Win rate comes from outcome counts, averages from the sign of `pl`, with
/// the same empty-subset conventions as [`win_rate`] and [`avg_metrics`].
pub fn expectancy(pl: &[f64], wins: usize, losses: usize) -> f64 {
    let averages = avg_metrics(pl, &[], &[]);
    expectancy_from(win_rate(wins, losses), averages.avg_win, averages.avg_loss)
}

/// The expectancy formula on precomputed inputs; `avg_loss` is a magnitude.
pub fn expectancy_from(win_rate: f64, avg_win: f64, avg_loss: f64) -> f64 {
    win_rate * avg_win - (1.0 - win_rate) * avg_loss
}

// ─── Drawdown ───────────────────────────────────────────────────────

/// A returns curve in one of its two input modes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReturnsCurve<'a> {
    /// Fractional per-trade returns, compounded into a growth curve.
    PerTrade(&'a [f64]),
    /// An already compounded growth curve (baseline 0.0), used as-is.
    Cumulative(&'a [f64]),
}

impl<'a> ReturnsCurve<'a> {
    /// Resolve the two mutually exclusive inputs. Exactly one must be given.
    pub fn from_inputs(
        per_trade: Option<&'a [f64]>,
        cumulative: Option<&'a [f64]>,
    ) -> Result<Self, MetricsError> {
        match (per_trade, cumulative) {
            (Some(returns), None) => Ok(ReturnsCurve::PerTrade(returns)),
            (None, Some(curve)) => Ok(ReturnsCurve::Cumulative(curve)),
            _ => Err(MetricsError::Configuration(
                "provide exactly one of per-trade returns or cumulative returns".into(),
            )),
        }
    }

    /// The growth curve `g`, where `g_i = prod(1 + r_k, k <= i) - 1`.
    pub fn growth_curve(&self) -> Vec<f64> {
        match self {
            ReturnsCurve::PerTrade(returns) => compound(returns),
            ReturnsCurve::Cumulative(curve) => curve.to_vec(),
        }
    }

    /// Maximum drawdown as a non-negative fraction (0.10 = 10%).
    ///
    /// Drawdown at `i` is `(g_i - p_i) / (1 + p_i)` with `p` the running peak
    /// of the growth curve. An empty curve has no drawdown.
    pub fn max_drawdown(&self) -> Result<f64, MetricsError> {
        let curve = self.growth_curve();
        let mut peak = f64::NEG_INFINITY;
        let mut worst = 0.0_f64;

        for (index, &g) in curve.iter().enumerate() {
            if !g.is_finite() {
                return Err(MetricsError::NonFinite { index });
            }
            if g > peak {
                peak = g;
            }
            let base = 1.0 + peak;
            if base == 0.0 {
                return Err(MetricsError::PeakAtMinusHundred { index });
            }
            let dd = (g - peak) / base;
            if dd < worst {
                worst = dd;
            }
        }
        Ok(0.0 - worst)
    }
}

/// Compound per-period returns into a growth curve with baseline 0.0.
pub fn compound(returns: &[f64]) -> Vec<f64> {
    let mut wealth = 1.0;
    returns
        .iter()
        .map(|r| {
            wealth *= 1.0 + r;
            wealth - 1.0
        })
        .collect()
}

/// Max drawdown from per-trade returns or from a cumulative curve.
///
/// Exactly one of the two must be supplied.
pub fn max_drawdown_from_pct_returns(
    per_trade: Option<&[f64]>,
    cumulative: Option<&[f64]>,
) -> Result<f64, MetricsError> {
    ReturnsCurve::from_inputs(per_trade, cumulative)?.max_drawdown()
}

/// Max drawdown from absolute equity balances: `(balance - peak) / peak`.
///
/// Balances must be non-empty and strictly positive.
pub fn max_drawdown_from_equity(balances: &[f64]) -> Result<f64, MetricsError> {
    if balances.is_empty() {
        return Err(MetricsError::Configuration(
            "equity balances must be provided and non-empty".into(),
        ));
    }
    if let Some(index) = balances.iter().position(|b| !(*b > 0.0 && b.is_finite())) {
        return Err(MetricsError::Configuration(format!(
            "equity balances must be positive (index {index} is {})",
            balances[index]
        )));
    }

    let mut peak = balances[0];
    let mut worst = 0.0_f64;
    for &balance in balances {
        if balance > peak {
            peak = balance;
        }
        let dd = (balance - peak) / peak;
        if dd < worst {
            worst = dd;
        }
    }
    Ok(0.0 - worst)
}

// ─── Durations ──────────────────────────────────────────────────────

/// Shortest and longest winning trade in minutes.
///
/// Only rows with outcome `WIN`, both times parseable, and a positive
/// elapsed time qualify; exits recorded before entries are excluded.
/// `(0.0, 0.0)` when nothing qualifies.
pub fn winning_durations(
    entries: &[Option<NaiveTime>],
    exits: &[Option<NaiveTime>],
    outcomes: &[Option<Outcome>],
) -> (f64, f64) {
    let minutes: Vec<f64> = entries
        .iter()
        .zip(exits)
        .zip(outcomes)
        .filter(|(_, outcome)| **outcome == Some(Outcome::Win))
        .filter_map(|((entry, exit), _)| {
            let (entry, exit) = ((*entry)?, (*exit)?);
            let elapsed = exit.signed_duration_since(entry);
            Some(elapsed.num_milliseconds() as f64 / 60_000.0)
        })
        .filter(|m| *m > 0.0)
        .collect();

    if minutes.is_empty() {
        return (0.0, 0.0);
    }
    let min = minutes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = minutes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, max)
}

/// [`winning_durations`] over the table's `entry_time` / `exit_time` columns.
pub fn trade_durations(trades: &ValidatedTrades<'_>) -> (f64, f64) {
    winning_durations(
        &trades.times("entry_time"),
        &trades.times("exit_time"),
        &trades.outcomes(),
    )
}

// ─── Streaks ────────────────────────────────────────────────────────

/// Longest run of consecutive `LOSS` rows. Any other row breaks the run.
pub fn max_consecutive_losses(outcomes: &[Option<Outcome>]) -> usize {
    max_consecutive(outcomes, Outcome::Loss)
}

/// [`max_consecutive_losses`] over the table's outcome column, in table order.
pub fn consecutive_losses(trades: &ValidatedTrades<'_>) -> usize {
    max_consecutive_losses(&trades.outcomes())
}

fn max_consecutive(outcomes: &[Option<Outcome>], target: Outcome) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for outcome in outcomes {
        if *outcome == Some(target) {
            current += 1;
            if current > max_streak {
                max_streak = current;
            }
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TradeTable;
    use polars::prelude::*;

    const EPS: f64 = 1e-10;

    fn outcomes(labels: &[&str]) -> Vec<Option<Outcome>> {
        labels.iter().map(|l| Outcome::from_label(l)).collect()
    }

    fn time(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    // ── Win rate ──

    #[test]
    fn win_rate_no_decisive_trades_is_zero() {
        assert_eq!(win_rate(0, 0), 0.0);
    }

    #[test]
    fn win_rate_mixed() {
        assert!((win_rate(6, 4) - 0.6).abs() < EPS);
        assert!((win_rate(3, 0) - 1.0).abs() < EPS);
    }

    #[test]
    fn win_rate_with_breakevens_uses_all_rows() {
        let counts = OutcomeCounts::from_outcomes(&outcomes(&["WIN", "LOSS", "BE", "WIN", "?"]));
        assert_eq!(counts.wins, 2);
        assert_eq!(counts.losses, 1);
        assert_eq!(counts.breakevens, 1);
        assert_eq!(counts.total, 5);
        assert!((counts.win_rate() - 2.0 / 3.0).abs() < EPS);
        assert!((counts.win_rate_with_breakevens() - 0.4).abs() < EPS);
        assert_eq!(win_rate_with_breakevens(0, 0), 0.0);
    }

    // ── Averages ──

    #[test]
    fn avg_metrics_mixed() {
        let pl = [0.02, -0.01, 0.04, -0.03, 0.0];
        let m = avg_metrics(&pl, &[0.01, 0.01, 0.02], &[2.0, -1.0]);
        assert!((m.avg_win - 0.03).abs() < EPS);
        assert!((m.avg_loss - 0.02).abs() < EPS);
        assert!((m.avg_risk - 0.04 / 3.0).abs() < EPS);
        assert!((m.avg_rr - 0.5).abs() < EPS);
    }

    #[test]
    fn avg_metrics_all_losers() {
        let m = avg_metrics(&[-0.01, -0.03], &[], &[]);
        assert_eq!(m.avg_win, 0.0);
        assert!(!m.avg_win.is_nan());
        assert!((m.avg_loss - 0.02).abs() < EPS);
        assert_eq!(m.avg_risk, 0.0);
        assert_eq!(m.avg_rr, 0.0);
    }

    #[test]
    fn best_worst_known() {
        assert_eq!(best_worst_trade(&[0.01, -0.05, 0.07]), (0.07, -0.05));
        assert_eq!(best_worst_trade(&[]), (0.0, 0.0));
    }

    // ── Expectancy ──

    #[test]
    fn expectancy_known() {
        assert!((expectancy_from(0.6, 0.05, 0.03) - 0.018).abs() < EPS);
        // avg win 0.05, avg loss 0.03 from the P/L signs; 6 wins, 4 losses by label.
        let pl = [0.05, 0.05, -0.03, -0.03];
        assert!((expectancy(&pl, 6, 4) - 0.018).abs() < EPS);
    }

    #[test]
    fn expectancy_empty_is_zero() {
        assert_eq!(expectancy(&[], 0, 0), 0.0);
    }

    // ── Drawdown ──

    #[test]
    fn drawdown_requires_exactly_one_input() {
        let r = [0.1];
        assert!(matches!(
            max_drawdown_from_pct_returns(None, None),
            Err(MetricsError::Configuration(_))
        ));
        assert!(matches!(
            max_drawdown_from_pct_returns(Some(&r), Some(&r)),
            Err(MetricsError::Configuration(_))
        ));
    }

    #[test]
    fn drawdown_zero_returns() {
        let dd = max_drawdown_from_pct_returns(Some(&[0.0; 10]), None).unwrap();
        assert_eq!(dd, 0.0);
    }

    #[test]
    fn drawdown_compounds_per_trade_returns() {
        let curve = compound(&[0.10, -0.10]);
        assert!((curve[0] - 0.10).abs() < EPS);
        assert!((curve[1] - (-0.01)).abs() < EPS);

        // (-0.01 - 0.10) / 1.10 = -0.10, not 0.11 or 0.20.
        let dd = max_drawdown_from_pct_returns(Some(&[0.10, -0.10]), None).unwrap();
        assert!((dd - 0.10).abs() < 1e-9, "got {dd}");
    }

    #[test]
    fn drawdown_cumulative_curve_used_as_is() {
        let dd = max_drawdown_from_pct_returns(None, Some(&[0.10, -0.01])).unwrap();
        assert!((dd - 0.10).abs() < 1e-9);
    }

    #[test]
    fn drawdown_monotonic_is_zero() {
        let dd = max_drawdown_from_pct_returns(Some(&[0.01, 0.02, 0.03]), None).unwrap();
        assert_eq!(dd, 0.0);
    }

    #[test]
    fn drawdown_empty_curve_is_zero() {
        assert_eq!(max_drawdown_from_pct_returns(Some(&[]), None).unwrap(), 0.0);
    }

    #[test]
    fn drawdown_minus_hundred_peak_is_an_error() {
        let err = max_drawdown_from_pct_returns(None, Some(&[-1.0, -1.0])).unwrap_err();
        assert_eq!(err, MetricsError::PeakAtMinusHundred { index: 0 });

        let err = max_drawdown_from_pct_returns(Some(&[-1.0, 0.5]), None).unwrap_err();
        assert_eq!(err, MetricsError::PeakAtMinusHundred { index: 0 });
    }

    #[test]
    fn drawdown_rejects_non_finite_curve() {
        let err = max_drawdown_from_pct_returns(None, Some(&[0.1, f64::NAN])).unwrap_err();
        assert_eq!(err, MetricsError::NonFinite { index: 1 });
    }

    #[test]
    fn equity_drawdown_known() {
        let dd = max_drawdown_from_equity(&[100.0, 90.0, 95.0, 80.0, 120.0]).unwrap();
        assert!((dd - 0.20).abs() < EPS);
    }

    #[test]
    fn equity_drawdown_rejects_empty_and_non_positive() {
        assert!(matches!(
            max_drawdown_from_equity(&[]),
            Err(MetricsError::Configuration(_))
        ));
        assert!(matches!(
            max_drawdown_from_equity(&[100.0, 0.0, 50.0]),
            Err(MetricsError::Configuration(_))
        ));
        assert!(matches!(
            max_drawdown_from_equity(&[100.0, -5.0]),
            Err(MetricsError::Configuration(_))
        ));
    }

    // ── Durations ──

    #[test]
    fn durations_only_count_positive_wins() {
        let entries = [time(9, 0), time(10, 0), time(11, 0), time(12, 0)];
        let exits = [time(9, 45), time(9, 30), time(13, 0), time(12, 10)];
        let outs = outcomes(&["WIN", "WIN", "WIN", "LOSS"]);
        // Row 1 exits before entry; row 3 is a loss.
        assert_eq!(winning_durations(&entries, &exits, &outs), (45.0, 120.0));
    }

    #[test]
    fn durations_all_reversed_is_zero() {
        let entries = [time(10, 0), time(15, 0)];
        let exits = [time(9, 0), time(14, 0)];
        let outs = outcomes(&["WIN", "WIN"]);
        assert_eq!(winning_durations(&entries, &exits, &outs), (0.0, 0.0));
    }

    #[test]
    fn durations_from_table_with_unparseable_times() {
        let df = df!(
            "outcome" => &["WIN", "WIN", "WIN"],
            "entry_time" => &["09:00:00", "garbage", "23:50:00"],
            "exit_time" => &["09:30:00", "10:00:00", "00:10:00"],
        )
        .unwrap();
        let table = TradeTable::new(df);
        let trades = table.validate(&["outcome", "entry_time", "exit_time"]).unwrap();
        // Only the first row qualifies; the midnight crossing is excluded.
        assert_eq!(trade_durations(&trades), (30.0, 30.0));
    }

    // ── Streaks ──

    #[test]
    fn consecutive_losses_known() {
        let outs = outcomes(&["LOSS", "LOSS", "WIN", "LOSS", "LOSS", "LOSS", "BE"]);
        assert_eq!(max_consecutive_losses(&outs), 3);
    }

    #[test]
    fn breakeven_breaks_a_losing_streak() {
        let outs = outcomes(&["LOSS", "BE", "LOSS", "LOSS"]);
        assert_eq!(max_consecutive_losses(&outs), 2);
    }

    #[test]
    fn consecutive_empty() {
        assert_eq!(max_consecutive_losses(&[]), 0);
    }

    #[test]
    fn consecutive_losses_from_table() {
        let df = df!("outcome" => &["WIN", "LOSS", "LOSS", "WIN"]).unwrap();
        let table = TradeTable::new(df);
        let trades = table.validate(&["outcome"]).unwrap();
        assert_eq!(consecutive_losses(&trades), 2);
    }

    #[test]
    fn mean_helper() {
        assert_eq!(mean_f64(&[]), 0.0);
        assert!((mean_f64(&[1.0, 2.0, 3.0]) - 2.0).abs() < EPS);
    }
}
