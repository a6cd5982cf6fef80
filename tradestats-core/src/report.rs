//! Report assembly: every metric computed once, collected in a fixed order.
//!
//! The report is built fresh from one table snapshot and handed straight to
//! presentation. Degenerate columns never abort assembly: each metric falls
//! back to its own zero. The only failures are a schema mismatch (before any
//! metric runs) and a -100% peak in the P/L growth curve.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::Write as _;

use crate::cleaning::CleanOptions;
use crate::config::StatsConfig;
use crate::error::StatsError;
use crate::metrics::{
    avg_metrics, best_worst_trade, consecutive_losses, expectancy_from,
    max_drawdown_from_pct_returns, total_pl, trade_durations, MetricsError, OutcomeCounts,
};
use crate::table::{TradeTable, ValidatedTrades};

/// Report vocabulary, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKey {
    TotalTrades,
    TotalPl,
    Winrate,
    WinningTrades,
    LosingTrades,
    AvgWin,
    AvgLoss,
    Risk,
    AvgRr,
    BestTrade,
    WorstTrade,
    MaxDrawdown,
    Expectancy,
    MinDurationMins,
    MaxDurationMins,
    MaxConsecutiveLosses,
}

impl StatKey {
    pub const ALL: [StatKey; 16] = [
        StatKey::TotalTrades,
        StatKey::TotalPl,
        StatKey::Winrate,
        StatKey::WinningTrades,
        StatKey::LosingTrades,
        StatKey::AvgWin,
        StatKey::AvgLoss,
        StatKey::Risk,
        StatKey::AvgRr,
        StatKey::BestTrade,
        StatKey::WorstTrade,
        StatKey::MaxDrawdown,
        StatKey::Expectancy,
        StatKey::MinDurationMins,
        StatKey::MaxDurationMins,
        StatKey::MaxConsecutiveLosses,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatKey::TotalTrades => "Total Trades",
            StatKey::TotalPl => "Total P/L",
            StatKey::Winrate => "Winrate",
            StatKey::WinningTrades => "Winning Trades",
            StatKey::LosingTrades => "Losing Trades",
            StatKey::AvgWin => "Avg Win",
            StatKey::AvgLoss => "Avg Loss",
            StatKey::Risk => "Risk",
            StatKey::AvgRr => "Avg RR",
            StatKey::BestTrade => "Best Trade",
            StatKey::WorstTrade => "Worst Trade",
            StatKey::MaxDrawdown => "Max Drawdown",
            StatKey::Expectancy => "Expectancy",
            StatKey::MinDurationMins => "Min Duration (mins)",
            StatKey::MaxDurationMins => "Max Duration (mins)",
            StatKey::MaxConsecutiveLosses => "Max Consecutive Losses",
        }
    }

    /// Values that are decimal fractions and read better as percentages.
    pub fn is_fraction(&self) -> bool {
        matches!(
            self,
            StatKey::TotalPl
                | StatKey::Winrate
                | StatKey::AvgWin
                | StatKey::AvgLoss
                | StatKey::Risk
                | StatKey::BestTrade
                | StatKey::WorstTrade
                | StatKey::MaxDrawdown
                | StatKey::Expectancy
        )
    }
}

/// A report value: a count or a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Count(usize),
    Value(f64),
}

impl StatValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            StatValue::Count(n) => *n as f64,
            StatValue::Value(v) => *v,
        }
    }
}

impl Serialize for StatValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatValue::Count(n) => serializer.serialize_u64(*n as u64),
            StatValue::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

/// Human-readable rendering of one report value.
pub fn format_value(key: StatKey, value: StatValue) -> String {
    match value {
        StatValue::Count(n) => n.to_string(),
        StatValue::Value(v) if key.is_fraction() => format!("{:.2}%", v * 100.0),
        StatValue::Value(v) => match key {
            StatKey::MinDurationMins | StatKey::MaxDurationMins => format!("{v:.1}"),
            _ => format!("{v:.2}"),
        },
    }
}

/// Trading performance summary for one table snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub total_trades: usize,
    pub total_pl: f64,
    pub win_rate: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub risk: f64,
    pub avg_rr: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub max_drawdown: f64,
    pub expectancy: f64,
    pub min_duration_mins: f64,
    pub max_duration_mins: f64,
    pub max_consecutive_losses: usize,
}

impl StatsReport {
    /// Validate `table` against the configured columns, then assemble.
    pub fn from_table(table: &TradeTable, config: &StatsConfig) -> Result<Self, StatsError> {
        let required = config.required_columns();
        let trades = table.validate(&required)?;
        Ok(Self::assemble(&trades, config.cleaning)?)
    }

    /// Compute every metric once over a validated table.
    pub fn assemble(trades: &ValidatedTrades<'_>, opts: CleanOptions) -> Result<Self, MetricsError> {
        tracing::debug!(rows = trades.len(), ?opts, "assembling stats report");

        let pl = trades.cleaned("pl_by_percentage", opts).valid();
        let risk = trades.cleaned("risk_by_percentage", opts).valid();
        let rr = trades.cleaned("pl_by_rr", opts.as_lenient()).valid();

        let counts = OutcomeCounts::from_trades(trades);
        if counts.wins + counts.losses == 0 {
            tracing::warn!(rows = counts.total, "no WIN/LOSS outcomes; win rate reported as 0");
        }
        let win_rate = counts.win_rate();
        let averages = avg_metrics(&pl, &risk, &rr);
        let (best_trade, worst_trade) = best_worst_trade(&pl);
        let max_drawdown = max_drawdown_from_pct_returns(Some(&pl), None)?;
        let expectancy = expectancy_from(win_rate, averages.avg_win, averages.avg_loss);
        let (min_duration_mins, max_duration_mins) = trade_durations(trades);
        if max_duration_mins == 0.0 && counts.wins > 0 {
            tracing::warn!("no winning trade has a usable entry/exit time; durations reported as 0");
        }

        Ok(Self {
            total_trades: trades.len(),
            total_pl: total_pl(&pl),
            win_rate,
            winning_trades: counts.wins,
            losing_trades: counts.losses,
            avg_win: averages.avg_win,
            avg_loss: averages.avg_loss,
            risk: averages.avg_risk,
            avg_rr: averages.avg_rr,
            best_trade,
            worst_trade,
            max_drawdown,
            expectancy,
            min_duration_mins,
            max_duration_mins,
            max_consecutive_losses: consecutive_losses(trades),
        })
    }

    pub fn get(&self, key: StatKey) -> StatValue {
        match key {
            StatKey::TotalTrades => StatValue::Count(self.total_trades),
            StatKey::TotalPl => StatValue::Value(self.total_pl),
            StatKey::Winrate => StatValue::Value(self.win_rate),
            StatKey::WinningTrades => StatValue::Count(self.winning_trades),
            StatKey::LosingTrades => StatValue::Count(self.losing_trades),
            StatKey::AvgWin => StatValue::Value(self.avg_win),
            StatKey::AvgLoss => StatValue::Value(self.avg_loss),
            StatKey::Risk => StatValue::Value(self.risk),
            StatKey::AvgRr => StatValue::Value(self.avg_rr),
            StatKey::BestTrade => StatValue::Value(self.best_trade),
            StatKey::WorstTrade => StatValue::Value(self.worst_trade),
            StatKey::MaxDrawdown => StatValue::Value(self.max_drawdown),
            StatKey::Expectancy => StatValue::Value(self.expectancy),
            StatKey::MinDurationMins => StatValue::Value(self.min_duration_mins),
            StatKey::MaxDurationMins => StatValue::Value(self.max_duration_mins),
            StatKey::MaxConsecutiveLosses => StatValue::Count(self.max_consecutive_losses),
        }
    }

    /// The ordered `(key, value)` mapping.
    pub fn entries(&self) -> Vec<(StatKey, StatValue)> {
        StatKey::ALL.iter().map(|&key| (key, self.get(key))).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::from("# Trading Performance Summary\n\n");
        out.push_str("| Statistic | Value |\n");
        out.push_str("|-----------|-------|\n");
        for (key, value) in self.entries() {
            let _ = writeln!(out, "| {} | {} |", key.label(), format_value(key, value));
        }
        out
    }
}

impl Serialize for StatsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries = self.entries();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in &entries {
            map.serialize_entry(key.label(), value)?;
        }
        map.end()
    }
}
