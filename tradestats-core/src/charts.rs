//! Chart datasets: the numbers each exploratory chart is drawn from.
//!
//! Rendering lives outside this crate. These builders turn a validated table
//! into plain serializable series: the P/L curve, outcomes per weekday, P/L
//! spread per weekday and outcome, the P/L histogram, risk-vs-reward points
//! and an R/R heatmap by entry hour.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::cleaning::{CleanOptions, CleanedSeries};
use crate::table::{Outcome, ValidatedTrades};

/// Bins used for the P/L distribution.
pub const PL_HISTOGRAM_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub trade: usize,
    pub cumulative_pl: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayOutcomes {
    pub weekday: String,
    pub wins: usize,
    pub losses: usize,
    pub breakevens: usize,
}

/// Five-number summary of one box in a box plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// P/L values of one (weekday, outcome) group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPl {
    pub weekday: String,
    pub outcome: Outcome,
    pub values: Vec<f64>,
    pub stats: BoxStats,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Histogram {
    /// `counts.len() + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardPoint {
    pub risk: f64,
    pub pl: f64,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub entry_hour: u32,
    pub weekday: String,
    pub total_rr: f64,
}

/// All chart datasets for one table snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub pl_curve: Vec<CurvePoint>,
    pub outcome_by_weekday: Vec<WeekdayOutcomes>,
    pub pl_by_weekday: Vec<WeekdayPl>,
    pub pl_distribution: Histogram,
    pub risk_vs_reward: Vec<RiskRewardPoint>,
    pub rr_heatmap: Vec<HeatmapCell>,
}

impl ChartData {
    pub fn from_trades(trades: &ValidatedTrades<'_>, opts: CleanOptions) -> Self {
        let pl = trades.cleaned("pl_by_percentage", opts);
        let risk = trades.cleaned("risk_by_percentage", opts);
        let rr = trades.cleaned("pl_by_rr", opts.as_lenient());
        let outcomes = trades.outcomes();
        let dates = trades.dates();

        Self {
            pl_curve: pl_curve(&pl),
            outcome_by_weekday: outcome_by_weekday(&dates, &outcomes),
            pl_by_weekday: pl_by_weekday(&dates, &outcomes, &pl),
            pl_distribution: histogram(&pl.valid(), PL_HISTOGRAM_BINS),
            risk_vs_reward: risk_vs_reward(&risk, &pl, &outcomes),
            rr_heatmap: rr_heatmap(&trades.times("entry_time"), &dates, &rr),
        }
    }
}

/// Running sum of P/L, one point per trade. Missing values add nothing.
pub fn pl_curve(pl: &CleanedSeries) -> Vec<CurvePoint> {
    let mut running = 0.0;
    pl.as_slice()
        .iter()
        .enumerate()
        .map(|(trade, value)| {
            running += value.unwrap_or(0.0);
            CurvePoint {
                trade,
                cumulative_pl: running,
            }
        })
        .collect()
}

/// Outcome counts for every day of the week, Monday first.
pub fn outcome_by_weekday(
    dates: &[Option<NaiveDate>],
    outcomes: &[Option<Outcome>],
) -> Vec<WeekdayOutcomes> {
    let mut days: Vec<WeekdayOutcomes> = WEEK
        .iter()
        .map(|day| WeekdayOutcomes {
            weekday: weekday_name(*day).to_string(),
            wins: 0,
            losses: 0,
            breakevens: 0,
        })
        .collect();

    for (date, outcome) in dates.iter().zip(outcomes) {
        let (Some(date), Some(outcome)) = (date, outcome) else {
            continue;
        };
        let slot = &mut days[date.weekday().num_days_from_monday() as usize];
        match outcome {
            Outcome::Win => slot.wins += 1,
            Outcome::Loss => slot.losses += 1,
            Outcome::Breakeven => slot.breakevens += 1,
        }
    }
    days
}

/// P/L grouped by weekday and outcome, Monday first and `WIN`, `LOSS`, `BE`
/// within a day. Rows missing a date, a label or a P/L value are skipped, and
/// empty groups are left out.
pub fn pl_by_weekday(
    dates: &[Option<NaiveDate>],
    outcomes: &[Option<Outcome>],
    pl: &CleanedSeries,
) -> Vec<WeekdayPl> {
    let mut groups: BTreeMap<(u32, usize), Vec<f64>> = BTreeMap::new();
    for (i, (date, outcome)) in dates.iter().zip(outcomes).enumerate() {
        let (Some(date), Some(outcome), Some(value)) = (date, outcome, pl.get(i)) else {
            continue;
        };
        let key = (date.weekday().num_days_from_monday(), outcome_rank(*outcome));
        groups.entry(key).or_default().push(value);
    }

    groups
        .into_iter()
        .filter_map(|((day, rank), mut values)| {
            let stats = box_stats(&mut values)?;
            Some(WeekdayPl {
                weekday: weekday_name(WEEK[day as usize]).to_string(),
                outcome: OUTCOMES[rank],
                values,
                stats,
            })
        })
        .collect()
}

/// Min, quartiles and max with linear interpolation between ranks. Sorts
/// `values` in place; `None` when empty.
pub fn box_stats(values: &mut [f64]) -> Option<BoxStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(BoxStats {
        min: values[0],
        q1: quantile(values, 0.25),
        median: quantile(values, 0.5),
        q3: quantile(values, 0.75),
        max: values[values.len() - 1],
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

const OUTCOMES: [Outcome; 3] = [Outcome::Win, Outcome::Loss, Outcome::Breakeven];

fn outcome_rank(outcome: Outcome) -> usize {
    match outcome {
        Outcome::Win => 0,
        Outcome::Loss => 1,
        Outcome::Breakeven => 2,
    }
}

/// Equal-width histogram. A constant series gets a unit-wide range around
/// its value; an empty one gets no bins.
pub fn histogram(values: &[f64], bins: usize) -> Histogram {
    if values.is_empty() || bins == 0 {
        return Histogram::default();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

    let mut counts = vec![0usize; bins];
    for v in values {
        // Right edge is inclusive for the last bin.
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Histogram { edges, counts }
}

/// `(risk, pl, outcome)` for every row where both numbers are present.
pub fn risk_vs_reward(
    risk: &CleanedSeries,
    pl: &CleanedSeries,
    outcomes: &[Option<Outcome>],
) -> Vec<RiskRewardPoint> {
    (0..risk.len().min(pl.len()))
        .filter_map(|i| {
            Some(RiskRewardPoint {
                risk: risk.get(i)?,
                pl: pl.get(i)?,
                outcome: outcomes.get(i).copied().flatten(),
            })
        })
        .collect()
}

/// Sum of R/R per (entry hour, weekday). Rows without a parseable time or
/// date are skipped.
pub fn rr_heatmap(
    entry_times: &[Option<NaiveTime>],
    dates: &[Option<NaiveDate>],
    rr: &CleanedSeries,
) -> Vec<HeatmapCell> {
    let mut cells: BTreeMap<(u32, u32), f64> = BTreeMap::new();
    for (i, (time, date)) in entry_times.iter().zip(dates).enumerate() {
        let (Some(time), Some(date), Some(value)) = (time, date, rr.get(i)) else {
            continue;
        };
        let key = (time.hour(), date.weekday().num_days_from_monday());
        *cells.entry(key).or_insert(0.0) += value;
    }
    cells
        .into_iter()
        .map(|((entry_hour, day), total_rr)| HeatmapCell {
            entry_hour,
            weekday: weekday_name(WEEK[day as usize]).to_string(),
            total_rr,
        })
        .collect()
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
