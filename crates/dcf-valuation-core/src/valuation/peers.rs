use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Market multiples snapshot for one peer. A `None` field means the data
/// provider had no usable value for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub ticker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_to_earnings: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ev_to_ebitda: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_to_sales: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<Decimal>,
}

/// Raw floating-point quote as delivered by a market-data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerQuote {
    pub ticker: String,
    #[serde(default)]
    pub price_to_earnings: Option<f64>,
    #[serde(default)]
    pub ev_to_ebitda: Option<f64>,
    #[serde(default)]
    pub price_to_sales: Option<f64>,
    #[serde(default)]
    pub return_on_equity: Option<f64>,
}

impl PeerRecord {
    /// Convert a provider quote, treating NaN and infinities as missing.
    pub fn from_quote(quote: &PeerQuote) -> Self {
        PeerRecord {
            ticker: quote.ticker.clone(),
            price_to_earnings: finite(quote.price_to_earnings),
            ev_to_ebitda: finite(quote.ev_to_ebitda),
            price_to_sales: finite(quote.price_to_sales),
            return_on_equity: finite(quote.return_on_equity),
        }
    }

    pub fn get(&self, metric: PeerMetric) -> Option<Decimal> {
        match metric {
            PeerMetric::PriceToEarnings => self.price_to_earnings,
            PeerMetric::EvToEbitda => self.ev_to_ebitda,
            PeerMetric::PriceToSales => self.price_to_sales,
            PeerMetric::ReturnOnEquity => self.return_on_equity,
        }
    }

    fn slot(&mut self, metric: PeerMetric) -> &mut Option<Decimal> {
        match metric {
            PeerMetric::PriceToEarnings => &mut self.price_to_earnings,
            PeerMetric::EvToEbitda => &mut self.ev_to_ebitda,
            PeerMetric::PriceToSales => &mut self.price_to_sales,
            PeerMetric::ReturnOnEquity => &mut self.return_on_equity,
        }
    }
}

impl From<&PeerQuote> for PeerRecord {
    fn from(quote: &PeerQuote) -> Self {
        PeerRecord::from_quote(quote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeerMetric {
    PriceToEarnings,
    EvToEbitda,
    PriceToSales,
    ReturnOnEquity,
}

impl PeerMetric {
    pub const ALL: [PeerMetric; 4] = [
        PeerMetric::EvToEbitda,
        PeerMetric::PriceToEarnings,
        PeerMetric::PriceToSales,
        PeerMetric::ReturnOnEquity,
    ];
}

impl std::fmt::Display for PeerMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerMetric::PriceToEarnings => write!(f, "P/E"),
            PeerMetric::EvToEbitda => write!(f, "EV/EBITDA"),
            PeerMetric::PriceToSales => write!(f, "P/S"),
            PeerMetric::ReturnOnEquity => write!(f, "ROE"),
        }
    }
}

/// Descriptive statistics for one metric across the peers that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub metric: PeerMetric,
    pub mean: Decimal,
    pub median: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    /// Sample standard deviation; zero for a single observation
    pub std_dev: Decimal,
    pub count: usize,
    /// Tickers that had no usable value for this metric
    pub excluded: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSummaryStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_to_ebitda: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_earnings: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_sales: Option<MetricSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_on_equity: Option<MetricSummary>,
    pub peers_considered: usize,
    /// Tickers that contributed to no metric at all
    pub peers_without_usable_data: Vec<String>,
}

impl PeerSummaryStatistics {
    pub fn metric(&self, metric: PeerMetric) -> Option<&MetricSummary> {
        match metric {
            PeerMetric::PriceToEarnings => self.price_to_earnings.as_ref(),
            PeerMetric::EvToEbitda => self.ev_to_ebitda.as_ref(),
            PeerMetric::PriceToSales => self.price_to_sales.as_ref(),
            PeerMetric::ReturnOnEquity => self.return_on_equity.as_ref(),
        }
    }
}

/// Fallback multiples used when a provider returns nothing for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerDefaults {
    pub ev_to_ebitda: Multiple,
    pub price_to_earnings: Multiple,
    pub price_to_sales: Multiple,
    pub return_on_equity: Decimal,
}

impl Default for PeerDefaults {
    fn default() -> Self {
        PeerDefaults {
            ev_to_ebitda: dec!(20.0),
            price_to_earnings: dec!(30.0),
            price_to_sales: dec!(10.0),
            return_on_equity: dec!(0.25),
        }
    }
}

impl PeerDefaults {
    fn get(&self, metric: PeerMetric) -> Decimal {
        match metric {
            PeerMetric::PriceToEarnings => self.price_to_earnings,
            PeerMetric::EvToEbitda => self.ev_to_ebitda,
            PeerMetric::PriceToSales => self.price_to_sales,
            PeerMetric::ReturnOnEquity => self.return_on_equity,
        }
    }
}

/// Fundamentals of the company being valued, for implied values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetFundamentals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueBasis {
    EnterpriseValue,
    EquityValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedValue {
    pub metric: PeerMetric,
    pub basis: ValueBasis,
    pub target_metric_value: Money,
    pub implied_at_median: Money,
    pub implied_at_mean: Money,
    pub implied_at_low: Money,
    pub implied_at_high: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAnalysisInput {
    pub peers: Vec<PeerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetFundamentals>,
    /// When set, missing fields are filled from these before summarising
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<PeerDefaults>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAnalysisOutput {
    pub summary: PeerSummaryStatistics,
    pub implied_values: Vec<ImpliedValue>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Mean, median and range of each multiple across the peer set.
///
/// Missing values are excluded per field: a peer without a P/E still counts
/// towards EV/EBITDA, P/S and ROE, and is listed in the P/E `excluded` set.
/// A metric nobody reported is `None`. Fails only when no metric has any
/// usable value.
pub fn summarize(records: &[PeerRecord]) -> DcfResult<PeerSummaryStatistics> {
    if records.is_empty() {
        return Err(DcfError::InsufficientPeerData(
            "No peer records supplied".into(),
        ));
    }

    let summarize_metric = |metric: PeerMetric| -> DcfResult<Option<MetricSummary>> {
        let mut values = Vec::with_capacity(records.len());
        let mut excluded = Vec::new();
        for r in records {
            match r.get(metric) {
                Some(v) => values.push(v),
                None => excluded.push(r.ticker.clone()),
            }
        }
        compute_statistics(metric, values, excluded)
    };

    let ev_to_ebitda = summarize_metric(PeerMetric::EvToEbitda)?;
    let price_to_earnings = summarize_metric(PeerMetric::PriceToEarnings)?;
    let price_to_sales = summarize_metric(PeerMetric::PriceToSales)?;
    let return_on_equity = summarize_metric(PeerMetric::ReturnOnEquity)?;

    if ev_to_ebitda.is_none()
        && price_to_earnings.is_none()
        && price_to_sales.is_none()
        && return_on_equity.is_none()
    {
        return Err(DcfError::InsufficientPeerData(format!(
            "None of the {} peer records has a usable multiple",
            records.len()
        )));
    }

    let peers_without_usable_data = records
        .iter()
        .filter(|r| PeerMetric::ALL.iter().all(|m| r.get(*m).is_none()))
        .map(|r| r.ticker.clone())
        .collect();

    Ok(PeerSummaryStatistics {
        ev_to_ebitda,
        price_to_earnings,
        price_to_sales,
        return_on_equity,
        peers_considered: records.len(),
        peers_without_usable_data,
    })
}

/// Fill every missing field from `defaults`. Explicit and opt-in:
/// [`summarize`] never substitutes defaults on its own.
pub fn fill_missing(records: &[PeerRecord], defaults: &PeerDefaults) -> Vec<PeerRecord> {
    records
        .iter()
        .map(|r| {
            let mut filled = r.clone();
            for metric in PeerMetric::ALL {
                let slot = filled.slot(metric);
                if slot.is_none() {
                    *slot = Some(defaults.get(metric));
                }
            }
            filled
        })
        .collect()
}

/// Apply peer multiples to the target's fundamentals.
///
/// EV/EBITDA gives an enterprise value; P/E and P/S give equity values.
/// Metrics without a summary or without a positive target figure are skipped.
pub fn implied_values(
    summary: &PeerSummaryStatistics,
    target: &TargetFundamentals,
) -> DcfResult<Vec<ImpliedValue>> {
    let candidates = [
        (PeerMetric::EvToEbitda, target.ebitda, ValueBasis::EnterpriseValue),
        (PeerMetric::PriceToEarnings, target.net_income, ValueBasis::EquityValue),
        (PeerMetric::PriceToSales, target.revenue, ValueBasis::EquityValue),
    ];

    candidates
        .into_iter()
        .filter_map(|(metric, base, basis)| {
            let stats = summary.metric(metric)?;
            let base = base.filter(|v| *v > Decimal::ZERO)?;
            Some((metric, base, basis, stats))
        })
        .map(|(metric, base, basis, stats)| {
            let apply = |multiple: Multiple| {
                base.checked_mul(multiple).ok_or_else(|| {
                    DcfError::InsufficientPeerData(format!(
                        "{metric} of {multiple} applied to {base} is outside the decimal range"
                    ))
                })
            };
            Ok(ImpliedValue {
                metric,
                basis,
                target_metric_value: base,
                implied_at_median: apply(stats.median)?,
                implied_at_mean: apply(stats.mean)?,
                implied_at_low: apply(stats.low)?,
                implied_at_high: apply(stats.high)?,
            })
        })
        .collect()
}

/// Summarise the peer set and, when target fundamentals are supplied,
/// derive implied values; wrapped in the standard envelope.
pub fn run_peer_analysis(
    input: &PeerAnalysisInput,
) -> DcfResult<ComputationOutput<PeerAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let filled;
    let peers: &[PeerRecord] = match &input.defaults {
        Some(defaults) => {
            for r in &input.peers {
                let missing: Vec<String> = PeerMetric::ALL
                    .iter()
                    .filter(|m| r.get(**m).is_none())
                    .map(|m| m.to_string())
                    .collect();
                if !missing.is_empty() {
                    warnings.push(format!(
                        "{}: default value used for {}",
                        r.ticker,
                        missing.join(", ")
                    ));
                }
            }
            filled = fill_missing(&input.peers, defaults);
            &filled
        }
        None => &input.peers,
    };

    let summary = summarize(peers)?;

    for metric in PeerMetric::ALL {
        match summary.metric(metric) {
            Some(stats) if stats.count < 3 => warnings.push(format!(
                "Only {} peers reported {metric}; consider adding more for statistical significance",
                stats.count
            )),
            None => warnings.push(format!("No peer reported {metric}")),
            _ => {}
        }
    }

    let implied = match &input.target {
        Some(target) => {
            let values = implied_values(&summary, target)?;
            if values.is_empty() {
                warnings.push("Target fundamentals did not match any summarised multiple".into());
            }
            values
        }
        None => Vec::new(),
    };

    let output = PeerAnalysisOutput {
        summary,
        implied_values: implied,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Peer multiples summary (mean / median)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn finite(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}

fn compute_statistics(
    metric: PeerMetric,
    mut values: Vec<Decimal>,
    excluded: Vec<String>,
) -> DcfResult<Option<MetricSummary>> {
    if values.is_empty() {
        return Ok(None);
    }
    values.sort();

    let overflow = || {
        DcfError::InsufficientPeerData(format!(
            "{metric} values are too large to summarise in decimal range"
        ))
    };

    let count = values.len();
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(overflow)?;
    let mean = sum / Decimal::from(count);

    let median = if count % 2 == 0 {
        let mid = count / 2;
        values[mid - 1].checked_add(values[mid]).ok_or_else(overflow)? / dec!(2)
    } else {
        values[count / 2]
    };

    let std_dev = if count > 1 {
        let squared_deviations = values
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| {
                let d = v.checked_sub(mean)?;
                acc.checked_add(d.checked_mul(d)?)
            })
            .ok_or_else(overflow)?;
        let variance = squared_deviations / Decimal::from(count - 1);
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    Ok(Some(MetricSummary {
        metric,
        mean,
        median,
        low: values[0],
        high: values[count - 1],
        std_dev,
        count,
        excluded,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticker: &str, pe: Option<Decimal>, ev: Decimal, ps: Decimal) -> PeerRecord {
        PeerRecord {
            ticker: ticker.into(),
            price_to_earnings: pe,
            ev_to_ebitda: Some(ev),
            price_to_sales: Some(ps),
            return_on_equity: Some(dec!(0.30)),
        }
    }

    #[test]
    fn test_median_even_count() {
        let s = compute_statistics(
            PeerMetric::EvToEbitda,
            vec![dec!(18), dec!(10), dec!(14), dec!(12)],
            vec![],
        )
        .unwrap()
        .unwrap();
        assert_eq!(s.median, dec!(13));
        assert_eq!(s.mean, dec!(13.5));
        assert_eq!(s.low, dec!(10));
        assert_eq!(s.high, dec!(18));
    }

    #[test]
    fn test_single_observation_has_zero_std_dev() {
        let s = compute_statistics(PeerMetric::PriceToSales, vec![dec!(7)], vec![])
            .unwrap()
            .unwrap();
        assert_eq!(s.std_dev, Decimal::ZERO);
        assert_eq!(s.median, dec!(7));
    }

    #[test]
    fn test_std_dev_sample() {
        // values 2, 4, 4, 4, 5, 5, 7, 9: mean 5, sample variance 32/7
        let values = [2, 4, 4, 4, 5, 5, 7, 9].map(Decimal::from).to_vec();
        let s = compute_statistics(PeerMetric::EvToEbitda, values, vec![])
            .unwrap()
            .unwrap();
        assert_eq!(s.mean, dec!(5));
        let expected = (dec!(32) / dec!(7)).sqrt().unwrap();
        assert!((s.std_dev - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_from_quote_drops_non_finite() {
        let quote = PeerQuote {
            ticker: "KLAC".into(),
            price_to_earnings: Some(f64::NAN),
            ev_to_ebitda: Some(f64::INFINITY),
            price_to_sales: Some(9.5),
            return_on_equity: None,
        };
        let r = PeerRecord::from(&quote);
        assert!(r.price_to_earnings.is_none());
        assert!(r.ev_to_ebitda.is_none());
        assert_eq!(r.price_to_sales, Some(dec!(9.5)));
        assert!(r.return_on_equity.is_none());
    }

    #[test]
    fn test_fill_missing_only_touches_gaps() {
        let mut r = record("AMAT", None, dec!(15), dec!(5));
        r.return_on_equity = None;
        let filled = fill_missing(&[r], &PeerDefaults::default());
        assert_eq!(filled[0].price_to_earnings, Some(dec!(30)));
        assert_eq!(filled[0].return_on_equity, Some(dec!(0.25)));
        assert_eq!(filled[0].ev_to_ebitda, Some(dec!(15)));
    }

    #[test]
    fn test_implied_values_skip_missing_target_fields() {
        let peers = vec![
            record("A", Some(dec!(20)), dec!(10), dec!(4)),
            record("B", Some(dec!(30)), dec!(14), dec!(6)),
        ];
        let summary = summarize(&peers).unwrap();
        let target = TargetFundamentals {
            ebitda: Some(dec!(100)),
            net_income: None,
            revenue: Some(dec!(0)),
        };
        let implied = implied_values(&summary, &target).unwrap();
        assert_eq!(implied.len(), 1);
        assert_eq!(implied[0].metric, PeerMetric::EvToEbitda);
        assert_eq!(implied[0].basis, ValueBasis::EnterpriseValue);
        assert_eq!(implied[0].implied_at_median, dec!(1200));
        assert_eq!(implied[0].implied_at_low, dec!(1000));
    }

    #[test]
    fn test_run_with_defaults_warns_per_filled_peer() {
        let input = PeerAnalysisInput {
            peers: vec![
                record("A", None, dec!(10), dec!(4)),
                record("B", Some(dec!(25)), dec!(12), dec!(5)),
                record("C", Some(dec!(35)), dec!(14), dec!(6)),
            ],
            target: None,
            defaults: Some(PeerDefaults::default()),
        };
        let out = run_peer_analysis(&input).unwrap();
        let pe = out.result.summary.price_to_earnings.as_ref().unwrap();
        assert_eq!(pe.count, 3);
        assert_eq!(pe.mean, dec!(30));
        assert!(out.warnings.iter().any(|w| w.starts_with("A: default value used for P/E")));
    }

    #[test]
    fn test_few_peers_warning() {
        let input = PeerAnalysisInput {
            peers: vec![record("A", Some(dec!(20)), dec!(10), dec!(4))],
            target: None,
            defaults: None,
        };
        let out = run_peer_analysis(&input).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Only 1 peers reported")));
    }
}
