use crate::br_format::{format_brl, format_pct};
use crate::models::{DebtorRecord, FormattedMetrics};
use bigdecimal::{BigDecimal, Zero};

/// Debtors strictly above this many days past due are delinquent.
pub const DELINQUENCY_THRESHOLD_DAYS: u32 = 30;

/// Aggregate risk metrics over a debtor table.
///
/// Values are unrounded; see [`PortfolioMetrics::formatted`] for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioMetrics {
    /// Sum of current exposure.
    pub total_volume: BigDecimal,
    /// Share of exposure held by debtors more than 30 days past due, in percent.
    pub delinquency_pct: BigDecimal,
    /// Share of exposure held by the single largest debtor, in percent.
    pub concentration_pct: BigDecimal,
}

impl PortfolioMetrics {
    pub fn zero() -> Self {
        Self {
            total_volume: BigDecimal::zero(),
            delinquency_pct: BigDecimal::zero(),
            concentration_pct: BigDecimal::zero(),
        }
    }

    pub fn formatted(&self) -> FormattedMetrics {
        FormattedMetrics {
            total_volume: format_brl(&self.total_volume),
            delinquency_pct: format_pct(&self.delinquency_pct),
            concentration_pct: format_pct(&self.concentration_pct),
        }
    }
}

impl From<PortfolioMetrics> for (BigDecimal, BigDecimal, BigDecimal) {
    fn from(m: PortfolioMetrics) -> Self {
        (m.total_volume, m.delinquency_pct, m.concentration_pct)
    }
}

pub fn is_delinquent(record: &DebtorRecord) -> bool {
    record.days_past_due > DELINQUENCY_THRESHOLD_DAYS
}

/// Computes total volume, delinquency and concentration.
///
/// An empty table, or one whose exposures sum to zero, yields all zeros.
/// Negative or otherwise odd exposures are not rejected here.
pub fn compute_metrics(rows: &[DebtorRecord]) -> PortfolioMetrics {
    if rows.is_empty() {
        return PortfolioMetrics::zero();
    }

    let total_volume = rows
        .iter()
        .fold(BigDecimal::zero(), |acc, r| acc + &r.current_exposure);

    if total_volume.is_zero() {
        return PortfolioMetrics {
            total_volume,
            ..PortfolioMetrics::zero()
        };
    }

    let delinquent_volume = rows
        .iter()
        .filter(|r| is_delinquent(r))
        .fold(BigDecimal::zero(), |acc, r| acc + &r.current_exposure);

    let largest = rows
        .iter()
        .map(|r| &r.current_exposure)
        .max()
        .cloned()
        .unwrap_or_else(BigDecimal::zero);

    let hundred = BigDecimal::from(100);
    let delinquency_pct = delinquent_volume * &hundred / &total_volume;
    let concentration_pct = largest * &hundred / &total_volume;

    PortfolioMetrics {
        total_volume,
        delinquency_pct,
        concentration_pct,
    }
}
