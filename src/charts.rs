use crate::models::{DebtorRecord, Rating, Sector};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_HISTOGRAM_BINS: usize = 20;
pub const DEFAULT_TOP_EXPOSURES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorExposure {
    pub sector: Sector,
    pub debtors: usize,
    pub exposure: BigDecimal,
    pub share_pct: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingCount {
    pub rating: Rating,
    pub debtors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingMigration {
    pub upgrades: usize,
    pub downgrades: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopExposure {
    pub legal_name: String,
    pub tax_id: String,
    pub exposure: BigDecimal,
}

/// Chart summaries, recomputed on every request.
///
/// Money stays in `BigDecimal`; histogram edges are `f64` since they only
/// drive plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub mean_exposure: BigDecimal,
    pub mean_credit_limit: BigDecimal,
    pub exposure_by_sector: Vec<SectorExposure>,
    pub rating_distribution: Vec<RatingCount>,
    pub rating_migration: RatingMigration,
    pub exposure_histogram: Vec<HistogramBin>,
    pub top_exposures: Vec<TopExposure>,
}

impl ChartData {
    pub fn build(rows: &[DebtorRecord], histogram_bins: usize, top_n: usize) -> Self {
        Self {
            mean_exposure: mean(rows.iter().map(|r| &r.current_exposure)),
            mean_credit_limit: mean(rows.iter().map(|r| &r.credit_limit)),
            exposure_by_sector: exposure_by_sector(rows),
            rating_distribution: rating_distribution(rows),
            rating_migration: rating_migration(rows),
            exposure_histogram: exposure_histogram(rows, histogram_bins),
            top_exposures: top_exposures(rows, top_n),
        }
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a BigDecimal>) -> BigDecimal {
    let (sum, count) = values.fold((BigDecimal::zero(), 0i64), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        BigDecimal::zero()
    } else {
        sum / BigDecimal::from(count)
    }
}

/// Exposure per sector present in the table, largest first.
pub fn exposure_by_sector(rows: &[DebtorRecord]) -> Vec<SectorExposure> {
    let mut buckets: HashMap<Sector, (usize, BigDecimal)> = HashMap::new();
    for r in rows {
        let entry = buckets.entry(r.sector).or_insert_with(|| (0, BigDecimal::zero()));
        entry.0 += 1;
        entry.1 += &r.current_exposure;
    }

    let total = buckets
        .values()
        .fold(BigDecimal::zero(), |acc, (_, exposure)| acc + exposure);

    let mut out: Vec<SectorExposure> = buckets
        .into_iter()
        .map(|(sector, (debtors, exposure))| {
            let share_pct = if total.is_zero() {
                BigDecimal::zero()
            } else {
                &exposure * BigDecimal::from(100) / &total
            };
            SectorExposure {
                sector,
                debtors,
                exposure,
                share_pct,
            }
        })
        .collect();

    out.sort_by(|a, b| b.exposure.cmp(&a.exposure).then(a.sector.cmp(&b.sector)));
    out
}

/// Debtor count for every rating on the scale, including empty ones.
pub fn rating_distribution(rows: &[DebtorRecord]) -> Vec<RatingCount> {
    Rating::ALL
        .iter()
        .map(|&rating| RatingCount {
            rating,
            debtors: rows.iter().filter(|r| r.current_rating == rating).count(),
        })
        .collect()
}

pub fn rating_migration(rows: &[DebtorRecord]) -> RatingMigration {
    rows.iter()
        .fold(RatingMigration::default(), |mut acc, r| {
            match r.current_rating.cmp(&r.initial_rating) {
                std::cmp::Ordering::Less => acc.upgrades += 1,
                std::cmp::Ordering::Greater => acc.downgrades += 1,
                std::cmp::Ordering::Equal => acc.unchanged += 1,
            }
            acc
        })
}

/// Equal-width histogram of current exposure.
///
/// The maximum lands in the last bin. When every exposure is the same the
/// result is a single bin holding all rows.
pub fn exposure_histogram(rows: &[DebtorRecord], bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.current_exposure.to_f64())
        .collect();

    if values.is_empty() {
        return Vec::new();
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if max <= min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let bins = bins.max(1);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

/// The `n` largest exposures, descending. Ties keep table order.
pub fn top_exposures(rows: &[DebtorRecord], n: usize) -> Vec<TopExposure> {
    let mut sorted: Vec<&DebtorRecord> = rows.iter().collect();
    sorted.sort_by(|a, b| b.current_exposure.cmp(&a.current_exposure));
    sorted
        .into_iter()
        .take(n)
        .map(|r| TopExposure {
            legal_name: r.legal_name.clone(),
            tax_id: r.tax_id.clone(),
            exposure: r.current_exposure.clone(),
        })
        .collect()
}
