use crate::models::{DebtorRecord, Rating, Sector};
use crate::tax_id::{check_digits, format_tax_id};
use bigdecimal::BigDecimal;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

pub const DEFAULT_DEMO_SEED: u64 = 42;
pub const DEFAULT_DEMO_ROWS: usize = 50;

const NAME_PREFIXES: [&str; 12] = [
    "Alfa", "Beta", "Horizonte", "Nova Era", "Pioneira", "Cerrado", "Litoral", "Atlântica",
    "Serra Verde", "Vale do Sul", "Progresso", "Aurora",
];

const NAME_CORES: [&str; 10] = [
    "Comércio", "Distribuidora", "Engenharia", "Alimentos", "Logística", "Agropecuária",
    "Sistemas", "Metalúrgica", "Têxtil", "Serviços",
];

const NAME_SUFFIXES: [&str; 3] = ["Ltda", "S.A.", "EIRELI"];

/// Seeded synthetic debtor table. The same `(seed, rows)` pair always yields
/// the same rows, and every CNPJ carries correct check digits.
pub struct DemoPortfolio {
    rng: StdRng,
}

impl DemoPortfolio {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Shorthand for `DemoPortfolio::new(seed).rows(rows)`.
    pub fn generate(seed: u64, rows: usize) -> Vec<DebtorRecord> {
        Self::new(seed).rows(rows)
    }

    pub fn rows(&mut self, count: usize) -> Vec<DebtorRecord> {
        (0..count).map(|_| self.next_record()).collect()
    }

    fn next_record(&mut self) -> DebtorRecord {
        let legal_name = format!(
            "{} {} {}",
            self.pick(&NAME_PREFIXES),
            self.pick(&NAME_CORES),
            self.pick(&NAME_SUFFIXES)
        );
        let tax_id = self.next_tax_id();
        let sector = *Sector::ALL.choose(&mut self.rng).unwrap_or(&Sector::Services);

        let initial_idx = self.rng.random_range(0..Rating::ALL.len() - 2);
        // Mostly stable ratings, occasionally a notch or two either way
        let drift: i64 = match self.rng.random_range(0..10) {
            0 => -1,
            1..=6 => 0,
            7 | 8 => 1,
            _ => 2,
        };
        let current_idx = (initial_idx as i64 + drift).clamp(0, Rating::ALL.len() as i64 - 1) as usize;

        let limit_cents: i64 = self.rng.random_range(50_000i64..5_000_000) * 100;
        let utilization_bp: i64 = self.rng.random_range(0i64..=15_000);
        let exposure_cents = limit_cents * utilization_bp / 10_000;

        let credit_limit = BigDecimal::from(limit_cents) / BigDecimal::from(100);
        let current_exposure = BigDecimal::from(exposure_cents) / BigDecimal::from(100);
        let utilization_pct = DebtorRecord::utilization_for(&credit_limit, &current_exposure);

        let days_past_due = if self.rng.random_bool(0.2) {
            self.rng.random_range(31..=180)
        } else {
            self.rng.random_range(0..=30)
        };

        DebtorRecord {
            legal_name,
            tax_id,
            sector,
            initial_rating: Rating::ALL[initial_idx],
            current_rating: Rating::ALL[current_idx],
            credit_limit,
            current_exposure,
            utilization_pct,
            days_past_due,
            credit_score: self.rng.random_range(0..=1000),
            has_protests: self.flag(0.1),
            has_lawsuits: self.flag(0.05),
            has_bureau_restriction: self.flag(0.15),
        }
    }

    /// Random 8-digit root, branch 0001, computed verification digits.
    fn next_tax_id(&mut self) -> String {
        let mut base: Vec<u32> = (0..8).map(|_| self.rng.random_range(0..10)).collect();
        if base.iter().all(|&d| d == base[0]) {
            base[7] = (base[0] + 1) % 10;
        }
        base.extend_from_slice(&[0, 0, 0, 1]);

        let (first, second) = check_digits(&base);
        let digits: String = base
            .iter()
            .chain([first, second].iter())
            .map(|d| char::from_digit(*d, 10).unwrap_or('0'))
            .collect();

        format_tax_id(&digits).unwrap_or(digits)
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn flag(&mut self, probability: f64) -> u8 {
        u8::from(self.rng.random_bool(probability))
    }
}
