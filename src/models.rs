use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Debtor table
// ============================================================================

/// Economic sector of a debtor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "Agronegócio")]
    Agribusiness,
    #[serde(rename = "Comércio")]
    Retail,
    #[serde(rename = "Indústria")]
    Industry,
    #[serde(rename = "Serviços")]
    Services,
    #[serde(rename = "Construção")]
    Construction,
    #[serde(rename = "Tecnologia")]
    Technology,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Agribusiness,
        Sector::Retail,
        Sector::Industry,
        Sector::Services,
        Sector::Construction,
        Sector::Technology,
    ];

    /// Label used in spreadsheets, reports and JSON.
    pub fn label(&self) -> &'static str {
        match self {
            Sector::Agribusiness => "Agronegócio",
            Sector::Retail => "Comércio",
            Sector::Industry => "Indústria",
            Sector::Services => "Serviços",
            Sector::Construction => "Construção",
            Sector::Technology => "Tecnologia",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Sector::ALL
            .into_iter()
            .find(|sector| sector.label().to_lowercase() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown sector '{}'", s))
    }
}

/// Credit rating on the CMN Resolution 2682 scale.
///
/// Variants are declared best to worst, so `Rating::AA < Rating::H` and a
/// move to a greater rating is a downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    AA,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl Rating {
    pub const ALL: [Rating; 9] = [
        Rating::AA,
        Rating::A,
        Rating::B,
        Rating::C,
        Rating::D,
        Rating::E,
        Rating::F,
        Rating::G,
        Rating::H,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rating::AA => "AA",
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
            Rating::F => "F",
            Rating::G => "G",
            Rating::H => "H",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rating {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Rating::ALL
            .into_iter()
            .find(|rating| rating.label() == wanted)
            .ok_or_else(|| anyhow::anyhow!("Unknown rating '{}'", s))
    }
}

/// One row of the debtor table.
///
/// `tax_id` is kept in display form (`XX.XXX.XXX/XXXX-XX`). Derogatory flags
/// are 0/1 markers as they appear in the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtorRecord {
    pub legal_name: String,
    pub tax_id: String,
    pub sector: Sector,
    pub initial_rating: Rating,
    pub current_rating: Rating,
    pub credit_limit: BigDecimal,
    pub current_exposure: BigDecimal,
    pub utilization_pct: BigDecimal,
    pub days_past_due: u32,
    pub credit_score: u16,
    pub has_protests: u8,
    pub has_lawsuits: u8,
    pub has_bureau_restriction: u8,
}

impl DebtorRecord {
    /// Exposure as a percentage of the limit, rounded to two places.
    ///
    /// A zero limit yields zero rather than dividing. Values above 100 are
    /// legitimate (exposure may exceed the limit).
    pub fn utilization_for(credit_limit: &BigDecimal, current_exposure: &BigDecimal) -> BigDecimal {
        if credit_limit.is_zero() {
            return BigDecimal::zero();
        }
        (current_exposure * BigDecimal::from(100) / credit_limit).round(2)
    }
}

// ============================================================================
// Request payloads
// ============================================================================

/// Body of `POST /api/v1/sessions/:id/debtors`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDebtorRequest {
    pub legal_name: String,
    pub tax_id: String,
    pub sector: Sector,
    pub initial_rating: Rating,
    pub current_rating: Rating,
    pub credit_limit: BigDecimal,
    pub current_exposure: BigDecimal,
    /// Derived from limit and exposure when omitted.
    #[serde(default)]
    pub utilization_pct: Option<BigDecimal>,
    #[serde(default)]
    pub days_past_due: u32,
    pub credit_score: u16,
    #[serde(default)]
    pub has_protests: u8,
    #[serde(default)]
    pub has_lawsuits: u8,
    #[serde(default)]
    pub has_bureau_restriction: u8,
}

impl NewDebtorRequest {
    /// Builds the table row. The tax ID is copied verbatim; formatting happens
    /// after validation.
    pub fn into_record(self) -> DebtorRecord {
        let utilization_pct = self.utilization_pct.unwrap_or_else(|| {
            DebtorRecord::utilization_for(&self.credit_limit, &self.current_exposure)
        });

        DebtorRecord {
            legal_name: self.legal_name.trim().to_string(),
            tax_id: self.tax_id,
            sector: self.sector,
            initial_rating: self.initial_rating,
            current_rating: self.current_rating,
            credit_limit: self.credit_limit,
            current_exposure: self.current_exposure,
            utilization_pct,
            days_past_due: self.days_past_due,
            credit_score: self.credit_score,
            has_protests: self.has_protests,
            has_lawsuits: self.has_lawsuits,
            has_bureau_restriction: self.has_bureau_restriction,
        }
    }
}

/// Body of `POST /api/v1/sessions/:id/demo`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoRequest {
    pub seed: Option<u64>,
    pub rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TaxIdQueryParams {
    pub value: String,
}

/// Query of `GET /api/v1/sessions/:id/charts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQueryParams {
    pub bins: Option<usize>,
    pub top: Option<usize>,
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreatedResponse {
    pub session_id: Uuid,
    pub expires_in_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TableLoadedResponse {
    pub session_id: Uuid,
    pub source: String,
    pub rows_loaded: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebtorListResponse {
    pub session_id: Uuid,
    pub count: usize,
    pub debtors: Vec<DebtorRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DebtorAppendedResponse {
    pub session_id: Uuid,
    pub row_index: usize,
    pub count: usize,
    pub debtor: DebtorRecord,
}

/// Metrics already formatted for display (pt-BR separators).
#[derive(Debug, Serialize, Deserialize)]
pub struct FormattedMetrics {
    pub total_volume: String,
    pub delinquency_pct: String,
    pub concentration_pct: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub session_id: Uuid,
    pub debtors: usize,
    pub total_volume: BigDecimal,
    pub delinquency_pct: BigDecimal,
    pub concentration_pct: BigDecimal,
    pub formatted: FormattedMetrics,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChartsResponse {
    pub session_id: Uuid,
    pub debtors: usize,
    #[serde(flatten)]
    pub charts: crate::charts::ChartData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaxIdValidationResponse {
    pub valid: bool,
    pub normalized: String,
    pub formatted: Option<String>,
}
