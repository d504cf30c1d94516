use crate::br_format::{format_brl, format_decimal, format_pct};
use crate::ingest::{COLUMNS, DELIMITER, UTF8_BOM};
use crate::metrics::PortfolioMetrics;
use crate::models::DebtorRecord;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use sha2::{Digest, Sha256};

pub const REPORT_TITLE: &str = "Relatório de Crédito";
pub const PAGE_BREAK: char = '\u{000C}';

pub const SPREADSHEET_FILE_NAME: &str = "relatorio_credito.csv";
pub const REPORT_FILE_NAME: &str = "relatorio_credito.txt";

fn row_values(r: &DebtorRecord) -> [String; 13] {
    [
        r.legal_name.clone(),
        r.tax_id.clone(),
        r.sector.label().to_string(),
        r.initial_rating.label().to_string(),
        r.current_rating.label().to_string(),
        format_decimal(&r.credit_limit, 2),
        format_decimal(&r.current_exposure, 2),
        format_decimal(&r.utilization_pct, 2),
        r.days_past_due.to_string(),
        r.credit_score.to_string(),
        r.has_protests.to_string(),
        r.has_lawsuits.to_string(),
        r.has_bureau_restriction.to_string(),
    ]
}

/// Serializes the table as `;`-delimited CSV behind a UTF-8 BOM, with the
/// same headers and number format ingestion accepts.
pub fn to_spreadsheet(rows: &[DebtorRecord]) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .delimiter(DELIMITER)
        .from_writer(UTF8_BOM.to_vec());

    wtr.write_record(COLUMNS)?;
    for r in rows {
        wtr.write_record(row_values(r))?;
    }

    wtr.into_inner()
        .map_err(|e| anyhow!("Failed to flush spreadsheet: {}", e.error()))
}

/// One report line: `Razão Social: Alfa | CNPJ: 11.222.333/0001-81 | ...`.
pub fn report_line(r: &DebtorRecord) -> String {
    COLUMNS
        .iter()
        .zip(row_values(r))
        .map(|(col, value)| format!("{}: {}", col, value))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Renders the paginated text report.
///
/// Pages are separated by a form feed. Each page repeats the title and
/// generation time and ends with a "Página X de Y" footer. `lines_per_page`
/// counts body lines only and is clamped to at least 1.
pub fn render_report(
    rows: &[DebtorRecord],
    metrics: &PortfolioMetrics,
    generated_at: DateTime<Utc>,
    lines_per_page: usize,
) -> String {
    let mut body = vec![
        format!("Total de Crédito: {}", format_brl(&metrics.total_volume)),
        format!("Inadimplência (> 30 dias): {}", format_pct(&metrics.delinquency_pct)),
        format!(
            "Concentração (maior devedor): {}",
            format_pct(&metrics.concentration_pct)
        ),
        format!("Devedores: {}", rows.len()),
        String::new(),
    ];

    if rows.is_empty() {
        body.push("Nenhum devedor carregado.".to_string());
    } else {
        body.extend(rows.iter().map(report_line));
    }

    let lines_per_page = lines_per_page.max(1);
    let pages: Vec<&[String]> = body.chunks(lines_per_page).collect();
    let total_pages = pages.len();
    let stamp = generated_at.format("%d/%m/%Y %H:%M:%S UTC");

    pages
        .iter()
        .enumerate()
        .map(|(i, lines)| {
            let mut page = format!("{}\nGerado em {}\n\n", REPORT_TITLE, stamp);
            for line in lines.iter() {
                page.push_str(line);
                page.push('\n');
            }
            page.push_str(&format!("\nPágina {} de {}\n", i + 1, total_pages));
            page
        })
        .collect::<Vec<_>>()
        .join(&PAGE_BREAK.to_string())
}

/// Hex SHA-256 of an export body, sent as `x-content-sha256`.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
