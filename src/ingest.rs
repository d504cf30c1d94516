use crate::br_format::{parse_decimal, parse_integer};
use crate::models::{DebtorRecord, Rating, Sector};
use crate::tax_id::{format_tax_id, validate_tax_id};
use anyhow::{anyhow, Result};
use csv::{ReaderBuilder, StringRecord};

pub const COL_LEGAL_NAME: &str = "Razão Social";
pub const COL_TAX_ID: &str = "CNPJ";
pub const COL_SECTOR: &str = "Setor";
pub const COL_INITIAL_RATING: &str = "Rating Inicial";
pub const COL_CURRENT_RATING: &str = "Rating Atual";
pub const COL_CREDIT_LIMIT: &str = "Limite de Crédito (R$)";
pub const COL_EXPOSURE: &str = "Exposição Atual (R$)";
pub const COL_UTILIZATION: &str = "Utilização (%)";
pub const COL_DAYS_PAST_DUE: &str = "Dias de Atraso";
pub const COL_CREDIT_SCORE: &str = "Score";
pub const COL_PROTESTS: &str = "Protestos";
pub const COL_LAWSUITS: &str = "Ações Judiciais";
pub const COL_BUREAU_RESTRICTION: &str = "Restrição Bureau";

/// Column order used by the spreadsheet export and expected by ingestion.
pub const COLUMNS: [&str; 13] = [
    COL_LEGAL_NAME,
    COL_TAX_ID,
    COL_SECTOR,
    COL_INITIAL_RATING,
    COL_CURRENT_RATING,
    COL_CREDIT_LIMIT,
    COL_EXPOSURE,
    COL_UTILIZATION,
    COL_DAYS_PAST_DUE,
    COL_CREDIT_SCORE,
    COL_PROTESTS,
    COL_LAWSUITS,
    COL_BUREAU_RESTRICTION,
];

pub const DELIMITER: u8 = b';';
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct DebtorSpreadsheetParser;

impl DebtorSpreadsheetParser {
    /// Parses an uploaded spreadsheet into debtor rows.
    ///
    /// Columns are matched by header name, so order does not matter.
    /// `Utilização (%)` may be absent or blank and is then derived from limit
    /// and exposure. Tax IDs with 14 digits are reformatted for display;
    /// checksum failures are logged but the row is kept as uploaded.
    pub fn parse(bytes: &[u8]) -> Result<Vec<DebtorRecord>> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let mut rdr = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers = rdr.headers()?.clone();
        let mut records = Vec::new();
        let mut invalid_tax_ids = 0usize;

        for (idx, result) in rdr.records().enumerate() {
            // +2: header line plus 1-based numbering
            let line = idx + 2;
            let record =
                result.map_err(|e| anyhow!("Error reading CSV record at line {}: {}", line, e))?;

            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            let debtor = Self::parse_record(&record, &headers, line)?;
            if !validate_tax_id(&debtor.tax_id) {
                invalid_tax_ids += 1;
            }
            records.push(debtor);
        }

        if invalid_tax_ids > 0 {
            tracing::warn!(
                "⚠️  Spreadsheet has {} row(s) with an invalid CNPJ checksum",
                invalid_tax_ids
            );
        }
        tracing::debug!("Parsed {} debtor rows from spreadsheet", records.len());

        Ok(records)
    }

    fn parse_record(record: &StringRecord, headers: &StringRecord, line: usize) -> Result<DebtorRecord> {
        let required = |name: &str| -> Result<&str> {
            Self::get_field(record, headers, name)
                .ok_or_else(|| anyhow!("Missing '{}' field in CSV record at line {}", name, line))
        };

        let legal_name = required(COL_LEGAL_NAME)?.to_string();
        if legal_name.is_empty() {
            return Err(anyhow!("Empty '{}' at line {}", COL_LEGAL_NAME, line));
        }

        let raw_tax_id = required(COL_TAX_ID)?;
        let tax_id = format_tax_id(raw_tax_id).unwrap_or_else(|| raw_tax_id.to_string());

        let sector: Sector = required(COL_SECTOR)?
            .parse()
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_SECTOR, line, e))?;
        let initial_rating: Rating = required(COL_INITIAL_RATING)?
            .parse()
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_INITIAL_RATING, line, e))?;
        let current_rating: Rating = required(COL_CURRENT_RATING)?
            .parse()
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_CURRENT_RATING, line, e))?;

        let credit_limit = parse_decimal(required(COL_CREDIT_LIMIT)?)
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_CREDIT_LIMIT, line, e))?;
        let current_exposure = parse_decimal(required(COL_EXPOSURE)?)
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_EXPOSURE, line, e))?;

        let utilization_pct = match Self::get_field(record, headers, COL_UTILIZATION) {
            Some(raw) if !raw.is_empty() => parse_decimal(raw.trim_end_matches('%'))
                .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_UTILIZATION, line, e))?,
            _ => DebtorRecord::utilization_for(&credit_limit, &current_exposure),
        };

        let days_past_due: u32 = parse_integer(required(COL_DAYS_PAST_DUE)?)
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_DAYS_PAST_DUE, line, e))?;
        let credit_score: u16 = parse_integer(required(COL_CREDIT_SCORE)?)
            .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", COL_CREDIT_SCORE, line, e))?;

        Ok(DebtorRecord {
            legal_name,
            tax_id,
            sector,
            initial_rating,
            current_rating,
            credit_limit,
            current_exposure,
            utilization_pct,
            days_past_due,
            credit_score,
            has_protests: Self::parse_flag(required(COL_PROTESTS)?, COL_PROTESTS, line)?,
            has_lawsuits: Self::parse_flag(required(COL_LAWSUITS)?, COL_LAWSUITS, line)?,
            has_bureau_restriction: Self::parse_flag(
                required(COL_BUREAU_RESTRICTION)?,
                COL_BUREAU_RESTRICTION,
                line,
            )?,
        })
    }

    fn parse_flag(raw: &str, column: &str, line: usize) -> Result<u8> {
        match raw {
            "0" => Ok(0),
            "1" => Ok(1),
            other => Err(anyhow!(
                "Error parsing '{}' at line {}: expected 0 or 1, got '{}'",
                column,
                line,
                other
            )),
        }
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header == name)
            .and_then(|pos| record.get(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    const HEADER: &str = "Razão Social;CNPJ;Setor;Rating Inicial;Rating Atual;Limite de Crédito (R$);Exposição Atual (R$);Utilização (%);Dias de Atraso;Score;Protestos;Ações Judiciais;Restrição Bureau";

    #[test]
    fn test_parse_valid_rows() {
        let csv = format!(
            "{}\n{}\n{}",
            HEADER,
            "Alfa Agro S.A.;11222333000181;Agronegócio;A;B;1.000.000,00;750.000,50;75,00;12;820;0;0;1",
            "Beta Serviços Ltda;12.345.678/0001-95;Serviços;AA;AA;200000;0;;0;910;0;0;0",
        );
        let rows = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].legal_name, "Alfa Agro S.A.");
        assert_eq!(rows[0].tax_id, "11.222.333/0001-81");
        assert_eq!(rows[0].sector, Sector::Agribusiness);
        assert_eq!(rows[0].current_rating, Rating::B);
        assert_eq!(rows[0].credit_limit, BigDecimal::from(1_000_000));
        assert_eq!(rows[0].current_exposure, BigDecimal::from_str("750000.50").unwrap());
        assert_eq!(rows[0].days_past_due, 12);
        assert_eq!(rows[0].has_bureau_restriction, 1);

        // blank utilization is derived
        assert_eq!(rows[1].utilization_pct, BigDecimal::from(0));
        assert_eq!(rows[1].tax_id, "12.345.678/0001-95");
    }

    #[test]
    fn test_dot_grouped_amounts_without_cents() {
        let csv = format!(
            "{}\n{}",
            HEADER, "Alfa;11222333000181;Indústria;B;B;R$ 2.500;1.500;;0;500;0;0;0"
        );
        let rows = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap();

        assert_eq!(rows[0].credit_limit, BigDecimal::from(2500));
        assert_eq!(rows[0].current_exposure, BigDecimal::from(1500));
        assert_eq!(rows[0].utilization_pct, BigDecimal::from(60));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let rows = DebtorSpreadsheetParser::parse(HEADER.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_bom_is_ignored() {
        let csv = format!(
            "\u{feff}{}\n{}",
            HEADER, "Alfa;11222333000181;Indústria;B;B;100;50;50;0;500;0;0;0"
        );
        let rows = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].legal_name, "Alfa");
    }

    #[test]
    fn test_columns_matched_by_name() {
        let csv = "\
CNPJ;Razão Social;Exposição Atual (R$);Limite de Crédito (R$);Setor;Rating Inicial;Rating Atual;Dias de Atraso;Score;Protestos;Ações Judiciais;Restrição Bureau
11222333000181;Gama;300;600;Tecnologia;C;D;45;410;1;1;0";
        let rows = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].legal_name, "Gama");
        assert_eq!(rows[0].current_exposure, BigDecimal::from(300));
        assert_eq!(rows[0].utilization_pct, BigDecimal::from(50));
    }

    #[test]
    fn test_missing_column_reports_name() {
        let csv = "\
Razão Social;CNPJ;Setor;Rating Inicial;Rating Atual;Limite de Crédito (R$);Exposição Atual (R$);Dias de Atraso;Score;Protestos;Ações Judiciais
Alfa;11222333000181;Indústria;B;B;100;50;0;500;0;0";
        let err = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Missing 'Restrição Bureau' field"));
    }

    #[test]
    fn test_bad_number_reports_column_and_line() {
        let csv = format!(
            "{}\n{}",
            HEADER, "Alfa;11222333000181;Indústria;B;B;abc;50;50;0;500;0;0;0"
        );
        let err = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap_err().to_string();
        assert!(err.contains("Error parsing 'Limite de Crédito (R$)' at line 2"));
        assert!(err.contains("Failed to parse decimal 'abc'"));
    }

    #[test]
    fn test_bad_flag_and_enum() {
        let bad_flag = format!(
            "{}\n{}",
            HEADER, "Alfa;11222333000181;Indústria;B;B;100;50;50;0;500;2;0;0"
        );
        assert!(DebtorSpreadsheetParser::parse(bad_flag.as_bytes())
            .unwrap_err()
            .to_string()
            .contains("expected 0 or 1"));

        let bad_sector = format!(
            "{}\n{}",
            HEADER, "Alfa;11222333000181;Mineração;B;B;100;50;50;0;500;0;0;0"
        );
        assert!(DebtorSpreadsheetParser::parse(bad_sector.as_bytes())
            .unwrap_err()
            .to_string()
            .contains("Unknown sector"));
    }

    #[test]
    fn test_invalid_cnpj_row_is_kept() {
        let csv = format!(
            "{}\n{}",
            HEADER, "Alfa;123;Indústria;B;B;100;50;50;0;500;0;0;0"
        );
        let rows = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].tax_id, "123");
    }

    #[test]
    fn test_ragged_row_is_error() {
        let csv = format!("{}\n{}", HEADER, "Alfa;11222333000181;Indústria");
        let err = DebtorSpreadsheetParser::parse(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
