// src/fields.rs
//
// The ~20 ePathway deployments all expose the same four facts about an
// application but agree on almost nothing about what to call the columns.
// The alias tables below are the accumulated census of headings seen in the
// wild, in precedence order; supporting a new deployment should only ever
// mean adding an alias, never code.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScrapeError};
use crate::table::TableRow;

pub static COUNCIL_REFERENCE_ALIASES: &[&str] =
    &["App No.", "Application Number", "Application number"];

pub static ADDRESS_ALIASES: &[&str] = &[
    "Location Address",
    "Property Address",
    "Site Location",
    "Application location",
    "Application Location",
    "Location",
    "Primary Property Address",
    "Site Address",
    // bare "Address" last: some sites pair it with a separate Suburb column
    "Address",
];

pub static DESCRIPTION_ALIASES: &[&str] = &[
    "Proposed Use or Development",
    "Description",
    "Application Proposal",
    "Proposal",
    "Application Description",
    "Application proposal",
];

pub static DATE_RECEIVED_ALIASES: &[&str] = &[
    "Date Lodged",
    "Date lodged",
    "Application Date",
    "Application date",
    "Lodgement Date",
    "Date received",
    "Date",
];

pub static SUBURB_ALIASES: &[&str] = &["Suburb"];

/// First-match lookup of a canonical field in a row: aliases are tried in
/// listed order, headings compare case-insensitively. An empty cell counts
/// as no match — thin listings render missing data as empty cells, and those
/// rows are exactly the ones that need the detail-page fallback. No match is
/// simply `None` at this layer; completeness is enforced when the record is
/// built.
pub fn resolve(row: &TableRow, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| row.get(alias).map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
}

/// Parse a `day/month/year` date as every ePathway deployment renders it and
/// normalise to an ISO calendar date. A value that matched a date alias but
/// doesn't parse means we're misreading the site, which must stop the run.
pub fn parse_received_date(value: &str) -> Result<String> {
    NaiveDate::parse_from_str(value.trim(), "%d/%m/%Y")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| ScrapeError::DateFormat {
            value: value.to_string(),
        })
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w.eq_ignore_ascii_case(word))
}

/// Append the jurisdiction code to an address that doesn't already carry it.
/// Idempotent: an address ending in (or containing) the code is unchanged.
pub fn append_state(address: &str, state: &str) -> String {
    if state.is_empty() || contains_word(address, state) {
        address.to_string()
    } else {
        format!("{}, {}", address, state)
    }
}

/// Best-effort heuristic: 3+ comma-separated segments usually means the
/// first segment is a building name rather than a street address, so drop
/// it. Deliberately unvalidated; the rule is preserved exactly as observed.
pub fn strip_building_name(address: &str) -> String {
    let segments: Vec<&str> = address.split(',').map(str::trim).collect();
    if segments.len() >= 3 {
        segments[1..].join(", ")
    } else {
        address.to_string()
    }
}

/// Canonical intermediate record, produced from an index row or a detail
/// page. Nothing here is required yet; the merge and the final completeness
/// check happen in the index scraper.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub council_reference: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub date_received: Option<String>,
    pub detail_url: Option<Url>,
    pub on_notice_from: Option<String>,
    pub on_notice_to: Option<String>,
}

impl ExtractedFields {
    pub fn is_complete(&self) -> bool {
        self.council_reference.is_some()
            && self.address.is_some()
            && self.description.is_some()
            && self.date_received.is_some()
    }

    /// Names of the required fields still missing, for error reporting.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.council_reference.is_none() {
            missing.push("council_reference");
        }
        if self.address.is_none() {
            missing.push("address");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        if self.date_received.is_none() {
            missing.push("date_received");
        }
        missing
    }

    /// Merge detail-page output over index-derived fields; detail values win
    /// wherever both exist.
    pub fn merged_with(self, detail: ExtractedFields) -> ExtractedFields {
        ExtractedFields {
            council_reference: detail.council_reference.or(self.council_reference),
            address: detail.address.or(self.address),
            description: detail.description.or(self.description),
            date_received: detail.date_received.or(self.date_received),
            detail_url: self.detail_url,
            on_notice_from: detail.on_notice_from.or(self.on_notice_from),
            on_notice_to: detail.on_notice_to.or(self.on_notice_to),
        }
    }
}

/// Resolve the canonical fields of one index row. `state` is the
/// jurisdiction code used when an address has to be assembled from separate
/// Address and Suburb columns.
pub fn extract_index_fields(row: &TableRow, state: &str) -> Result<ExtractedFields> {
    let mut address = resolve(row, ADDRESS_ALIASES);
    if let Some(suburb) = resolve(row, SUBURB_ALIASES) {
        if let Some(addr) = address.take() {
            address = if addr.to_ascii_lowercase().contains(&suburb.to_ascii_lowercase()) {
                Some(addr)
            } else {
                Some(append_state(&format!("{}, {}", addr, suburb), state))
            };
        }
    }

    let date_received = match resolve(row, DATE_RECEIVED_ALIASES) {
        Some(value) => Some(parse_received_date(&value)?),
        None => None,
    };

    Ok(ExtractedFields {
        council_reference: resolve(row, COUNCIL_REFERENCE_ALIASES),
        address,
        description: resolve(row, DESCRIPTION_ALIASES),
        date_received,
        detail_url: row.detail_url.clone(),
        on_notice_from: None,
        on_notice_to: None,
    })
}

/// The final output unit handed to the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub council_reference: String,
    pub address: String,
    pub description: String,
    pub info_url: String,
    pub date_scraped: String,
    pub date_received: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_notice_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_notice_to: Option<String>,
}

impl Record {
    /// Build a record, failing loudly if any required field is still absent
    /// after all fallbacks.
    pub fn from_fields(fields: ExtractedFields, info_url: &Url, date_scraped: NaiveDate) -> Result<Record> {
        let missing = fields.missing();
        if !missing.is_empty() {
            return Err(ScrapeError::IncompleteRecord(missing.join(", ")));
        }
        Ok(Record {
            council_reference: fields.council_reference.unwrap_or_default(),
            address: fields.address.unwrap_or_default(),
            description: fields.description.unwrap_or_default(),
            info_url: info_url.to_string(),
            date_scraped: date_scraped.format("%Y-%m-%d").to_string(),
            date_received: fields.date_received.unwrap_or_default(),
            on_notice_from: fields.on_notice_from,
            on_notice_to: fields.on_notice_to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_all_four_fields_when_aliases_match() {
        let row = TableRow::from_pairs(&[
            ("App No.", "PLN-1"),
            ("Site Location", "1 Main St"),
            ("Proposal", "Carport"),
            ("Date Lodged", "14/05/2019"),
        ]);
        let fields = extract_index_fields(&row, "VIC").unwrap();
        assert_eq!(fields.council_reference.as_deref(), Some("PLN-1"));
        assert_eq!(fields.address.as_deref(), Some("1 Main St"));
        assert_eq!(fields.description.as_deref(), Some("Carport"));
        assert_eq!(fields.date_received.as_deref(), Some("2019-05-14"));
        assert!(fields.is_complete());
    }

    #[test]
    fn earlier_alias_wins_regardless_of_column_order() {
        let row = TableRow::from_pairs(&[
            ("Description", "from Description"),
            ("Proposed Use or Development", "from Proposed Use"),
        ]);
        assert_eq!(
            resolve(&row, DESCRIPTION_ALIASES).as_deref(),
            Some("from Proposed Use")
        );
    }

    #[test]
    fn alias_matching_is_case_insensitive() {
        let row = TableRow::from_pairs(&[("APPLICATION NUMBER", "PLN-9")]);
        assert_eq!(
            resolve(&row, COUNCIL_REFERENCE_ALIASES).as_deref(),
            Some("PLN-9")
        );
    }

    #[test]
    fn date_parses_day_month_year_only() {
        assert_eq!(parse_received_date("14/05/2019").unwrap(), "2019-05-14");
        assert_eq!(parse_received_date(" 1/12/2020 ").unwrap(), "2020-12-01");
        assert!(matches!(
            parse_received_date("2019-05-14"),
            Err(ScrapeError::DateFormat { .. })
        ));
    }

    #[test]
    fn malformed_date_in_a_matched_column_is_fatal() {
        let row = TableRow::from_pairs(&[("Date Lodged", "yesterday")]);
        assert!(matches!(
            extract_index_fields(&row, "VIC"),
            Err(ScrapeError::DateFormat { .. })
        ));
    }

    #[test]
    fn suburb_is_appended_with_state_when_absent_from_address() {
        let row = TableRow::from_pairs(&[("Address", "1 Main St"), ("Suburb", "Carlton")]);
        let fields = extract_index_fields(&row, "VIC").unwrap();
        assert_eq!(fields.address.as_deref(), Some("1 Main St, Carlton, VIC"));
    }

    #[test]
    fn suburb_already_in_address_is_not_repeated() {
        let row = TableRow::from_pairs(&[
            ("Location Address", "1 Main St, Carlton VIC 3053"),
            ("Suburb", "Carlton"),
        ]);
        let fields = extract_index_fields(&row, "VIC").unwrap();
        assert_eq!(fields.address.as_deref(), Some("1 Main St, Carlton VIC 3053"));
    }

    #[test]
    fn append_state_is_idempotent() {
        assert_eq!(append_state("1 Main St, Carlton", "VIC"), "1 Main St, Carlton, VIC");
        assert_eq!(append_state("1 Main St, Carlton, VIC", "VIC"), "1 Main St, Carlton, VIC");
        assert_eq!(append_state("1 Main St, Carlton VIC 3053", "VIC"), "1 Main St, Carlton VIC 3053");
        // "VICTORIA" must not count as already containing "VIC"
        assert_eq!(append_state("1 Victoria St, Carlton", "VIC"), "1 Victoria St, Carlton, VIC");
    }

    #[test]
    fn building_name_dropped_only_with_three_or_more_segments() {
        assert_eq!(
            strip_building_name("Westfield Tower, 1 Main St, Carlton"),
            "1 Main St, Carlton"
        );
        assert_eq!(strip_building_name("1 Main St, Carlton"), "1 Main St, Carlton");
        assert_eq!(strip_building_name("1 Main St"), "1 Main St");
    }

    #[test]
    fn detail_fields_take_precedence_in_merge() {
        let index = ExtractedFields {
            council_reference: Some("PLN-1".into()),
            address: Some("index address".into()),
            ..Default::default()
        };
        let detail = ExtractedFields {
            address: Some("detail address".into()),
            description: Some("detail description".into()),
            ..Default::default()
        };
        let merged = index.merged_with(detail);
        assert_eq!(merged.council_reference.as_deref(), Some("PLN-1"));
        assert_eq!(merged.address.as_deref(), Some("detail address"));
        assert_eq!(merged.description.as_deref(), Some("detail description"));
    }

    #[test]
    fn incomplete_record_names_the_missing_fields() {
        let fields = ExtractedFields {
            council_reference: Some("PLN-1".into()),
            address: Some("1 Main St".into()),
            ..Default::default()
        };
        let url = Url::parse("https://example.org/ePathway/Production").unwrap();
        let err = Record::from_fields(fields, &url, NaiveDate::from_ymd_opt(2019, 5, 14).unwrap())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("description"));
        assert!(msg.contains("date_received"));
    }

    #[test]
    fn record_serialises_without_absent_notice_dates() {
        let url = Url::parse("https://example.org/ePathway/Production").unwrap();
        let fields = ExtractedFields {
            council_reference: Some("PLN-1".into()),
            address: Some("1 Main St, Carlton, VIC".into()),
            description: Some("Carport".into()),
            date_received: Some("2019-05-14".into()),
            ..Default::default()
        };
        let record =
            Record::from_fields(fields, &url, NaiveDate::from_ymd_opt(2019, 5, 14).unwrap()).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"council_reference\":\"PLN-1\""));
        assert!(!json.contains("on_notice_from"));
    }
}
