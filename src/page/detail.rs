// src/page/detail.rs
//
// The per-application detail page, used when the index listing doesn't carry
// everything a record needs. Most fields sit in span label/value pairs; the
// address may instead live in a location table at the bottom of the page,
// where the row flagged as the primary location is the one that counts.

use once_cell::sync::Lazy;
use scraper::Selector;
use tracing::debug;

use crate::client::Document;
use crate::error::{Result, ScrapeError};
use crate::fields::{parse_received_date, ExtractedFields};
use crate::table::{self, TableRow};

static CONTENT_TABLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.ContentPanel").expect("selector should parse"));

static ADDRESS_LABEL: &str = "Application location";
static COUNCIL_REFERENCE_LABELS: &[&str] = &["Application Number", "Application number"];
static DESCRIPTION_LABELS: &[&str] = &["Proposed Use or Development", "Application description"];
static DATE_RECEIVED_LABELS: &[&str] = &["Date Received", "Lodgement date"];

fn labeled_field(doc: &Document, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| doc.labeled_field(label))
}

/// All `table.ContentPanel` tables that extract cleanly, with their rows.
/// Tables that don't follow the heading/content structure are skipped; the
/// page carries plenty of layout tables we don't care about.
fn content_tables(doc: &Document) -> Vec<Vec<TableRow>> {
    doc.html()
        .select(&CONTENT_TABLE_SEL)
        .filter_map(|t| table::extract_rows(t, doc.url()).ok())
        .filter(|rows| !rows.is_empty())
        .collect()
}

fn find_address(doc: &Document) -> Result<Option<String>> {
    if let Some(address) = doc.labeled_field(ADDRESS_LABEL) {
        return Ok(Some(address));
    }

    // Fall back to the location table.
    let rows = match content_tables(doc).into_iter().find(|rows| {
        rows[0]
            .headings()
            .any(|h| h == "Property Address" || h == "Address")
    }) {
        Some(rows) => rows,
        None => return Err(ScrapeError::AddressTableNotFound),
    };

    let row = if rows.len() == 1 {
        &rows[0]
    } else {
        rows.iter()
            .find(|r| r.get("Primary Location") == Some("Yes"))
            .ok_or(ScrapeError::PrimaryLocationNotFound)?
    };
    // an empty cell is no address at all; letting it through would build a
    // record whose address is just the appended state code
    Ok(row
        .get("Property Address")
        .or_else(|| row.get("Address"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string))
}

/// The on-notice date range, when the page advertises one in a table with
/// Start Date / Closing Date columns.
fn find_notice_period(doc: &Document) -> Result<(Option<String>, Option<String>)> {
    let rows = content_tables(doc).into_iter().find(|rows| {
        let mut headings = rows[0].headings();
        headings.any(|h| h == "Start Date") && rows[0].headings().any(|h| h == "Closing Date")
    });
    let Some(rows) = rows else {
        return Ok((None, None));
    };
    let from = match rows[0].get("Start Date").filter(|v| !v.is_empty()) {
        Some(v) => Some(parse_received_date(v)?),
        None => None,
    };
    let to = match rows[0].get("Closing Date").filter(|v| !v.is_empty()) {
        Some(v) => Some(parse_received_date(v)?),
        None => None,
    };
    Ok((from, to))
}

/// Extract whatever fields the detail page offers. Which of them are
/// actually required is the caller's concern; a malformed received date is
/// fatal here because it means the page isn't what we think it is.
pub fn scrape(doc: &Document) -> Result<ExtractedFields> {
    let address = find_address(doc)?;
    let date_received = match labeled_field(doc, DATE_RECEIVED_LABELS) {
        Some(value) => Some(parse_received_date(&value)?),
        None => None,
    };
    let (on_notice_from, on_notice_to) = find_notice_period(doc)?;
    debug!(url = %doc.url(), "scraped detail page");

    Ok(ExtractedFields {
        council_reference: labeled_field(doc, COUNCIL_REFERENCE_LABELS),
        address,
        description: labeled_field(doc, DESCRIPTION_LABELS),
        date_received,
        detail_url: None,
        on_notice_from,
        on_notice_to,
    })
}
