// src/table.rs
//
// ePathway renders every result listing with the same table skeleton: one
// `tr.ContentPanelHeading` row of `th` headings, then data rows alternating
// between `tr.ContentPanel` and `tr.AlternateContentPanel`. The headings are
// the only schema the site gives us, so each data row is zipped against them.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use url::Url;

use crate::client::normalized_text;
use crate::error::{Result, ScrapeError};

static HEADING_ROW_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.ContentPanelHeading").expect("selector should parse"));
static HEADING_CELL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th").expect("selector should parse"));
static CONTENT_ROW_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr.ContentPanel, tr.AlternateContentPanel").expect("selector should parse")
});
static CELL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td").expect("selector should parse"));
static LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("selector should parse"));

/// One data row: cell text keyed by the column heading exactly as it appears
/// on the page, plus the row's detail link if it has one.
#[derive(Debug, Clone)]
pub struct TableRow {
    content: Vec<(String, String)>,
    pub detail_url: Option<Url>,
}

impl TableRow {
    /// Cell text under `heading`, compared case-insensitively. The alias
    /// tables carry both capitalisations some deployments use, but matching
    /// loosely here keeps a third variant from slipping through unresolved.
    pub fn get(&self, heading: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(heading))
            .map(|(_, v)| v.as_str())
    }

    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.content.iter().map(|(h, _)| h.as_str())
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> TableRow {
        TableRow {
            content: pairs.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect(),
            detail_url: None,
        }
    }
}

/// Extract every data row of `table`, resolving each row's first link href
/// against `base` into an absolute detail URL.
pub fn extract_rows(table: ElementRef, base: &Url) -> Result<Vec<TableRow>> {
    let heading_row = table
        .select(&HEADING_ROW_SEL)
        .next()
        .ok_or_else(|| ScrapeError::Structure("results table has no heading row".to_string()))?;
    let headings: Vec<String> = heading_row
        .select(&HEADING_CELL_SEL)
        .map(normalized_text)
        .collect();

    let mut rows = Vec::new();
    for tr in table.select(&CONTENT_ROW_SEL) {
        let cells: Vec<String> = tr.select(&CELL_SEL).map(normalized_text).collect();
        let detail_url = match tr.select(&LINK_SEL).next().and_then(|a| a.value().attr("href")) {
            Some(href) => Some(base.join(href)?),
            None => None,
        };
        let content = headings
            .iter()
            .zip(cells)
            .map(|(h, v)| (h.clone(), v))
            .collect();
        rows.push(TableRow { content, detail_url });
    }
    Ok(rows)
}
