// src/page/index.rs
//
// The paginated results listing. Per page the work is the same — extract the
// rows, resolve fields, fall back to the detail page when the listing is
// thin — but sites advance pages two different ways: older deployments only
// offer postback links that have to be replayed through `aspnetForm`, newer
// ones accept a plain PageNumber query parameter.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use tracing::{debug, info};
use url::Url;

use crate::client::{normalized_text, Document, WebClient};
use crate::error::{Result, ScrapeError};
use crate::fields::{self, Record};
use crate::page::detail;
use crate::postback;
use crate::scraper::{Pagination, ScrapeOptions};
use crate::table;

static RESULTS_TABLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.ContentPanel").expect("selector should parse"));

static PAGE_LABEL_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#ctl00_MainBodyContent_mPagingControl_pageNumberLabel")
        .expect("selector should parse")
});

static PAGE_OF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Page \d+ of (\d+)").expect("regex should parse"));

/// Total page count according to the paging label. No label means the site
/// didn't paginate, i.e. exactly one page; a label we can't read means the
/// markup has drifted and the run must stop.
pub fn extract_total_pages(doc: &Document) -> Result<u32> {
    let Some(label) = doc.html().select(&PAGE_LABEL_SEL).next() else {
        return Ok(1);
    };
    let text = normalized_text(label);
    let caps = PAGE_OF_RE
        .captures(&text)
        .ok_or_else(|| ScrapeError::Structure(format!("unexpected paging label {text:?}")))?;
    caps[1]
        .parse()
        .map_err(|_| ScrapeError::Structure(format!("unexpected paging label {text:?}")))
}

/// Process one results page: resolve each row, fall back to its detail page
/// when required fields are missing (or detail is forced), normalise the
/// address and emit a record. Returns the number of records emitted.
pub fn scrape_index_page<C, F>(
    client: &C,
    doc: &Document,
    info_url: &Url,
    options: &ScrapeOptions,
    run_date: NaiveDate,
    emit: &mut F,
) -> Result<usize>
where
    C: WebClient,
    F: FnMut(Record),
{
    let Some(table_el) = doc.html().select(&RESULTS_TABLE_SEL).next() else {
        // some sites render an empty results page with no table at all
        return Ok(0);
    };
    let rows = table::extract_rows(table_el, doc.url())?;

    let mut emitted = 0;
    for row in &rows {
        let mut extracted = fields::extract_index_fields(row, &options.state)?;

        if !extracted.is_complete() || options.force_detail {
            let detail_url = extracted.detail_url.clone().ok_or_else(|| {
                ScrapeError::IncompleteRecord(format!(
                    "{} and the row has no detail link",
                    extracted.missing().join(", ")
                ))
            })?;
            // without a referrer some deployments answer with an error page
            let detail_doc = client.get_with_referrer(&detail_url, doc.url())?;
            extracted = extracted.merged_with(detail::scrape(&detail_doc)?);
        }

        if let Some(address) = extracted.address.take() {
            let address = if options.strip_building_name {
                fields::strip_building_name(&address)
            } else {
                address
            };
            extracted.address = Some(fields::append_state(&address, &options.state));
        }

        let record = Record::from_fields(extracted, info_url, run_date)?;
        info!(reference = %record.council_reference, address = %record.address, "extracted application");
        emit(record);
        emitted += 1;
    }
    Ok(emitted)
}

/// Scrape every results page starting from `first`, using the pagination
/// strategy the site supports.
pub fn scrape_all_pages<C, F>(
    client: &C,
    first: Document,
    list_url: &Url,
    options: &ScrapeOptions,
    run_date: NaiveDate,
    emit: &mut F,
) -> Result<usize>
where
    C: WebClient,
    F: FnMut(Record),
{
    match options.pagination {
        Pagination::PostbackLink => {
            scrape_with_postback_links(client, first, list_url, options, run_date, emit)
        }
        Pagination::PageNumberGet => {
            scrape_with_page_gets(client, list_url, options, run_date, emit)
        }
    }
}

/// Stateful paging: find the link labelled with the next page number and
/// replay its postback through `aspnetForm`, overriding the form's posting
/// address with the one the link carries. No such link means we're done.
fn scrape_with_postback_links<C, F>(
    client: &C,
    first: Document,
    list_url: &Url,
    options: &ScrapeOptions,
    run_date: NaiveDate,
    emit: &mut F,
) -> Result<usize>
where
    C: WebClient,
    F: FnMut(Record),
{
    let mut doc = first;
    let mut page_no: u32 = 1;
    let mut emitted = 0;
    loop {
        debug!(page_no, "scraping index page");
        emitted += scrape_index_page(client, &doc, list_url, options, run_date, emit)?;

        if options.max_pages.is_some_and(|max| page_no >= max) {
            break;
        }
        let Some(href) = doc.link_href_with_text(&(page_no + 1).to_string()) else {
            break;
        };
        let next = postback::parse_postback_options(href)
            .ok_or_else(|| ScrapeError::PaginationLink(href.to_string()))?;

        let mut form = doc
            .form_named("aspnetForm")
            .ok_or_else(|| ScrapeError::Structure("no aspnetForm for pagination".to_string()))?
            .clone();
        form.set_action(doc.url().join(&next.argument)?);
        form.set("__EVENTTARGET", &next.target);
        form.set("__EVENTARGUMENT", "");

        doc = client.submit(&form, None)?;
        page_no += 1;
    }
    Ok(emitted)
}

/// Stateless paging: one GET per page number. The count comes from the
/// configured override when present, otherwise from page 1's paging label.
fn scrape_with_page_gets<C, F>(
    client: &C,
    list_url: &Url,
    options: &ScrapeOptions,
    run_date: NaiveDate,
    emit: &mut F,
) -> Result<usize>
where
    C: WebClient,
    F: FnMut(Record),
{
    let doc = client.get(&summary_page_url(list_url, 1)?)?;
    let total = match options.max_pages {
        Some(max) => max,
        None => extract_total_pages(&doc)?,
    };
    debug!(total, "paging with GETs");

    let mut emitted = scrape_index_page(client, &doc, list_url, options, run_date, emit)?;
    for page_no in 2..=total {
        let doc = client.get(&summary_page_url(list_url, page_no)?)?;
        emitted += scrape_index_page(client, &doc, list_url, options, run_date, emit)?;
    }
    Ok(emitted)
}

fn summary_page_url(list_url: &Url, page_no: u32) -> Result<Url> {
    Ok(list_url.join(&format!("EnquirySummaryView.aspx?PageNumber={}", page_no))?)
}
