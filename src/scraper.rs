// src/scraper.rs
//
// Ties the screens together: entry page → script redirect → list chooser
// (when present) → search screen → paginated results. Which screens exist
// and how the results paginate varies per deployment, so everything is
// driven by the per-site options.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::client::{Document, WebClient};
use crate::error::Result;
use crate::fields::Record;
use crate::page::{index, list_select, search};
use crate::page::list_select::ListKind;

/// Path from a site's base URL to the development-applications enquiry list.
const ENQUIRY_LIST_PATH: &str = "Web/GeneralEnquiry/EnquiryLists.aspx?ModuleCode=LAP";

/// Which result set to view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    Advertising,
    All,
    #[serde(rename = "last_30_days")]
    Last30Days,
    AllThisYear,
}

/// How the site's results list advances from page to page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pagination {
    /// Replay the next-page postback link through `aspnetForm`.
    PostbackLink,
    /// One GET per page with a PageNumber query parameter.
    #[default]
    PageNumberGet,
}

/// Per-site configuration consumed by the core.
#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub list_mode: ListMode,
    pub pagination: Pagination,
    /// Upper bound on pages to visit; also stands in for the page count on
    /// sites whose paging label over-reports it.
    pub max_pages: Option<u32>,
    /// Always visit the detail page, for sites whose index data is known to
    /// be unreliable.
    pub force_detail: bool,
    /// Drop a leading building-name segment from 3+-segment addresses.
    pub strip_building_name: bool,
    /// Jurisdiction code appended to addresses that don't carry one.
    pub state: String,
}

impl ScrapeOptions {
    pub fn new(list_mode: ListMode, state: &str) -> ScrapeOptions {
        ScrapeOptions {
            list_mode,
            pagination: Pagination::default(),
            max_pages: None,
            force_detail: false,
            strip_building_name: false,
            state: state.to_string(),
        }
    }
}

/// One scrape run against one ePathway deployment. Owns its web client (and
/// with it the session cookie jar); concurrent runs each need their own.
pub struct Scraper<C: WebClient> {
    client: C,
    list_url: Url,
    options: ScrapeOptions,
}

impl<C: WebClient> Scraper<C> {
    pub fn new(base_url: &str, client: C, options: ScrapeOptions) -> Result<Scraper<C>> {
        // trailing slash so the enquiry path appends instead of replacing
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let list_url = Url::parse(&base)?.join(ENQUIRY_LIST_PATH)?;
        Ok(Scraper {
            client,
            list_url,
            options,
        })
    }

    pub fn list_url(&self) -> &Url {
        &self.list_url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Navigate to the first results page for the configured list mode.
    fn reach_results(&self) -> Result<Document> {
        let page = self.client.get(&self.list_url)?;
        let page = list_select::follow_javascript_redirect(&self.client, &page)?;

        let page = if list_select::is_applicable(&page) {
            let kind = match self.options.list_mode {
                ListMode::Advertising => ListKind::Advertising,
                _ => ListKind::All,
            };
            list_select::pick(&self.client, &page, kind)?
        } else {
            page
        };

        match self.options.list_mode {
            // the date tab's default range covers exactly the last 30 days
            ListMode::Last30Days => {
                let page = search::click_date_search_tab(&self.client, &page)?;
                search::click_search(&self.client, page)
            }
            ListMode::Advertising | ListMode::All | ListMode::AllThisYear => {
                search::click_search(&self.client, page)
            }
        }
    }

    /// Scrape every application in the configured list, streaming records to
    /// `emit` in page order, row order. Returns the number of records.
    pub fn scrape<F: FnMut(Record)>(&self, mut emit: F) -> Result<usize> {
        info!(url = %self.list_url, mode = ?self.options.list_mode, "starting scrape");
        let first = self.reach_results()?;
        let emitted = index::scrape_all_pages(
            &self.client,
            first,
            &self.list_url,
            &self.options,
            Local::now().date_naive(),
            &mut emit,
        )?;
        info!(emitted, "scrape finished");
        Ok(emitted)
    }

    /// Look up one application by its formatted number and scrape whatever
    /// the search returns (normally a single-row results page).
    pub fn scrape_application<F: FnMut(Record)>(
        &self,
        application_no: &str,
        mut emit: F,
    ) -> Result<usize> {
        self.scrape_application_at(application_no, Local::now().date_naive(), &mut emit)
    }

    fn scrape_application_at<F: FnMut(Record)>(
        &self,
        application_no: &str,
        run_date: NaiveDate,
        emit: &mut F,
    ) -> Result<usize> {
        let page = self.client.get(&self.list_url)?;
        let page = list_select::follow_javascript_redirect(&self.client, &page)?;
        let page = if list_select::is_applicable(&page) {
            list_select::pick(&self.client, &page, ListKind::All)?
        } else {
            page
        };
        let results = search::search_for_application(&self.client, &page, application_no)?;
        index::scrape_index_page(
            &self.client,
            &results,
            &self.list_url,
            &self.options,
            run_date,
            emit,
        )
    }
}
