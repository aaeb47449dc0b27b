// src/page/search.rs
//
// The tabbed search screen. The tabs are anchors carrying `__doPostBack`
// hrefs; switching tab means replaying that postback as a form submission.
// The date tab defaults its range to the last 30 days, which is exactly the
// window the last-30-days list mode wants, so picking the tab and pressing
// Search is the whole interaction.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use tracing::{debug, info};

use crate::client::{normalized_text, Document, SubmitButton, WebClient};
use crate::error::{Result, ScrapeError};
use crate::postback;

static DATE_TAB_LABELS: &[&str] = &["Date Search", "Lodgement Date"];

static TAB_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.tabcontrol a").expect("selector should parse"));

static FORMATTED_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FormattedNumberTextBox").expect("regex should parse"));

/// Switch to the date-search tab by replaying its postback.
pub fn click_date_search_tab<C: WebClient>(client: &C, doc: &Document) -> Result<Document> {
    let anchor = doc
        .html()
        .select(&TAB_LINK_SEL)
        .find(|a| DATE_TAB_LABELS.contains(&normalized_text(*a).as_str()))
        .ok_or(ScrapeError::TabNotFound)?;
    let href = anchor.value().attr("href").unwrap_or_default();
    let postback = postback::parse_do_postback(href)
        .ok_or_else(|| ScrapeError::PostbackLink(href.to_string()))?;
    debug!(target = %postback.target, "switching to date search tab");

    let mut form = doc
        .form()
        .ok_or_else(|| ScrapeError::Structure("no form for tab postback".to_string()))?
        .clone();
    form.set("__EVENTTARGET", &postback.target);
    form.set("__EVENTARGUMENT", &postback.argument);
    client.submit(&form, None)
}

fn search_button(doc: &Document) -> Option<(usize, SubmitButton)> {
    doc.forms().iter().enumerate().find_map(|(i, form)| {
        form.button_where(|v| v == "Search")
            .map(|b| (i, b.clone()))
    })
}

/// Whether this document has a search step at all.
pub fn is_applicable(doc: &Document) -> bool {
    search_button(doc).is_some()
}

/// Press Search if the page has a Search button; pages without one (some
/// deployments go straight to the results) pass through unchanged.
pub fn click_search<C: WebClient>(client: &C, doc: Document) -> Result<Document> {
    match search_button(&doc) {
        Some((form_index, button)) => {
            info!("clicking search");
            client.submit(&doc.forms()[form_index], Some(&button))
        }
        None => Ok(doc),
    }
}

/// Search for a single known application number via the formatted-number
/// text box the number-search tab carries.
pub fn search_for_application<C: WebClient>(
    client: &C,
    doc: &Document,
    application_no: &str,
) -> Result<Document> {
    let (form_index, field_name) = doc
        .forms()
        .iter()
        .enumerate()
        .find_map(|(i, form)| {
            form.field_names()
                .find(|n| FORMATTED_NUMBER_RE.is_match(n))
                .map(|n| (i, n.to_string()))
        })
        .ok_or_else(|| ScrapeError::ControlNotFound("formatted number text box".to_string()))?;

    let mut form = doc.forms()[form_index].clone();
    form.set(&field_name, application_no);
    let button = form
        .button_where(|v| v == "Search")
        .ok_or_else(|| ScrapeError::ControlNotFound("Search button".to_string()))?
        .clone();
    info!(application_no, "searching for single application");
    client.submit(&form, Some(&button))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Form;
    use std::cell::RefCell;
    use url::Url;

    /// Records the submissions it receives so tests can assert on the
    /// injected postback fields.
    struct RecordingClient {
        submissions: RefCell<Vec<Vec<(String, String)>>>,
    }

    impl RecordingClient {
        fn new() -> Self {
            RecordingClient {
                submissions: RefCell::new(Vec::new()),
            }
        }
    }

    impl WebClient for RecordingClient {
        fn get(&self, url: &Url) -> Result<Document> {
            Document::parse(url.clone(), "<html></html>")
        }
        fn get_with_referrer(&self, url: &Url, _referrer: &Url) -> Result<Document> {
            self.get(url)
        }
        fn submit(&self, form: &Form, button: Option<&SubmitButton>) -> Result<Document> {
            self.submissions.borrow_mut().push(form.submission(button));
            Document::parse(form.action.clone(), "<html></html>")
        }
    }

    fn doc(body: &str) -> Document {
        Document::parse(
            Url::parse("https://example.org/Web/GeneralEnquiry/EnquirySummaryView.aspx").unwrap(),
            body,
        )
        .unwrap()
    }

    #[test]
    fn date_tab_postback_is_replayed_through_the_form() {
        let page = doc(concat!(
            r#"<form action="search.aspx" method="post">"#,
            r#"<input type="hidden" name="__VIEWSTATE" value="vs"/>"#,
            "</form>",
            r#"<table class="tabcontrol"><tr>"#,
            r#"<td><a href="javascript:__doPostBack('mTabControl','1')">Number Search</a></td>"#,
            r#"<td><a href="javascript:__doPostBack('mTabControl','2')">Date Search</a></td>"#,
            "</tr></table>",
        ));
        let client = RecordingClient::new();
        click_date_search_tab(&client, &page).unwrap();
        let submissions = client.submissions.borrow();
        let pairs = &submissions[0];
        assert!(pairs.contains(&("__EVENTTARGET".to_string(), "mTabControl".to_string())));
        assert!(pairs.contains(&("__EVENTARGUMENT".to_string(), "2".to_string())));
        assert!(pairs.contains(&("__VIEWSTATE".to_string(), "vs".to_string())));
    }

    #[test]
    fn unknown_tabs_fail() {
        let page = doc(concat!(
            r#"<form action="search.aspx"></form>"#,
            r#"<table class="tabcontrol"><tr><td><a href="javascript:__doPostBack('t','1')">Permit Search</a></td></tr></table>"#,
        ));
        assert!(matches!(
            click_date_search_tab(&RecordingClient::new(), &page),
            Err(ScrapeError::TabNotFound)
        ));
    }

    #[test]
    fn non_postback_tab_href_fails() {
        let page = doc(concat!(
            r#"<form action="search.aspx"></form>"#,
            r#"<table class="tabcontrol"><tr><td><a href="DateSearch.aspx">Date Search</a></td></tr></table>"#,
        ));
        assert!(matches!(
            click_date_search_tab(&RecordingClient::new(), &page),
            Err(ScrapeError::PostbackLink(_))
        ));
    }

    #[test]
    fn click_search_passes_through_without_a_button() {
        let page = doc(r#"<form action="x.aspx"><input type="submit" value="Reset"/></form>"#);
        let client = RecordingClient::new();
        let out = click_search(&client, page).unwrap();
        assert!(client.submissions.borrow().is_empty());
        assert!(out.url().as_str().ends_with("EnquirySummaryView.aspx"));
    }

    #[test]
    fn click_search_presses_the_search_button() {
        let page = doc(concat!(
            r#"<form action="x.aspx" method="post">"#,
            r#"<input type="submit" name="btnSearch" value="Search"/>"#,
            "</form>",
        ));
        let client = RecordingClient::new();
        click_search(&client, page).unwrap();
        let submissions = client.submissions.borrow();
        assert!(submissions[0].contains(&("btnSearch".to_string(), "Search".to_string())));
    }

    #[test]
    fn single_application_search_fills_the_formatted_number_box() {
        let page = doc(concat!(
            r#"<form action="x.aspx" method="post">"#,
            r#"<input type="text" name="ctl00$MainBodyContent$mGeneralEnquirySearchControl$mFormattedNumberTextBox" value=""/>"#,
            r#"<input type="submit" name="btnSearch" value="Search"/>"#,
            "</form>",
        ));
        let client = RecordingClient::new();
        search_for_application(&client, &page, "PLN-2019/123").unwrap();
        let submissions = client.submissions.borrow();
        assert!(submissions[0].iter().any(|(n, v)| n.contains("FormattedNumberTextBox") && v == "PLN-2019/123"));
    }

    #[test]
    fn single_application_search_without_the_box_fails() {
        let page = doc(r#"<form action="x.aspx"><input type="submit" value="Search"/></form>"#);
        assert!(matches!(
            search_for_application(&RecordingClient::new(), &page, "PLN-1"),
            Err(ScrapeError::ControlNotFound(_))
        ));
    }
}
