// src/page/list_select.rs
//
// The first screen on many deployments: a radio-button choice between the
// advertised-applications list and the full register. Sites with a single
// list skip the screen entirely, so absence of radio buttons means "not
// applicable", never an error. A label we don't recognise is a hard stop:
// guessing here would silently scrape the wrong data set.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::client::{Document, WebClient};
use crate::error::{Result, ScrapeError};

/// Which list to pick when the chooser is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Advertising,
    All,
}

static ADVERTISING_LABELS: &[&str] = &[
    "Planning Application at Advertising",
    "Planning Applications Currently on Advertising",
    "Development Applications On Public Exhibition",
    "Planning Permit Applications Advertised",
    "Development applications in Public Notification",
    "Advertised Planning Applications",
    "Planning Applications Currently Advertised",
    "Planning permit applications advertised",
    "Planning applications being advertised",
];

static ALL_LABELS: &[&str] = &[
    "Development Application Tracking",
    "Town Planning Public Register",
    "Planning Application Register",
    "Planning Permit Application Search",
    "Development applications",
    "Development Applications",
    "Planning Application Enquiry",
    "List of Development Applications",
];

impl ListKind {
    fn labels(self) -> &'static [&'static str] {
        match self {
            ListKind::Advertising => ADVERTISING_LABELS,
            ListKind::All => ALL_LABELS,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ListKind::Advertising => "advertising",
            ListKind::All => "all",
        }
    }
}

/// Whether this document is the list chooser at all.
pub fn is_applicable(doc: &Document) -> bool {
    doc.forms().iter().any(|f| !f.radios.is_empty())
}

/// Pick the list matching `kind` and continue. The radio labels on the page
/// are compared case-insensitively against the known wordings for the kind.
pub fn pick<C: WebClient>(client: &C, doc: &Document, kind: ListKind) -> Result<Document> {
    let form = doc
        .forms()
        .iter()
        .find(|f| !f.radios.is_empty())
        .ok_or_else(|| ScrapeError::Structure("no form with radio buttons".to_string()))?;

    let radio = form
        .radios
        .iter()
        .find(|r| {
            kind.labels()
                .iter()
                .any(|label| r.label.eq_ignore_ascii_case(label))
        })
        .ok_or_else(|| ScrapeError::OptionNotFound {
            wanted: kind.name().to_string(),
            labels: form.radios.iter().map(|r| r.label.clone()).collect(),
        })?;
    info!(list = kind.name(), label = %radio.label, "picking list type");

    let mut form = form.clone();
    let radio = radio.clone();
    form.check_radio(&radio);
    let button = form
        .button_where(|v| v.contains("Next") || v.contains("Save and Continue"))
        .ok_or_else(|| {
            ScrapeError::ControlNotFound("Next / Save and Continue button".to_string())
        })?
        .clone();
    client.submit(&form, Some(&button))
}

static REDIRECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"window\.location\.href='(.*?)';").expect("regex should parse"));

/// The entry URL answers with a script redirect that establishes the
/// session. We don't run script, so pick the target out of the body and
/// follow it by hand.
pub fn follow_javascript_redirect<C: WebClient>(client: &C, doc: &Document) -> Result<Document> {
    let target = REDIRECT_RE
        .captures(doc.body())
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ScrapeError::Structure("no javascript redirect on entry page".to_string()))?;
    let url = doc.url().join(&target)?;
    debug!(%url, "following javascript redirect");
    client.get(&url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Form, SubmitButton};
    use url::Url;

    struct NoopClient;

    impl WebClient for NoopClient {
        fn get(&self, url: &Url) -> Result<Document> {
            Document::parse(url.clone(), "<html></html>")
        }
        fn get_with_referrer(&self, url: &Url, _referrer: &Url) -> Result<Document> {
            self.get(url)
        }
        fn submit(&self, form: &Form, _button: Option<&SubmitButton>) -> Result<Document> {
            Document::parse(form.action.clone(), "<html></html>")
        }
    }

    fn chooser(label_a: &str, label_b: &str, button: &str) -> Document {
        let body = format!(
            concat!(
                r#"<form action="chooser.aspx" method="post">"#,
                r#"<p><input type="radio" name="list" value="0"/></p><span>{}</span>"#,
                r#"<p><input type="radio" name="list" value="1"/></p><span>{}</span>"#,
                r#"<input type="submit" name="go" value="{}"/>"#,
                "</form>",
            ),
            label_a, label_b, button
        );
        Document::parse(Url::parse("https://example.org/Web/EnquiryLists.aspx").unwrap(), &body)
            .unwrap()
    }

    #[test]
    fn page_without_radios_is_not_applicable() {
        let doc = Document::parse(
            Url::parse("https://example.org/").unwrap(),
            r#"<form><input type="submit" value="Search"/></form>"#,
        )
        .unwrap();
        assert!(!is_applicable(&doc));
    }

    #[test]
    fn picks_the_matching_radio_and_submits() {
        let doc = chooser(
            "Advertised Planning Applications",
            "Town Planning Public Register",
            "Next",
        );
        assert!(is_applicable(&doc));
        let next = pick(&NoopClient, &doc, ListKind::All).unwrap();
        assert_eq!(next.url().path(), "/Web/chooser.aspx");
    }

    #[test]
    fn label_matching_ignores_case() {
        let doc = chooser(
            "PLANNING APPLICATIONS BEING ADVERTISED",
            "Development Applications",
            "Save and Continue",
        );
        assert!(pick(&NoopClient, &doc, ListKind::Advertising).is_ok());
    }

    #[test]
    fn unknown_labels_are_a_hard_stop() {
        let doc = chooser("Dog Registration Lookup", "Rates Enquiry", "Next");
        let err = pick(&NoopClient, &doc, ListKind::All).unwrap_err();
        match err {
            ScrapeError::OptionNotFound { wanted, labels } => {
                assert_eq!(wanted, "all");
                assert_eq!(labels.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_continue_button_is_a_hard_stop() {
        let doc = chooser(
            "Advertised Planning Applications",
            "Development Applications",
            "Reset",
        );
        assert!(matches!(
            pick(&NoopClient, &doc, ListKind::All),
            Err(ScrapeError::ControlNotFound(_))
        ));
    }

    #[test]
    fn follows_script_redirect_from_body() {
        let doc = Document::parse(
            Url::parse("https://example.org/ePathway/Production/Web/GeneralEnquiry/EnquiryLists.aspx").unwrap(),
            r#"<script>window.location.href='EnquiryLists.aspx?ModuleCode=LAP&js=1';</script>"#,
        )
        .unwrap();
        let next = follow_javascript_redirect(&NoopClient, &doc).unwrap();
        assert!(next.url().as_str().ends_with("EnquiryLists.aspx?ModuleCode=LAP&js=1"));
    }

    #[test]
    fn missing_redirect_is_a_structure_error() {
        let doc = Document::parse(
            Url::parse("https://example.org/").unwrap(),
            "<html><body>plain page</body></html>",
        )
        .unwrap();
        assert!(matches!(
            follow_javascript_redirect(&NoopClient, &doc),
            Err(ScrapeError::Structure(_))
        ));
    }
}
