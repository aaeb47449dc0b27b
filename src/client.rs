// src/client.rs
//
// Document/form model plus the transport seam. Everything above this layer
// works on `Document` snapshots; a new snapshot is produced for every fetch
// or form submission, so no page state is ever mutated in place.

use once_cell::sync::Lazy;
use reqwest::blocking::Client;
use reqwest::header::REFERER;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;
use url::Url;

use crate::error::Result;

static FORM_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("form").expect("selector should parse"));
static INPUT_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("input").expect("selector should parse"));
static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("selector should parse"));

/// Inner text of an element with runs of whitespace collapsed to single
/// spaces. ePathway markup is machine generated but still manages to wrap
/// label text across lines on some deployments.
pub fn normalized_text(el: ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the node immediately following `node`, skipping whitespace-only
/// text nodes. Used for radio labels and detail-page label/value pairs,
/// where the value lives in the next sibling of the labelled element.
fn following_sibling_text(node: ego_tree::NodeRef<Node>) -> Option<String> {
    let mut sibling = node.next_sibling();
    while let Some(n) = sibling {
        if let Some(el) = ElementRef::wrap(n) {
            return Some(normalized_text(el));
        }
        if let Some(text) = n.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        sibling = n.next_sibling();
    }
    None
}

/// A submit control on a form, identified by its displayed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub name: Option<String>,
    pub value: String,
}

/// A radio input together with the label text that sits next to it on the
/// page. The label is what we match against, the name/value pair is what
/// gets submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioButton {
    pub name: String,
    pub value: String,
    pub label: String,
}

/// One form on a page. To submit, clone the form, mutate the clone (check a
/// radio, set a hidden field, override the action) and hand it to the client.
#[derive(Debug, Clone)]
pub struct Form {
    pub name: Option<String>,
    pub action: Url,
    pub method: String,
    fields: Vec<(String, String)>,
    pub buttons: Vec<SubmitButton>,
    pub radios: Vec<RadioButton>,
}

impl Form {
    /// Set a field, overwriting an existing value or appending a new field.
    /// ASP.NET hidden fields like `__EVENTTARGET` may or may not be present
    /// in the markup, so both cases have to work.
    pub fn set(&mut self, name: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|(n, _)| n == name) {
            field.1 = value.to_string();
        } else {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Mark a radio button as the one to submit.
    pub fn check_radio(&mut self, radio: &RadioButton) {
        self.set(&radio.name, &radio.value);
    }

    pub fn set_action(&mut self, action: Url) {
        self.action = action;
    }

    /// First submit button whose value satisfies `pred`.
    pub fn button_where(&self, pred: impl Fn(&str) -> bool) -> Option<&SubmitButton> {
        self.buttons.iter().find(|b| pred(&b.value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// The name/value pairs a browser would send when `button` is pressed.
    pub fn submission(&self, button: Option<&SubmitButton>) -> Vec<(String, String)> {
        let mut pairs = self.fields.clone();
        if let Some(button) = button {
            if let Some(name) = &button.name {
                pairs.push((name.clone(), button.value.clone()));
            }
        }
        pairs
    }

    fn parse(el: ElementRef, base: &Url) -> Result<Form> {
        let action = match el.value().attr("action").filter(|a| !a.is_empty()) {
            Some(action) => base.join(action)?,
            None => base.clone(),
        };
        let mut form = Form {
            name: el.value().attr("name").map(str::to_string),
            action,
            method: el
                .value()
                .attr("method")
                .map(|m| m.to_ascii_uppercase())
                .unwrap_or_else(|| "GET".to_string()),
            fields: Vec::new(),
            buttons: Vec::new(),
            radios: Vec::new(),
        };
        for input in el.select(&INPUT_SEL) {
            let name = input.value().attr("name").map(str::to_string);
            let value = input.value().attr("value").unwrap_or_default().to_string();
            match input.value().attr("type").unwrap_or("text").to_ascii_lowercase().as_str() {
                "submit" | "button" | "image" => form.buttons.push(SubmitButton { name, value }),
                "radio" => {
                    if let Some(name) = name {
                        let label = input
                            .parent()
                            .and_then(following_sibling_text)
                            .unwrap_or_default();
                        form.radios.push(RadioButton { name, value, label });
                    }
                }
                "checkbox" => {
                    // only checked boxes would submit; none of the flows here use them
                }
                _ => {
                    if let Some(name) = name {
                        form.fields.push((name, value));
                    }
                }
            }
        }
        Ok(form)
    }
}

/// An immutable snapshot of one fetched page: final URL, raw body, parsed
/// markup and the forms found in it.
#[derive(Debug)]
pub struct Document {
    url: Url,
    body: String,
    html: Html,
    forms: Vec<Form>,
}

impl Document {
    pub fn parse(url: Url, body: &str) -> Result<Document> {
        let html = Html::parse_document(body);
        let mut forms = Vec::new();
        for el in html.select(&FORM_SEL) {
            forms.push(Form::parse(el, &url)?);
        }
        Ok(Document {
            url,
            body: body.to_string(),
            html,
            forms,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    /// The first form on the page, which on ePathway is the one that matters.
    pub fn form(&self) -> Option<&Form> {
        self.forms.first()
    }

    pub fn form_named(&self, name: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// Href of the first anchor whose visible text is exactly `text`.
    pub fn link_href_with_text(&self, text: &str) -> Option<&str> {
        self.html
            .select(&ANCHOR_SEL)
            .find(|a| normalized_text(*a) == text)
            .and_then(|a| a.value().attr("href"))
    }

    /// Text of the element next to the first `span` containing `label`.
    /// This is how ePathway detail pages lay out label/value pairs.
    pub fn labeled_field(&self, label: &str) -> Option<String> {
        static SPAN_SEL: Lazy<Selector> =
            Lazy::new(|| Selector::parse("span").expect("selector should parse"));
        self.html
            .select(&SPAN_SEL)
            .find(|s| normalized_text(*s).contains(label))
            .and_then(|s| following_sibling_text(*s))
            .filter(|v| !v.is_empty())
    }
}

/// The transport seam. One implementation talks HTTP with a cookie jar; the
/// tests substitute an in-memory fake. Cookies must persist across calls
/// within one run because ePathway result listings only exist in-session.
pub trait WebClient {
    fn get(&self, url: &Url) -> Result<Document>;
    fn get_with_referrer(&self, url: &Url, referrer: &Url) -> Result<Document>;
    fn submit(&self, form: &Form, button: Option<&SubmitButton>) -> Result<Document>;
}

/// Production client backed by `reqwest::blocking` with a cookie store.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<HttpClient> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(HttpClient { client })
    }

    fn document(&self, response: reqwest::blocking::Response) -> Result<Document> {
        let response = response.error_for_status()?;
        let url = response.url().clone();
        let body = response.text()?;
        Document::parse(url, &body)
    }
}

impl WebClient for HttpClient {
    fn get(&self, url: &Url) -> Result<Document> {
        debug!(%url, "GET");
        self.document(self.client.get(url.as_str()).send()?)
    }

    fn get_with_referrer(&self, url: &Url, referrer: &Url) -> Result<Document> {
        debug!(%url, %referrer, "GET with referrer");
        self.document(
            self.client
                .get(url.as_str())
                .header(REFERER, referrer.as_str())
                .send()?,
        )
    }

    fn submit(&self, form: &Form, button: Option<&SubmitButton>) -> Result<Document> {
        let pairs = form.submission(button);
        debug!(action = %form.action, fields = pairs.len(), "submit");
        let request = if form.method == "POST" {
            self.client.post(form.action.as_str()).form(&pairs)
        } else {
            self.client.get(form.action.as_str()).query(&pairs)
        };
        self.document(request.send()?)
    }
}
