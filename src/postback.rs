// src/postback.rs
//
// ePathway pages trigger navigation through client-side script expressions
// embedded in link hrefs. We don't run any script; instead the two known
// expression shapes are parsed by exact token extraction and replayed as
// ordinary form posts. Keeping the regexes here means site-format drift only
// ever touches this module.

use once_cell::sync::Lazy;
use regex::Regex;

/// The target/argument pair an ASP.NET postback expression carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Postback {
    pub target: String,
    pub argument: String,
}

static DO_POSTBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"javascript:__doPostBack\('(.*)','(.*)'\)").expect("regex should parse")
});

// The second quoted token of a PostBackOptions expression is the address the
// form has to post to, not an event argument.
static POSTBACK_OPTIONS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"javascript:WebForm_DoPostBackWithOptions\(new WebForm_PostBackOptions\("([^"]*)", "", false, "", "([^"]*)", false, true\)\)"#,
    )
    .expect("regex should parse")
});

/// Parse a `javascript:__doPostBack('TARGET','ARGUMENT')` href, the shape
/// used by the search-tab links.
pub fn parse_do_postback(href: &str) -> Option<Postback> {
    DO_POSTBACK_RE.captures(href).map(|caps| Postback {
        target: caps[1].to_string(),
        argument: caps[2].to_string(),
    })
}

/// Parse a `WebForm_DoPostBackWithOptions(new WebForm_PostBackOptions(...))`
/// href, the shape used by the page-number links. `argument` holds the
/// posting address.
pub fn parse_postback_options(href: &str) -> Option<Postback> {
    POSTBACK_OPTIONS_RE.captures(href).map(|caps| Postback {
        target: caps[1].to_string(),
        argument: caps[2].to_string(),
    })
}
