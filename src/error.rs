use thiserror::Error;

/// Everything that can go wrong while navigating or extracting. All of these
/// are fatal for the current run: a site variant we don't recognise should
/// stop the scrape rather than silently produce a wrong or partial dataset.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("expected page structure missing: {0}")]
    Structure(String),

    #[error("couldn't find a radio button for the {wanted} list; labels on page: {labels:?}")]
    OptionNotFound { wanted: String, labels: Vec<String> },

    #[error("expected form control not found: {0}")]
    ControlNotFound(String),

    #[error("no search tab matched any known label")]
    TabNotFound,

    #[error("link isn't a postback link: {0}")]
    PostbackLink(String),

    #[error("pagination link isn't a postback link: {0}")]
    PaginationLink(String),

    #[error("date {value:?} doesn't match the day/month/year format")]
    DateFormat { value: String },

    #[error("couldn't find the address table on the detail page")]
    AddressTableNotFound,

    #[error("couldn't find the primary location row on the detail page")]
    PrimaryLocationNotFound,

    #[error("application record is missing required fields: {0}")]
    IncompleteRecord(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
