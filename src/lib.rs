// src/lib.rs
//
// Scraper for the ~20 Australian council "ePathway" development-application
// portals: one shared web framework, twenty different wordings. The crate
// navigates each site's multi-step search workflow and extracts a normalised
// record per application.

pub mod authorities;
pub mod client;
pub mod error;
pub mod fields;
pub mod page;
pub mod postback;
pub mod scraper;
pub mod table;

pub use client::{Document, Form, HttpClient, WebClient};
pub use error::{Result, ScrapeError};
pub use fields::Record;
pub use scraper::{ListMode, Pagination, ScrapeOptions, Scraper};
