// src/page/mod.rs
//
// One module per kind of screen in the ePathway workflow. Screens that only
// exist on some deployments (the list chooser, the search trigger) expose an
// applicability check and pass the document through untouched when absent.

pub mod detail;
pub mod index;
pub mod list_select;
pub mod search;
