// src/authorities.rs
//
// The known ePathway deployments and how to drive each one. Kept as data so
// supporting a new council is an entry here (or in a YAML file passed at run
// time), not code.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::scraper::{ListMode, Pagination, ScrapeOptions};

/// One council's deployment: where it lives and which quirks apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authority {
    #[serde(skip)]
    pub name: String,
    pub url: String,
    pub state: String,
    pub list: ListMode,
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub max_pages: Option<u32>,
    #[serde(default)]
    pub force_detail: bool,
    #[serde(default)]
    pub strip_building_name: bool,
}

impl Authority {
    pub fn options(&self) -> ScrapeOptions {
        ScrapeOptions {
            list_mode: self.list,
            pagination: self.pagination,
            max_pages: self.max_pages,
            force_detail: self.force_detail,
            strip_building_name: self.strip_building_name,
            state: self.state.clone(),
        }
    }
}

fn from_map(map: BTreeMap<String, Authority>) -> Vec<Authority> {
    map.into_iter()
        .map(|(name, mut authority)| {
            authority.name = name;
            authority
        })
        .collect()
}

/// Load an authority table from a YAML file with the same shape as the
/// built-in one (mapping of name → settings).
pub fn load_file(path: &Path) -> anyhow::Result<Vec<Authority>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading authorities file {}", path.display()))?;
    let map: BTreeMap<String, Authority> = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing authorities file {}", path.display()))?;
    Ok(from_map(map))
}

static BUILTIN_YAML: &str = r#"
adelaide:
  url: https://epathway.adelaidecitycouncil.com/epathway/ePathwayProd
  state: SA
  list: all_this_year
ballarat:
  url: https://eservices.ballarat.vic.gov.au/ePathway/Production
  state: VIC
  list: advertising
barossa:
  url: https://epayments.barossa.sa.gov.au/ePathway/Production
  state: SA
  list: last_30_days
  force_detail: true
campbelltown:
  url: https://ebiz.campbelltown.nsw.gov.au/ePathway/Production
  state: NSW
  list: all
darebin:
  url: https://eservices.darebin.vic.gov.au/ePathway/Production
  state: VIC
  list: all_this_year
glen_eira:
  url: https://epathway-web.gleneira.vic.gov.au/ePathway/Production
  state: VIC
  list: all
  max_pages: 4
gold_coast:
  url: https://cogc.cloud.infor.com/ePathway/epthprod
  state: QLD
  list: advertising
greatlakes:
  url: https://services.greatlakes.nsw.gov.au/ePathway/Production
  state: NSW
  list: all
  max_pages: 10
inverell:
  url: http://203.49.140.77/ePathway/Production
  state: NSW
  list: all_this_year
kingston:
  url: https://online.kingston.vic.gov.au/ePathway/Production
  state: VIC
  list: all_this_year
knox:
  url: https://eservices.knox.vic.gov.au/ePathway/Production
  state: VIC
  list: advertising
monash:
  url: https://epathway.monash.vic.gov.au/ePathway/Production
  state: VIC
  list: advertising
moreland:
  url: https://eservices.moreland.vic.gov.au/ePathway/Production
  state: VIC
  list: advertising
nillumbik:
  url: https://epathway.nillumbik.vic.gov.au/ePathway/Production
  state: VIC
  list: advertising
onkaparinga:
  url: http://pathway.onkaparinga.sa.gov.au/ePathway/Production
  state: SA
  list: all_this_year
salisbury:
  url: https://eservices.salisbury.sa.gov.au/ePathway/Production
  state: SA
  list: last_30_days
south_gippsland:
  url: https://eservices.southgippsland.vic.gov.au/ePathway/ePathProd
  state: VIC
  list: advertising
the_hills:
  url: https://epathway.thehills.nsw.gov.au/ePathway/Production
  state: NSW
  list: last_30_days
unley:
  url: https://online.unley.sa.gov.au/ePathway/Production
  state: SA
  list: last_30_days
west_torrens:
  url: https://epathway.wtcc.sa.gov.au/ePathway/Production
  state: SA
  list: last_30_days
wollongong:
  url: http://epathway.wollongong.nsw.gov.au/ePathway/Production
  state: NSW
  list: advertising
yarra_ranges:
  url: https://epathway.yarraranges.vic.gov.au/ePathway/Production
  state: VIC
  list: all
  max_pages: 20
"#;

static BUILTIN: Lazy<Vec<Authority>> = Lazy::new(|| {
    let map: BTreeMap<String, Authority> =
        serde_yaml::from_str(BUILTIN_YAML).expect("built-in authority table should parse");
    from_map(map)
});

/// Every authority the crate knows how to scrape.
pub fn all() -> &'static [Authority] {
    &BUILTIN
}

pub fn find(name: &str) -> Option<&'static Authority> {
    BUILTIN.iter().find(|a| a.name == name)
}
