//! Radar archive updater: scraping, multi-elevation downloads, dedup
//! tracking, cache eviction, and refresh scheduling.

pub mod config;
pub mod download;
pub mod janitor;
pub mod ledger;
pub mod scheduler;
pub mod scrape;
