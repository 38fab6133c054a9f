//! Archive directory scraping.
//!
//! Each elevation angle has its own HTTP directory listing on the archive.
//! The scraper pulls the listing page, walks its anchor tags, and turns
//! every compressed scan file into a typed entry keyed by scan time.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{self, StreamExt};
use radar_common::{ElevationAngle, ScanTime};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;

// The archive 403s clients without a browser-ish User-Agent, on file
// downloads as much as on listing pages.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// One downloadable scan file discovered on the archive.
#[derive(Debug, Clone)]
pub struct RemoteFileEntry {
    pub filename: String,
    pub url: String,
    pub scan_time: ScanTime,
    pub elevation: ElevationAngle,
    /// Approximate size from the listing page, when present.
    pub size: Option<u64>,
}

/// Scraper for per-elevation archive listings.
pub struct ArchiveScraper {
    client: Client,
    config: Arc<UpdaterConfig>,
}

impl ArchiveScraper {
    pub fn new(config: Arc<UpdaterConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.download_timeout())
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// List available scan files for one elevation, newest first.
    ///
    /// A timeout or non-success status is an error the caller treats as
    /// "no data this cycle" for this elevation.
    pub async fn list_elevation(&self, angle: ElevationAngle) -> Result<Vec<RemoteFileEntry>> {
        let url = self.config.listing_url(angle);
        debug!(url = %url, elevation = %angle, "Fetching file listing");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Listing request failed")?;

        if !response.status().is_success() {
            bail!("Listing request to {} returned {}", url, response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read listing body")?;

        let mut entries = parse_listing(&html, &url, angle);
        // Newest first; sort is stable so listing order breaks ties.
        entries.sort_by(|a, b| b.scan_time.cmp(&a.scan_time));

        info!(
            elevation = %angle,
            count = entries.len(),
            "Listed archive scan files"
        );
        Ok(entries)
    }

    /// List all configured elevations concurrently.
    ///
    /// One angle failing does not block the others; it just maps to an
    /// empty listing.
    pub async fn list_all(&self) -> BTreeMap<ElevationAngle, Vec<RemoteFileEntry>> {
        let angles = self.config.angles();

        let results = stream::iter(angles.iter().copied())
            .map(|angle| async move { (angle, self.list_elevation(angle).await) })
            .buffer_unordered(angles.len().max(1))
            .collect::<Vec<_>>()
            .await;

        let mut listings = BTreeMap::new();
        for (angle, result) in results {
            match result {
                Ok(entries) => {
                    listings.insert(angle, entries);
                }
                Err(e) => {
                    warn!(elevation = %angle, error = %e, "Failed to list elevation");
                    listings.insert(angle, Vec::new());
                }
            }
        }
        listings
    }
}

/// Extract scan-file entries from a directory-listing page.
///
/// Tolerant anchor scan rather than a full HTML parse: archive listings
/// are machine-generated and only the `href` values matter. Entries whose
/// filename carries no parseable scan time are dropped.
pub fn parse_listing(
    html: &str,
    listing_url: &str,
    elevation: ElevationAngle,
) -> Vec<RemoteFileEntry> {
    let mut entries = Vec::new();
    let mut rest = html;

    while let Some(pos) = rest.find("href=\"") {
        rest = &rest[pos + 6..];
        let Some(end) = rest.find('"') else { break };
        let href = &rest[..end];
        rest = &rest[end..];

        if !href.ends_with(".grib2.gz") || href.contains("latest") {
            continue;
        }

        let raw_name = href.rsplit('/').next().unwrap_or(href);
        let filename = percent_decode(raw_name);
        let Some(scan_time) = ScanTime::from_filename(&filename) else {
            debug!(filename = %filename, "Skipping entry without parseable scan time");
            continue;
        };

        let url = if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!(
                "{}/{}",
                listing_url.trim_end_matches('/'),
                href.trim_start_matches('/')
            )
        };

        entries.push(RemoteFileEntry {
            filename,
            url,
            scan_time,
            elevation,
            size: size_after_anchor(rest),
        });
    }

    entries
}

/// Parse the approximate size column that fancy-index listings print after
/// the anchor, e.g. `</a> 07-Nov-2025 20:01  1.2M`.
fn size_after_anchor(rest: &str) -> Option<u64> {
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let line = &rest[..line_end];
    let after_anchor = line.split("</a>").nth(1)?;
    let token = after_anchor.split_whitespace().last()?;
    parse_size_token(token)
}

fn parse_size_token(token: &str) -> Option<u64> {
    if let Ok(bytes) = token.parse::<u64>() {
        return Some(bytes);
    }
    let (number, unit) = token.split_at(token.len().checked_sub(1)?);
    let value: f64 = number.parse().ok()?;
    let factor = match unit {
        "K" | "k" => 1024.0,
        "M" => 1024.0 * 1024.0,
        "G" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * factor) as u64)
}

/// Decode %XX escapes in listing hrefs.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            if let Ok(value) = u8::from_str_radix(&s[i + 1..i + 3], 16) {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
