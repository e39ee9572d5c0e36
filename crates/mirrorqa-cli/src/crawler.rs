//! Fetches and parses the upstream mirror listing for `update-mirrors`.
//!
//! The page is an HTML table; each data row names one mirror host and its
//! country via a flag image whose alt/sibling text gives the country name.

use mirrorqa_core::models::CrawledMirror;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("network error while fetching mirrors from {0}")]
    Request(String),
    #[error("unable to parse mirrors information from {0}")]
    Extract(String),
}

pub struct CrawlConfig {
    pub mirrors_url: String,
    pub excluded_hostnames: BTreeSet<String>,
    pub timeout: std::time::Duration,
}

pub async fn fetch_current_mirrors(config: &CrawlConfig) -> Result<Vec<CrawledMirror>, CrawlError> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| CrawlError::Request(e.to_string()))?;

    let body = client
        .get(&config.mirrors_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|_| CrawlError::Request(config.mirrors_url.clone()))?
        .text()
        .await
        .map_err(|_| CrawlError::Request(config.mirrors_url.clone()))?;

    parse_mirrors(&body, config).map_err(|_| CrawlError::Extract(config.mirrors_url.clone()))
}

fn parse_mirrors(html: &str, config: &CrawlConfig) -> Result<Vec<CrawledMirror>, ()> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tbody tr").map_err(|_| ())?;
    let link_selector = Selector::parse("a").map_err(|_| ())?;
    let img_selector = Selector::parse("img").map_err(|_| ())?;
    let newregion_selector = Selector::parse("td.newregion").map_err(|_| ())?;

    if document.select(&row_selector).next().is_none() {
        return Err(());
    }

    let mut mirrors = Vec::new();
    for row in document.select(&row_selector) {
        if row.select(&newregion_selector).next().is_some() {
            continue;
        }

        let Some(http_link) = row
            .select(&link_selector)
            .find(|a| a.text().collect::<String>().trim() == "HTTP")
        else {
            continue;
        };
        let Some(base_url) = http_link.value().attr("href") else {
            continue;
        };

        let Ok(parsed) = url::Url::parse(base_url) else {
            continue;
        };
        let Some(hostname) = parsed.host_str() else {
            continue;
        };
        if config.excluded_hostnames.contains(hostname) {
            continue;
        }

        let Some(img) = row.select(&img_selector).next() else {
            continue;
        };
        let country_name = img
            .next_sibling()
            .and_then(|n| n.value().as_text().map(|t| t.trim().to_string()))
            .unwrap_or_default();
        if country_name.is_empty() {
            continue;
        }

        let Some(country) = mirrorqa_core::iso_countries::COUNTRIES
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&country_name))
        else {
            tracing::warn!(country = %country_name, "could not resolve country for mirror");
            continue;
        };

        mirrors.push(CrawledMirror {
            id: hostname.to_string(),
            base_url: base_url.to_string(),
            country_code: Some(country.code.to_string()),
            region_code: None,
            asn: None,
            score: None,
            latitude: None,
            longitude: None,
            country_only: false,
            region_only: false,
            as_only: false,
            other_countries: BTreeSet::new(),
        });
    }

    Ok(mirrors)
}
