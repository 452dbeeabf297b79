//! Extraction of result records from Scholar result pages.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::ResultRecord;

#[allow(clippy::expect_used)]
static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.gs_r").expect("result selector is valid"));

#[allow(clippy::expect_used)]
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.gs_rt").expect("title selector is valid"));

#[allow(clippy::expect_used)]
static TITLE_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.gs_rt a[href]").expect("title link selector is valid"));

#[allow(clippy::expect_used)]
static PDF_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.gs_ggs a[href]").expect("pdf link selector is valid"));

#[allow(clippy::expect_used)]
static AUTHOR_LINE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.gs_a").expect("author line selector is valid"));

#[allow(clippy::expect_used)]
static FOOTER_LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.gs_fl a[href]").expect("footer link selector is valid"));

#[allow(clippy::expect_used)]
static TITLE_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\s*\[[A-Z]+\]\s*)+").expect("title tag regex is valid")
});

#[allow(clippy::expect_used)]
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:18|19|20)\d{2}\b").expect("year regex is valid"));

#[allow(clippy::expect_used)]
static CLUSTER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]cluster=(\d+)").expect("cluster regex is valid"));

/// Markers that only appear on captcha / unusual-traffic pages.
const BLOCK_MARKERS: &[&str] = &[
    "gs_captcha_ccl",
    "id=\"recaptcha\"",
    "not a robot",
    "unusual traffic from your computer",
];

/// Returns the block marker found in `html`, if any.
pub(crate) fn find_block_marker(html: &str) -> Option<&'static str> {
    let lowered = html.to_ascii_lowercase();
    BLOCK_MARKERS
        .iter()
        .copied()
        .find(|marker| lowered.contains(&marker.to_ascii_lowercase()))
}

/// Parses all result records from a result page, in page order.
///
/// Blocks without a title heading (author profiles, notices) are skipped.
pub(crate) fn parse_results_page(html: &str, base_url: &Url) -> Vec<ResultRecord> {
    let document = Html::parse_document(html);
    let records: Vec<ResultRecord> = document
        .select(&RESULT_SELECTOR)
        .filter_map(|block| parse_result_block(block, base_url))
        .collect();
    debug!(count = records.len(), "extracted result records");
    records
}

fn parse_result_block(block: ElementRef<'_>, base_url: &Url) -> Option<ResultRecord> {
    let heading = block.select(&TITLE_SELECTOR).next()?;
    let title = clean_title(&collect_text(heading));
    if title.is_empty() {
        return None;
    }

    let mut record = ResultRecord::new(title);

    if let Some(url) = block
        .select(&TITLE_LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| absolutize_url(href, base_url))
    {
        record = record.with_url(url);
    }

    if let Some(pdf_url) = block
        .select(&PDF_LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| absolutize_url(href, base_url))
    {
        record = record.with_pdf_url(pdf_url);
    }

    if let Some(year) = block
        .select(&AUTHOR_LINE_SELECTOR)
        .next()
        .and_then(|line| extract_year(&collect_text(line)))
    {
        record = record.with_year(year);
    }

    if let Some(cluster_id) = block
        .select(&FOOTER_LINK_SELECTOR)
        .filter_map(|link| link.value().attr("href"))
        .find_map(extract_cluster_id)
    {
        record = record.with_cluster_id(cluster_id);
    }

    Some(record)
}

fn collect_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strips leading `[PDF]`, `[BOOK]`, `[CITATION]` style tags from a title.
fn clean_title(raw: &str) -> String {
    TITLE_TAG_PATTERN.replace(raw, "").trim().to_string()
}

/// Returns the last year-like token of an author line (`A Author - Venue, 1996 - host`).
fn extract_year(author_line: &str) -> Option<String> {
    YEAR_PATTERN
        .find_iter(author_line)
        .last()
        .map(|m| m.as_str().to_string())
}

fn extract_cluster_id(href: &str) -> Option<String> {
    CLUSTER_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolves a possibly relative href against the page URL.
fn absolutize_url(value: &str, base_url: &Url) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.starts_with("javascript:") {
        return None;
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        return Some(value.to_string());
    }
    if value.starts_with("//") {
        return Some(format!("https:{value}"));
    }
    base_url.join(value).ok().map(|url| url.to_string())
}
