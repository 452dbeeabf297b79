//! Line-oriented bibliography parsing.
//!
//! Each entry is one line of the form `[KEY] Authors. Title. Publication`.
//! Lines that do not match are skipped, not rejected.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::error::BibliographyError;

/// Number of authors shown as "main authors".
pub const MAIN_AUTHOR_LIMIT: usize = 3;

#[allow(clippy::expect_used)]
static ENTRY_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\]]+)\]\s*(.*?[\w?)]{2})\.\s*(.*?)\.\s*(.*)$")
        .expect("entry line regex is valid")
});

#[allow(clippy::expect_used)]
static AUTHOR_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",(?:\s*and)?\s*|\s+and\s+").expect("author separator regex is valid")
});

#[allow(clippy::expect_used)]
static DIGIT_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit run regex is valid"));

/// One parsed bibliography entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    key: String,
    authors: Vec<String>,
    title: String,
    publication: String,
}

impl BibEntry {
    /// Creates an entry from its parts; `authors` is the raw author list.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        authors: &str,
        title: impl Into<String>,
        publication: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            authors: split_authors(authors),
            title: title.into(),
            publication: publication.into(),
        }
    }

    /// Parses a single line; `None` when the line is not an entry.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let caps = ENTRY_LINE_RE.captures(line.trim())?;
        let key = caps.get(1)?.as_str().trim();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(
            key,
            caps.get(2)?.as_str(),
            caps.get(3)?.as_str().trim(),
            caps.get(4)?.as_str().trim(),
        ))
    }

    /// Unique key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Authors in citation order.
    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Title, used as the search phrase.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Publication details (venue, publisher, year).
    #[must_use]
    pub fn publication(&self) -> &str {
        &self.publication
    }

    /// The last standalone four-digit number in the publication string.
    #[must_use]
    pub fn year(&self) -> Option<&str> {
        DIGIT_RUN_RE
            .find_iter(&self.publication)
            .filter(|m| m.as_str().len() == 4)
            .last()
            .map(|m| m.as_str())
    }

    /// The first `limit` authors joined with `", "`; `None` without authors.
    #[must_use]
    pub fn main_authors(&self, limit: usize) -> Option<String> {
        (!self.authors.is_empty()).then(|| {
            self.authors
                .iter()
                .take(limit)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
    }
}

fn split_authors(raw: &str) -> Vec<String> {
    AUTHOR_SEPARATOR_RE
        .split(raw.trim())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome counts of a parse pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Entries added or replaced.
    pub parsed: usize,
    /// Non-empty lines that did not match the entry format.
    pub skipped: usize,
    /// Keys that replaced an earlier entry.
    pub duplicates: Vec<String>,
}

/// Entries keyed by unique key, in first-seen order.
///
/// A duplicate key replaces the earlier entry in place and is reported.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: Vec<BibEntry>,
    index: HashMap<String, usize>,
}

impl Bibliography {
    /// Creates an empty bibliography.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses entries from text and merges them in.
    pub fn parse_str(&mut self, text: &str) -> ParseReport {
        let mut report = ParseReport::default();
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let Some(entry) = BibEntry::parse_line(line) else {
                debug!(line, "skipping non-entry line");
                report.skipped += 1;
                continue;
            };
            if self.insert(entry.clone()) {
                warn!(key = entry.key(), "duplicate bibliography key; keeping the later entry");
                report.duplicates.push(entry.key().to_string());
            }
            report.parsed += 1;
        }
        report
    }

    /// Reads and parses a UTF-8 bibliography file.
    ///
    /// # Errors
    ///
    /// Returns [`BibliographyError`] when the file cannot be read or decoded.
    pub fn load_file(&mut self, path: &Path) -> Result<ParseReport, BibliographyError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| BibliographyError::read(path, e))?;
        let report = self.parse_str(&text);
        debug!(
            path = %path.display(),
            parsed = report.parsed,
            skipped = report.skipped,
            "loaded bibliography"
        );
        Ok(report)
    }

    /// Inserts an entry; returns true when it replaced one with the same key.
    pub fn insert(&mut self, entry: BibEntry) -> bool {
        if let Some(&position) = self.index.get(entry.key()) {
            self.entries[position] = entry;
            true
        } else {
            self.index.insert(entry.key().to_string(), self.entries.len());
            self.entries.push(entry);
            false
        }
    }

    /// Looks up an entry by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.index.get(key).map(|&position| &self.entries[position])
    }

    /// All entries in collection order.
    #[must_use]
    pub fn entries(&self) -> &[BibEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true without entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    const SICP: &str = "[SICP] Harold Abelson, Gerald Jay Sussman. Structure and Interpretation of Computer Programs. MIT Press, 1996.";

    #[test]
    fn test_parse_line_sicp() {
        let entry = BibEntry::parse_line(SICP).unwrap();
        assert_eq!(entry.key(), "SICP");
        assert_eq!(entry.authors(), ["Harold Abelson", "Gerald Jay Sussman"]);
        assert_eq!(entry.title(), "Structure and Interpretation of Computer Programs");
        assert_eq!(entry.publication(), "MIT Press, 1996.");
        assert_eq!(entry.year(), Some("1996"));
    }

    #[test]
    fn test_parse_line_keeps_initials_in_authors() {
        let entry = BibEntry::parse_line(
            "[Knuth84] D. E. Knuth. Literate Programming. The Computer Journal 27(2), 1984.",
        )
        .unwrap();
        assert_eq!(entry.authors(), ["D. E. Knuth"]);
        assert_eq!(entry.title(), "Literate Programming");
        assert_eq!(entry.year(), Some("1984"));
    }

    #[test]
    fn test_parse_line_rejects_non_entries() {
        assert!(BibEntry::parse_line("References").is_none());
        assert!(BibEntry::parse_line("[] Nobody. Nothing. Nowhere.").is_none());
    }

    #[test]
    fn test_year_is_last_standalone_four_digit_number() {
        let entry = BibEntry::new("k", "A Author", "T", "Proc. 12345 Conf, pp. 1990-2003");
        assert_eq!(entry.year(), Some("2003"));
        let no_year = BibEntry::new("k", "A Author", "T", "Tech report 123");
        assert_eq!(no_year.year(), None);
    }

    #[test]
    fn test_main_authors_limits_and_splits_on_and() {
        let entry = BibEntry::new("k", "Alice A, Bob B, and Carol C and Dave D", "T", "P");
        assert_eq!(entry.authors().len(), 4);
        assert_eq!(
            entry.main_authors(MAIN_AUTHOR_LIMIT).unwrap(),
            "Alice A, Bob B, Carol C"
        );
    }

    #[test]
    fn test_parse_str_counts_and_duplicates() {
        let mut bib = Bibliography::new();
        let text = format!(
            "\n{SICP}\nnot an entry\n[SICP] H. Abelson, G. Sussman. SICP Second Edition. MIT Press, 1996.\n"
        );
        let report = bib.parse_str(&text);
        assert_eq!(report.parsed, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.duplicates, ["SICP"]);
        assert_eq!(bib.len(), 1);
        assert_eq!(bib.get("SICP").unwrap().title(), "SICP Second Edition");
    }

    #[test]
    fn test_parse_str_preserves_first_seen_order() {
        let mut bib = Bibliography::new();
        bib.parse_str(
            "[B] Bob Builder. Second Title. Pub, 2001.\n[A] Ann Author. First Title. Pub, 2000.\n[B] Bob Builder. Replaced Title. Pub, 2002.",
        );
        let keys: Vec<&str> = bib.entries().iter().map(BibEntry::key).collect();
        assert_eq!(keys, ["B", "A"]);
    }

    #[test]
    fn test_load_file_reads_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[Gödel31] Kurt Gödel. Über formal unentscheidbare Sätze. Monatshefte, 1931.").unwrap();
        let mut bib = Bibliography::new();
        let report = bib.load_file(file.path()).unwrap();
        assert_eq!(report.parsed, 1);
        assert_eq!(bib.get("Gödel31").unwrap().year(), Some("1931"));
    }

    #[test]
    fn test_load_file_missing_path() {
        let mut bib = Bibliography::new();
        let err = bib
            .load_file(Path::new("/definitely/not/here/refs.txt"))
            .unwrap_err();
        assert!(matches!(err, BibliographyError::Read { .. }));
        bib.clear();
        assert!(bib.is_empty());
    }
}
