//! Bibliography input parsing.
//!
//! A bibliography is a plain UTF-8 text file with one entry per line:
//!
//! ```text
//! [SICP] Harold Abelson, Gerald Jay Sussman. Structure and Interpretation of Computer Programs. MIT Press, 1996.
//! ```
//!
//! # Example
//!
//! ```
//! use bibdl_core::parser::Bibliography;
//!
//! let mut bib = Bibliography::new();
//! let report = bib.parse_str(
//!     "[SICP] Harold Abelson, Gerald Jay Sussman. Structure and Interpretation of Computer Programs. MIT Press, 1996.",
//! );
//! assert_eq!(report.parsed, 1);
//! assert_eq!(bib.get("SICP").and_then(|e| e.year()), Some("1996"));
//! ```

mod bibliography;
mod error;

pub use bibliography::{BibEntry, Bibliography, MAIN_AUTHOR_LIMIT, ParseReport};
pub use error::BibliographyError;
