//! # yokogaki
//!
//! Repairs machine-translated EPUB files that were typeset for vertical
//! (top-to-bottom, right-to-left) Japanese text but are being read as
//! horizontal text.
//!
//! A fix pass rewrites inline `style` attributes and stylesheets to force
//! `writing-mode: horizontal-tb`, injects an override stylesheet with a
//! CJK-capable font fallback, flips a right-to-left spine to left-to-right,
//! and repairs navigation points that lack identifiers. Everything else in
//! the package is preserved byte-for-byte: the `mimetype` entry stays
//! first and uncompressed, and entries keep their archive order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::{Path, PathBuf};
//! use yokogaki::{fix_batch, fix_file};
//!
//! // Fix one book into a new file.
//! let ok = fix_file(Path::new("vertical.epub"), Some(Path::new("fixed.epub")));
//! assert!(ok);
//!
//! // Fix a batch in place; failures are collected, not raised.
//! let inputs = vec![PathBuf::from("a.epub"), PathBuf::from("b.epub")];
//! let report = fix_batch(&inputs, None);
//! println!("{}/{} fixed", report.succeeded, report.total);
//! ```
//!
//! ## Working with packages directly
//!
//! The [`Book`] struct models one package: every archive entry in order,
//! classified by kind, plus the parsed navigation tree.
//!
//! ```no_run
//! use yokogaki::{read_epub, ResourceKind};
//!
//! let book = read_epub("book.epub")?;
//! let documents = book
//!     .entries
//!     .iter()
//!     .filter(|e| e.kind == ResourceKind::Document)
//!     .count();
//! println!("{documents} content documents");
//! # Ok::<(), yokogaki::Error>(())
//! ```

pub mod book;
pub mod epub;
pub mod error;
pub mod fix;
pub mod transform;
pub(crate) mod util;

pub use book::{Book, ResourceEntry, ResourceKind, TocLink, TocNode};
pub use epub::{read_epub, write_epub};
pub use error::{Error, Result};
pub use fix::{BatchReport, fix_batch, fix_batch_with, fix_file};
