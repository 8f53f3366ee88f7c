//! The per-file repair transaction and the batch driver.
//!
//! A fix never propagates an error past its boundary: every failure is
//! logged with the offending path and folded into a success flag, so one
//! broken book cannot abort a batch.

pub mod opf;
pub mod toc;

use std::path::{Path, PathBuf};

use crate::book::{Book, ResourceKind};
use crate::epub::{read_epub, write_epub_to_writer};
use crate::error::Result;
use crate::transform::{self, css, html};
use crate::util::strip_bom;

pub use toc::repair_toc_ids;

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    /// Inputs that failed, in input order.
    pub failed: Vec<PathBuf>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Repair one EPUB.
///
/// `output` defaults to overwriting the input. The repaired package is
/// staged to a temporary file next to the destination and renamed into
/// place only after a fully successful serialize, so a failure leaves the
/// original untouched.
///
/// Returns `true` on success. Failures are logged, never raised.
pub fn fix_file(input: &Path, output: Option<&Path>) -> bool {
    match try_fix(input, output) {
        Ok(()) => true,
        Err(e) => {
            log::error!("failed to fix {}: {}", input.display(), e);
            false
        }
    }
}

/// Repair every input independently.
///
/// With an output directory, each fixed book keeps its file name there;
/// without one, inputs are overwritten in place. One failure does not
/// stop the rest.
pub fn fix_batch(inputs: &[PathBuf], output_dir: Option<&Path>) -> BatchReport {
    fix_batch_with(inputs, output_dir, |_, _, _| {})
}

/// [`fix_batch`] with a progress observer.
///
/// The callback fires before each file with `(path, done, total)`, where
/// `done` counts files already processed.
pub fn fix_batch_with<F>(inputs: &[PathBuf], output_dir: Option<&Path>, mut progress: F) -> BatchReport
where
    F: FnMut(&Path, usize, usize),
{
    let total = inputs.len();
    let mut report = BatchReport {
        total,
        ..Default::default()
    };

    for (done, input) in inputs.iter().enumerate() {
        progress(input, done, total);

        let output = output_dir.map(|dir| match input.file_name() {
            Some(name) => dir.join(name),
            None => dir.join(input),
        });

        if fix_file(input, output.as_deref()) {
            report.succeeded += 1;
        } else {
            report.failed.push(input.clone());
        }
    }

    report
}

fn try_fix(input: &Path, output: Option<&Path>) -> Result<()> {
    let mut book = read_epub(input)?;

    // Rewrite documents and stylesheets in place. A document that cannot
    // be parsed keeps its original bytes; that is never fatal.
    for entry in &mut book.entries {
        if entry.data.is_empty() {
            continue;
        }
        match entry.kind {
            ResourceKind::Document => match html::rewrite_document(&entry.data) {
                Ok(data) => entry.data = data,
                Err(e) => {
                    log::warn!("markup in {} left unmodified: {}", entry.path, e);
                }
            },
            ResourceKind::Stylesheet => {
                // The override sheet injected by an earlier pass must not
                // be rewritten, or its text-orientation rule gets
                // commented out.
                if !entry.path.ends_with(transform::OVERRIDE_CSS_NAME) {
                    entry.data = css::rewrite_stylesheet(&entry.data);
                }
            }
            _ => {}
        }
    }

    // One shared override stylesheet per package, next to the OPF.
    let css_path = override_css_path(&book);
    let added_css = if book.has_entry(&css_path) {
        false
    } else {
        book.add_entry(
            css_path,
            transform::OVERRIDE_CSS.as_bytes().to_vec(),
            ResourceKind::Stylesheet,
        );
        true
    };

    toc::repair_toc_ids(&mut book.toc);

    if let Some(opf_path) = book.opf_path.clone() {
        let register = added_css.then_some(transform::OVERRIDE_CSS_NAME);
        patch_xml_entry(&mut book, &opf_path, "OPF", |content| {
            opf::patch_opf(content, register)
        });
    }

    if let Some(ncx_path) = book.ncx_path.clone() {
        let toc_snapshot = book.toc.clone();
        patch_xml_entry(&mut book, &ncx_path, "NCX", |content| {
            toc::patch_ncx(content, &toc_snapshot)
        });
    }

    write_out(&book, input, output)
}

/// Patch one XML entry in place, keeping the original bytes when the
/// entry is missing, not UTF-8, or fails to parse.
fn patch_xml_entry(
    book: &mut Book,
    path: &str,
    what: &str,
    patch: impl FnOnce(&str) -> Result<String>,
) {
    let Some(entry) = book.entry_mut(path) else {
        log::warn!("{} entry {} disappeared; skipping patch", what, path);
        return;
    };

    let Ok(content) = std::str::from_utf8(strip_bom(&entry.data)) else {
        log::warn!("{} entry {} is not valid UTF-8; skipping patch", what, path);
        return;
    };

    match patch(content) {
        Ok(patched) => entry.data = patched.into_bytes(),
        Err(e) => log::warn!("{} entry {} could not be patched: {}", what, path, e),
    }
}

fn override_css_path(book: &Book) -> String {
    let dir = book.opf_dir();
    if dir.is_empty() {
        transform::OVERRIDE_CSS_NAME.to_string()
    } else {
        format!("{}/{}", dir, transform::OVERRIDE_CSS_NAME)
    }
}

/// Serialize to a temp file in the destination directory, then rename
/// over the destination.
fn write_out(book: &Book, input: &Path, output: Option<&Path>) -> Result<()> {
    let dest = output.unwrap_or(input);
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    write_epub_to_writer(book, staged.as_file_mut())?;
    staged.persist(dest).map_err(|e| crate::Error::Io(e.error))?;
    Ok(())
}
