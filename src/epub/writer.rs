use std::io::{self, Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::book::Book;

/// Write a [`Book`] back to an EPUB file on disk.
///
/// Entries are written in model order, so a package that was read with
/// [`read_epub`](crate::read_epub) keeps its original archive layout.
///
/// # Example
///
/// ```no_run
/// use yokogaki::{read_epub, write_epub};
///
/// let book = read_epub("input.epub")?;
/// write_epub(&book, "output.epub")?;
/// # Ok::<(), yokogaki::Error>(())
/// ```
pub fn write_epub<P: AsRef<Path>>(book: &Book, path: P) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    write_epub_to_writer(book, file)
}

/// Write a [`Book`] to any [`Write`] + [`Seek`] destination.
pub fn write_epub_to_writer<W: Write + Seek>(book: &Book, writer: W) -> io::Result<()> {
    let mut zip = ZipWriter::new(writer);

    let options_stored =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let options_deflate =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // The mimetype must come first and uncompressed so readers can sniff
    // the package type before parsing the central directory.
    zip.start_file("mimetype", options_stored)?;
    zip.write_all(&book.mimetype)?;

    for entry in &book.entries {
        zip.start_file(&entry.path, options_deflate)?;
        zip.write_all(&entry.data)?;
    }

    zip.finish()?;
    Ok(())
}
