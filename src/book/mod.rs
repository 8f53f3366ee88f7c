//! In-memory model of one EPUB package.
//!
//! A repair pass must re-emit everything it does not understand
//! byte-for-byte, so unlike a conversion pipeline the model carries every
//! archive entry in archive order, not just what the manifest lists.

/// One EPUB package, as read from a ZIP container.
#[derive(Debug, Clone, Default)]
pub struct Book {
    /// Raw bytes of the `mimetype` marker entry. Written back first and
    /// uncompressed so readers can sniff the package type before parsing
    /// the central directory.
    pub mimetype: Vec<u8>,
    /// Every other archive entry, in archive order.
    pub entries: Vec<ResourceEntry>,
    /// Archive path of the OPF package document, when one was found.
    pub opf_path: Option<String>,
    /// Archive path of the NCX navigation document, when one was found.
    pub ncx_path: Option<String>,
    /// Parsed navigation structure (the NCX navMap).
    pub toc: Vec<TocNode>,
}

/// A named entry inside the package.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    /// Path within the archive. This is the entry's identity.
    pub path: String,
    pub data: Vec<u8>,
    pub kind: ResourceKind,
}

/// How the fix pass treats an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Content document shown to the reader (XHTML/HTML).
    Document,
    /// CSS stylesheet.
    Stylesheet,
    /// The OPF package document.
    Manifest,
    /// The NCX navigation document.
    Navigation,
    /// Images, fonts, META-INF, and anything else. Never rewritten.
    Other,
}

/// One node of the navigation tree: a link leaf, or an ordered group of
/// nested nodes. A navPoint with children parses as a group whose first
/// element is the navPoint's own leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocNode {
    Leaf(TocLink),
    Group(Vec<TocNode>),
}

/// A navigation link entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocLink {
    /// navPoint identifier. `None` or empty until repaired.
    pub id: Option<String>,
    pub title: String,
    pub href: String,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by archive path.
    pub fn entry(&self, path: &str) -> Option<&ResourceEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn entry_mut(&mut self, path: &str) -> Option<&mut ResourceEntry> {
        self.entries.iter_mut().find(|e| e.path == path)
    }

    pub fn has_entry(&self, path: &str) -> bool {
        self.entry(path).is_some()
    }

    /// Append a new entry at the end of the archive order.
    pub fn add_entry(&mut self, path: impl Into<String>, data: Vec<u8>, kind: ResourceKind) {
        self.entries.push(ResourceEntry {
            path: path.into(),
            data,
            kind,
        });
    }

    /// Directory of the OPF within the archive, without a trailing slash.
    /// Empty when the OPF sits at the archive root or was not found.
    pub fn opf_dir(&self) -> &str {
        match &self.opf_path {
            Some(path) => match path.rsplit_once('/') {
                Some((dir, _)) => dir,
                None => "",
            },
            None => "",
        }
    }
}

impl TocLink {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            href: href.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opf_dir() {
        let mut book = Book::new();
        assert_eq!(book.opf_dir(), "");

        book.opf_path = Some("content.opf".to_string());
        assert_eq!(book.opf_dir(), "");

        book.opf_path = Some("OEBPS/content.opf".to_string());
        assert_eq!(book.opf_dir(), "OEBPS");

        book.opf_path = Some("EPUB/package/content.opf".to_string());
        assert_eq!(book.opf_dir(), "EPUB/package");
    }

    #[test]
    fn test_entry_lookup() {
        let mut book = Book::new();
        book.add_entry("style/main.css", b"body {}".to_vec(), ResourceKind::Stylesheet);

        assert!(book.has_entry("style/main.css"));
        assert!(!book.has_entry("style/other.css"));
        assert_eq!(book.entry("style/main.css").unwrap().data, b"body {}");
    }
}
