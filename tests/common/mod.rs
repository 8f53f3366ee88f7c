//! Shared fixture: an in-memory EPUB with the full set of problems this
//! tool repairs: vertical-writing CSS, styled XHTML, navPoints without
//! ids, and a right-to-left spine.
#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>縦書きの本</dc:title>
    <dc:identifier id="BookId">test-vertical-001</dc:identifier>
    <dc:language>ja</dc:language>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="chapter2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="style/style.css" media-type="text/css"/>
    <item id="cover" href="images/cover.png" media-type="image/png"/>
  </manifest>
  <spine toc="ncx" page-progression-direction="rtl">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const TOC_NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="test-vertical-001"/>
    <meta name="dtb:depth" content="1"/>
  </head>
  <docTitle>
    <text>縦書きの本</text>
  </docTitle>
  <navMap>
    <navPoint playOrder="1">
      <navLabel><text>第一章</text></navLabel>
      <content src="chapter1.xhtml"/>
    </navPoint>
    <navPoint playOrder="2">
      <navLabel><text>第二章</text></navLabel>
      <content src="chapter2.xhtml"/>
    </navPoint>
  </navMap>
</ncx>"#;

pub const CHAPTER_1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title>第一章</title>
<link rel="stylesheet" type="text/css" href="style/style.css"/>
</head>
<body style="writing-mode: vertical-rl; text-orientation: upright;">
<h1>第一章</h1>
<p style="writing-mode: vertical-rl;">機械翻訳されたテキストです。</p>
<p>これは横書きになるべき段落です。</p>
</body>
</html>"#;

pub const CHAPTER_2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title>第二章</title>
<link rel="stylesheet" type="text/css" href="style/style.css"/>
</head>
<body>
<h1>第二章</h1>
<p style="font-size: 14px; writing-mode: tb-rl;">二番目の章。</p>
<img src="images/cover.png" alt="cover"/>
</body>
</html>"#;

pub const VERTICAL_CSS: &str = r#"body {
    writing-mode: vertical-rl;
    -webkit-writing-mode: vertical-rl;
    -epub-writing-mode: vertical-rl;
    text-orientation: upright;
}

p {
    font-size: 16px;
    line-height: 1.8;
}
"#;

/// Not a real PNG, but binary enough: magic bytes followed by data that is
/// not valid UTF-8.
pub const COVER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0xFF, 0xD8, 0xFE,
    0x01, 0x02, 0x03,
];

/// Archive order of the fixture entries.
pub const FIXTURE_ENTRIES: &[&str] = &[
    "mimetype",
    "META-INF/container.xml",
    "OEBPS/content.opf",
    "OEBPS/toc.ncx",
    "OEBPS/chapter1.xhtml",
    "OEBPS/chapter2.xhtml",
    "OEBPS/style/style.css",
    "OEBPS/images/cover.png",
];

/// Build the fixture EPUB in memory.
pub fn build_fixture_epub() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    let text_entries: &[(&str, &str)] = &[
        ("META-INF/container.xml", CONTAINER_XML),
        ("OEBPS/content.opf", CONTENT_OPF),
        ("OEBPS/toc.ncx", TOC_NCX),
        ("OEBPS/chapter1.xhtml", CHAPTER_1),
        ("OEBPS/chapter2.xhtml", CHAPTER_2),
        ("OEBPS/style/style.css", VERTICAL_CSS),
    ];
    for (name, content) in text_entries {
        zip.start_file(*name, deflated).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.start_file("OEBPS/images/cover.png", deflated).unwrap();
    zip.write_all(COVER_PNG).unwrap();

    zip.finish().unwrap().into_inner()
}

/// Write the fixture EPUB to `dir/name` and return its path.
pub fn write_fixture(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, build_fixture_epub()).unwrap();
    path
}

/// Read one entry out of an EPUB on disk.
pub fn read_entry(epub: &Path, name: &str) -> Vec<u8> {
    let file = std::fs::File::open(epub).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    data
}

/// Read one entry as a string.
pub fn read_entry_text(epub: &Path, name: &str) -> String {
    String::from_utf8(read_entry(epub, name)).unwrap()
}

/// Entry names of an EPUB on disk, in archive order.
pub fn entry_names(epub: &Path) -> Vec<String> {
    let file = std::fs::File::open(epub).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}
