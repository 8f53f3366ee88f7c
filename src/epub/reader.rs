use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::book::{Book, ResourceEntry, ResourceKind, TocLink, TocNode};
use crate::error::Result;
use crate::util::{local_name, strip_bom};

const DEFAULT_MIMETYPE: &[u8] = b"application/epub+zip";
const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// Parsed OPF package data. Only what the fix pass needs: how to classify
/// entries, and where the NCX lives.
#[derive(Default)]
struct OpfData {
    /// Maps manifest id -> (href, media_type), hrefs as written in the OPF.
    manifest: HashMap<String, (String, String)>,
    /// The spine's `toc` idref, when present.
    spine_toc_id: Option<String>,
}

/// Read an EPUB file from disk into a [`Book`].
///
/// Everything below "the archive cannot be opened" is non-fatal: a package
/// with a broken container.xml, OPF, or NCX still loads, with entries
/// classified by extension and an empty navigation tree.
///
/// # Example
///
/// ```no_run
/// use yokogaki::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("{} entries", book.entries.len());
/// # Ok::<(), yokogaki::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    // 1. Pull every entry out in archive order.
    let mut mimetype: Option<Vec<u8>> = None;
    let mut raw: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        if name == "mimetype" {
            mimetype = Some(data);
        } else {
            raw.push((name, data));
        }
    }

    let mimetype = mimetype.unwrap_or_else(|| {
        log::warn!("package has no mimetype entry; assuming application/epub+zip");
        DEFAULT_MIMETYPE.to_vec()
    });

    // 2. Locate and parse the OPF.
    let opf_path = find_opf_path(&raw);
    let opf_dir = opf_path
        .as_deref()
        .and_then(|p| p.rsplit_once('/'))
        .map(|(dir, _)| dir)
        .unwrap_or("");

    let opf = match opf_path.as_deref().and_then(|p| entry_data(&raw, p)) {
        Some(data) => match std::str::from_utf8(strip_bom(data)) {
            Ok(content) => parse_opf(content).unwrap_or_else(|e| {
                log::warn!("OPF could not be parsed ({}); classifying entries by extension", e);
                OpfData::default()
            }),
            Err(_) => {
                log::warn!("OPF is not valid UTF-8; classifying entries by extension");
                OpfData::default()
            }
        },
        None => {
            log::warn!("no OPF package document found; classifying entries by extension");
            OpfData::default()
        }
    };

    // Resolve manifest hrefs to archive paths (direct and percent-decoded,
    // so either spelling matches the entry name).
    let mut media_types: HashMap<String, String> = HashMap::new();
    for (href, media_type) in opf.manifest.values() {
        media_types.insert(resolve_path(opf_dir, href), media_type.clone());
        if let Ok(decoded) = percent_encoding::percent_decode_str(href).decode_utf8()
            && decoded != *href
        {
            media_types.insert(resolve_path(opf_dir, &decoded), media_type.clone());
        }
    }

    // 3. Locate the NCX: spine toc idref, then manifest media type, then
    // extension scan.
    let ncx_path = opf
        .spine_toc_id
        .as_ref()
        .and_then(|id| opf.manifest.get(id))
        .map(|(href, _)| resolve_path(opf_dir, href))
        .or_else(|| {
            opf.manifest
                .values()
                .find(|(_, media_type)| media_type == NCX_MEDIA_TYPE)
                .map(|(href, _)| resolve_path(opf_dir, href))
        })
        .or_else(|| {
            raw.iter()
                .map(|(path, _)| path)
                .find(|path| path.to_ascii_lowercase().ends_with(".ncx"))
                .cloned()
        })
        .filter(|path| entry_data(&raw, path).is_some());

    // 4. Parse the NCX navMap into the navigation tree.
    let toc = match ncx_path.as_deref().and_then(|p| entry_data(&raw, p)) {
        Some(data) => match std::str::from_utf8(strip_bom(data)) {
            Ok(content) => parse_ncx(content).unwrap_or_else(|e| {
                log::warn!("NCX could not be parsed ({}); navigation left empty", e);
                Vec::new()
            }),
            Err(_) => {
                log::warn!("NCX is not valid UTF-8; navigation left empty");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    // 5. Classify and assemble.
    let entries = raw
        .into_iter()
        .map(|(path, data)| {
            let kind = classify(&path, opf_path.as_deref(), ncx_path.as_deref(), &media_types);
            ResourceEntry { path, data, kind }
        })
        .collect();

    Ok(Book {
        mimetype,
        entries,
        opf_path,
        ncx_path,
        toc,
    })
}

fn entry_data<'a>(raw: &'a [(String, Vec<u8>)], path: &str) -> Option<&'a [u8]> {
    raw.iter()
        .find(|(name, _)| name == path)
        .map(|(_, data)| data.as_slice())
}

/// Find the OPF via META-INF/container.xml, falling back to scanning the
/// conventional roots for a `.opf` entry.
fn find_opf_path(raw: &[(String, Vec<u8>)]) -> Option<String> {
    if let Some(container) = entry_data(raw, "META-INF/container.xml")
        && let Some(path) = parse_container(container)
    {
        if entry_data(raw, &path).is_some() {
            return Some(path);
        }
        log::warn!("container.xml points at missing entry {}", path);
    }

    for prefix in ["", "EPUB/", "OEBPS/"] {
        if let Some((path, _)) = raw.iter().find(|(path, _)| {
            path.to_ascii_lowercase().ends_with(".opf")
                && path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| !rest.contains('/'))
        }) {
            return Some(path.clone());
        }
    }

    raw.iter()
        .map(|(path, _)| path)
        .find(|path| path.to_ascii_lowercase().ends_with(".opf"))
        .cloned()
}

fn parse_container(content: &[u8]) -> Option<String> {
    let content = match std::str::from_utf8(strip_bom(content)) {
        Ok(content) => content,
        Err(_) => return None,
    };

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"full-path" {
                        return String::from_utf8(attr.value.to_vec()).ok();
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(e) => {
                log::warn!("container.xml could not be parsed: {}", e);
                return None;
            }
            _ => {}
        }
    }
}

fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut manifest: HashMap<String, (String, String)> = HashMap::new();
    let mut spine_toc_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                match local_name(e.name().as_ref()) {
                    b"item" => {
                        let mut id = String::new();
                        let mut href = String::new();
                        let mut media_type = String::new();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"id" => id = String::from_utf8(attr.value.to_vec())?,
                                b"href" => href = String::from_utf8(attr.value.to_vec())?,
                                b"media-type" => {
                                    media_type = String::from_utf8(attr.value.to_vec())?
                                }
                                _ => {}
                            }
                        }

                        if !id.is_empty() {
                            manifest.insert(id, (href, media_type));
                        }
                    }
                    b"spine" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"toc" {
                                spine_toc_id = Some(String::from_utf8(attr.value.to_vec())?);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(OpfData {
        manifest,
        spine_toc_id,
    })
}

/// Parse the NCX navMap into the navigation tree. A navPoint without
/// children becomes a leaf; one with children becomes a group whose first
/// element is the navPoint's own leaf, so leaves in depth-first order match
/// navPoints in document order.
fn parse_ncx(content: &str) -> Result<Vec<TocNode>> {
    struct NavFrame {
        link: TocLink,
        children: Vec<TocNode>,
    }

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut root: Vec<TocNode> = Vec::new();
    let mut stack: Vec<NavFrame> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match local_name(e.name().as_ref()) {
                b"navPoint" => {
                    let mut link = TocLink::default();
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"id" {
                            let id = String::from_utf8(attr.value.to_vec())?;
                            if !id.is_empty() {
                                link.id = Some(id);
                            }
                        }
                    }
                    stack.push(NavFrame {
                        link,
                        children: Vec::new(),
                    });
                }
                b"text" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if local_name(e.name().as_ref()) == b"content" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"src"
                            && let Some(frame) = stack.last_mut()
                        {
                            frame.link.href = String::from_utf8(attr.value.to_vec())?;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                // docTitle text arrives with an empty stack and is ignored.
                if in_text && let Some(frame) = stack.last_mut() {
                    frame.link.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text && let Some(frame) = stack.last_mut() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    let resolved = match entity.as_ref() {
                        "apos" => "'",
                        "quot" => "\"",
                        "lt" => "<",
                        "gt" => ">",
                        "amp" => "&",
                        _ => "",
                    };
                    frame.link.title.push_str(resolved);
                }
            }
            Ok(Event::End(e)) => match local_name(e.name().as_ref()) {
                b"text" => in_text = false,
                b"navPoint" => {
                    if let Some(frame) = stack.pop() {
                        let node = if frame.children.is_empty() {
                            TocNode::Leaf(frame.link)
                        } else {
                            let mut nodes = vec![TocNode::Leaf(frame.link)];
                            nodes.extend(frame.children);
                            TocNode::Group(nodes)
                        };
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(node),
                            None => root.push(node),
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
    }

    Ok(root)
}

fn classify(
    path: &str,
    opf_path: Option<&str>,
    ncx_path: Option<&str>,
    media_types: &HashMap<String, String>,
) -> ResourceKind {
    if Some(path) == opf_path {
        return ResourceKind::Manifest;
    }
    if Some(path) == ncx_path {
        return ResourceKind::Navigation;
    }
    if path.starts_with("META-INF/") {
        return ResourceKind::Other;
    }

    if let Some(media_type) = media_types.get(path) {
        return match media_type.as_str() {
            "application/xhtml+xml" | "text/html" => ResourceKind::Document,
            "text/css" => ResourceKind::Stylesheet,
            _ => ResourceKind::Other,
        };
    }

    // Entries the manifest does not list still get fixed when the
    // extension is unambiguous.
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".xhtml") || lower.ends_with(".html") || lower.ends_with(".htm") {
        ResourceKind::Document
    } else if lower.ends_with(".css") {
        ResourceKind::Stylesheet
    } else {
        ResourceKind::Other
    }
}

fn resolve_path(base: &str, href: &str) -> String {
    if base.is_empty() {
        href.to_string()
    } else {
        format!("{}/{}", base, href)
    }
}
