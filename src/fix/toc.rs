//! Navigation repairs.
//!
//! Packages produced by careless tooling frequently carry navPoints with
//! no `id` attribute, which makes strict writers reject the whole book.
//! The repair gives every navigation leaf a unique identifier, and the NCX
//! patcher persists those identifiers without disturbing anything else in
//! the file.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::book::TocNode;
use crate::error::Result;
use crate::util;

/// Give every navigation leaf a non-empty identifier.
///
/// Depth-first over the whole tree; leaves that already carry an
/// identifier are left untouched.
pub fn repair_toc_ids(nodes: &mut [TocNode]) {
    for node in nodes {
        match node {
            TocNode::Leaf(link) => {
                if link.id.as_deref().is_none_or(str::is_empty) {
                    link.id = Some(util::uuid_v4());
                }
            }
            TocNode::Group(children) => repair_toc_ids(children),
        }
    }
}

/// Write repaired identifiers back into the NCX text.
///
/// navPoints appear in document order, which matches the depth-first
/// order of leaves in the navigation tree. Only a missing or empty `id`
/// attribute is filled in; every other event streams through unchanged.
pub fn patch_ncx(ncx: &str, toc: &[TocNode]) -> Result<String> {
    let mut leaf_ids: Vec<Option<&str>> = Vec::new();
    collect_leaf_ids(toc, &mut leaf_ids);
    let mut next_leaf = 0usize;

    let mut reader = Reader::from_str(ncx);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event()? {
            Event::Start(e) if is_nav_point(&e) => {
                let id = leaf_ids.get(next_leaf).copied().flatten();
                next_leaf += 1;
                writer.write_event(Event::Start(ensure_id(&e, id)?))?;
            }
            Event::Empty(e) if is_nav_point(&e) => {
                let id = leaf_ids.get(next_leaf).copied().flatten();
                next_leaf += 1;
                writer.write_event(Event::Empty(ensure_id(&e, id)?))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn collect_leaf_ids<'a>(nodes: &'a [TocNode], out: &mut Vec<Option<&'a str>>) {
    for node in nodes {
        match node {
            TocNode::Leaf(link) => out.push(link.id.as_deref()),
            TocNode::Group(children) => collect_leaf_ids(children, out),
        }
    }
}

fn is_nav_point(e: &BytesStart) -> bool {
    util::local_name(e.name().as_ref()) == b"navPoint"
}

/// Rebuild a navPoint start tag, filling in the `id` attribute when it is
/// missing or empty. `model_id` is the identifier the repaired tree holds
/// for this navPoint; a fresh one is generated if the tree ran short.
fn ensure_id(e: &BytesStart<'_>, model_id: Option<&str>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8(e.name().as_ref().to_vec())?;
    let has_id = e
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"id" && !attr.value.is_empty());

    let mut out = BytesStart::new(name);
    if !has_id {
        let id = match model_id {
            Some(id) => id.to_string(),
            None => util::uuid_v4(),
        };
        out.push_attribute(("id", id.as_str()));
    }

    for attr in e.attributes() {
        let attr = attr?;
        // An empty id was replaced above.
        if attr.key.as_ref() == b"id" && attr.value.is_empty() {
            continue;
        }
        out.push_attribute(attr);
    }

    Ok(out)
}
