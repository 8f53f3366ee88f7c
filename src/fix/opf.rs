//! Package-document (OPF) patching.
//!
//! The spine of a vertical-Japanese book declares
//! `page-progression-direction="rtl"`, which makes horizontal text page
//! backwards. The patch flips it to `ltr` and leaves the rest of the OPF
//! alone; an absent attribute stays absent. Patching happens on the
//! serialized form only, since that is the only form readers observe.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::Result;
use crate::util;

/// Manifest id under which the override stylesheet is registered.
pub const OVERRIDE_ITEM_ID: &str = "yokogaki-fix-css";

/// Patch the package document.
///
/// Flips a right-to-left page progression to left-to-right. When
/// `register_css` names the injected override stylesheet (href relative to
/// the OPF), a manifest item for it is added too, unless one is already
/// present from an earlier fix.
pub fn patch_opf(opf: &str, register_css: Option<&str>) -> Result<String> {
    let mut reader = Reader::from_str(opf);
    let mut writer = Writer::new(Vec::new());
    let mut have_override_item = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if is_spine(&e) => {
                writer.write_event(Event::Start(flip_direction(&e)?))?;
            }
            Event::Empty(e) if is_spine(&e) => {
                writer.write_event(Event::Empty(flip_direction(&e)?))?;
            }
            Event::Start(e) if is_override_item(&e) => {
                have_override_item = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if is_override_item(&e) => {
                have_override_item = true;
                writer.write_event(Event::Empty(e))?;
            }
            Event::End(e) if util::local_name(e.name().as_ref()) == b"manifest" => {
                if let Some(href) = register_css
                    && !have_override_item
                {
                    let mut item = BytesStart::new("item");
                    item.push_attribute(("id", OVERRIDE_ITEM_ID));
                    item.push_attribute(("href", href));
                    item.push_attribute(("media-type", "text/css"));
                    writer.write_event(Event::Empty(item))?;
                }
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            ev => writer.write_event(ev)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn is_spine(e: &BytesStart) -> bool {
    util::local_name(e.name().as_ref()) == b"spine"
}

fn is_override_item(e: &BytesStart) -> bool {
    util::local_name(e.name().as_ref()) == b"item"
        && e.attributes().flatten().any(|attr| {
            attr.key.as_ref() == b"id" && attr.value.as_ref() == OVERRIDE_ITEM_ID.as_bytes()
        })
}

fn flip_direction(e: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    let name = String::from_utf8(e.name().as_ref().to_vec())?;
    let mut out = BytesStart::new(name);

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"page-progression-direction" && attr.value.as_ref() == b"rtl" {
            out.push_attribute(("page-progression-direction", "ltr"));
        } else {
            out.push_attribute(attr);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF_RTL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="BookId">
  <manifest>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine toc="ncx" page-progression-direction="rtl">
    <itemref idref="ch1"/>
  </spine>
</package>"#;

    #[test]
    fn test_rtl_becomes_ltr() {
        let patched = patch_opf(OPF_RTL, None).unwrap();
        assert!(patched.contains(r#"page-progression-direction="ltr""#));
        assert!(!patched.contains("rtl"));
        // Sibling attributes survive.
        assert!(patched.contains(r#"<spine toc="ncx""#));
    }

    #[test]
    fn test_absent_direction_stays_absent() {
        let opf = r#"<package><manifest/><spine toc="ncx"><itemref idref="ch1"/></spine></package>"#;
        let patched = patch_opf(opf, None).unwrap();
        assert!(!patched.contains("page-progression-direction"));
    }

    #[test]
    fn test_ltr_direction_untouched() {
        let opf = r#"<package><spine page-progression-direction="ltr"/></package>"#;
        let patched = patch_opf(opf, None).unwrap();
        assert!(patched.contains(r#"page-progression-direction="ltr""#));
    }

    #[test]
    fn test_namespaced_spine_matched() {
        let opf = r#"<opf:package xmlns:opf="http://www.idpf.org/2007/opf"><opf:spine page-progression-direction="rtl"/></opf:package>"#;
        let patched = patch_opf(opf, None).unwrap();
        assert!(patched.contains(r#"<opf:spine page-progression-direction="ltr"/>"#));
    }

    #[test]
    fn test_override_item_registered_once() {
        let patched = patch_opf(OPF_RTL, Some("yokogaki-fix.css")).unwrap();
        assert!(patched.contains(r#"<item id="yokogaki-fix-css" href="yokogaki-fix.css" media-type="text/css"/>"#));

        // A second pass over the patched OPF must not duplicate the item.
        let again = patch_opf(&patched, Some("yokogaki-fix.css")).unwrap();
        assert_eq!(again.matches(OVERRIDE_ITEM_ID).count(), 1);
    }

    #[test]
    fn test_unrelated_content_passes_through() {
        let patched = patch_opf(OPF_RTL, None).unwrap();
        assert!(patched.contains(r#"<item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>"#));
        assert!(patched.contains(r#"<itemref idref="ch1"/>"#));
        assert!(patched.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    }
}
