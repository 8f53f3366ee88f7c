//! Content transforms for the repair pass.
//!
//! - CSS: inline declaration and whole-stylesheet rewriting
//! - HTML: inline style rewriting, override style injection

pub mod css;
pub mod html;

/// `id` attribute of the `<style>` block injected into each document head.
/// Injection checks for this marker, so re-fixing a book is idempotent.
pub const MARKER_ID: &str = "yokogaki-fix";

/// File name of the shared override stylesheet added to the package.
pub const OVERRIDE_CSS_NAME: &str = "yokogaki-fix.css";

/// The override stylesheet enforcing horizontal layout.
///
/// Single source of truth: the per-document head injection and the shared
/// package resource must stay byte-identical, so both read this constant.
pub const OVERRIDE_CSS: &str = "\
body {
    writing-mode: horizontal-tb !important;
    -webkit-writing-mode: horizontal-tb !important;
    -epub-writing-mode: horizontal-tb !important;
    direction: ltr;
}

/* Text elements only, so images keep their orientation */
p, div, span, h1, h2, h3, h4, h5, h6 {
    text-orientation: mixed !important;
}

/* CJK-capable font fallback chain */
body, p, div, span {
    font-family: \"Microsoft YaHei\", \"SimSun\", \"PingFang SC\", \"Noto Sans CJK SC\", sans-serif;
}

/* Scale raster and vector images to the viewport width */
img {
    max-width: 100%;
    height: auto;
}

svg {
    max-width: 100%;
    height: auto;
}
";
