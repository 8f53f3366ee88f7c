//! Writing-direction rewrites for CSS.
//!
//! Two pure functions: one over a single inline `style="..."` declaration,
//! one over a whole stylesheet. Both touch only what forces vertical
//! layout; every other rule passes through.

/// Rewrite one inline style declaration.
///
/// Rules are matched case-insensitively, first match wins:
/// vertical writing modes (vendor-prefixed included) become
/// `writing-mode: horizontal-tb`, `text-orientation` and leftover
/// vendor-prefixed writing modes are dropped, everything else is kept in
/// its original order. Never fails; empty input yields empty output.
pub fn rewrite_style_declaration(style: &str) -> String {
    let mut fixed: Vec<String> = Vec::new();

    for rule in style.split(';') {
        let rule = rule.trim();
        if rule.is_empty() {
            continue;
        }
        let lower = rule.to_ascii_lowercase();

        if lower.contains("writing-mode") && (lower.contains("vertical") || lower.contains("tb")) {
            fixed.push("writing-mode: horizontal-tb".to_string());
            continue;
        }

        if lower.contains("text-orientation") {
            continue;
        }

        if lower.contains("-webkit-writing-mode") || lower.contains("-epub-writing-mode") {
            continue;
        }

        fixed.push(rule.to_string());
    }

    fixed.join("; ")
}

/// Rewrite a whole stylesheet.
///
/// Line-oriented so the output stays diffable against the input: vertical
/// writing-mode values are substituted in place, `text-orientation` and
/// vertical vendor-prefixed lines are commented out rather than deleted.
/// Content that is not valid UTF-8 is returned unchanged.
pub fn rewrite_stylesheet(content: &[u8]) -> Vec<u8> {
    let text = match std::str::from_utf8(content) {
        Ok(text) => text,
        Err(_) => {
            log::warn!("stylesheet is not valid UTF-8; leaving it untouched");
            return content.to_vec();
        }
    };

    let fixed: Vec<String> = text.split('\n').map(rewrite_line).collect();
    fixed.join("\n").into_bytes()
}

fn rewrite_line(line: &str) -> String {
    let lower = line.to_ascii_lowercase();

    if lower.contains("writing-mode") && (lower.contains("vertical") || lower.contains("tb")) {
        return line
            .replace("vertical-rl", "horizontal-tb")
            .replace("vertical-lr", "horizontal-tb")
            .replace("tb-rl", "horizontal-tb")
            .replace("tb-lr", "horizontal-tb");
    }

    if lower.contains("text-orientation") {
        return format!("/* {} */", line);
    }

    if (lower.contains("-webkit-writing-mode") || lower.contains("-epub-writing-mode"))
        && lower.contains("vertical")
    {
        return format!("/* {} */", line);
    }

    line.to_string()
}
