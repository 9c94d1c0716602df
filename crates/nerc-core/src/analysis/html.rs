//! Standalone HTML page with entities highlighted in place.

use std::collections::HashMap;

use crate::error::Result;
use crate::types::EntitySpan;

const PALETTE: &[&str] = &[
    "#7aecec", "#feca74", "#aa9cfc", "#bfeeb7", "#ff9561", "#e4e7d2", "#c887fb", "#9cc9cc",
];

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '\n' => out.push_str("<br>\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders `text` as a full HTML document with every span wrapped in a
/// labelled `<mark>`. Spans must be ordered and non-overlapping; a span
/// starting inside the previous one is skipped.
pub fn render_page(text: &str, spans: &[EntitySpan], lang: &str) -> Result<String> {
    let mut colors: HashMap<&str, &str> = HashMap::new();
    let mut body = String::with_capacity(text.len() * 2);
    let mut cursor = 0;

    for span in spans {
        let surface = span.surface(text)?;
        if span.start < cursor {
            continue;
        }
        let next = PALETTE[colors.len() % PALETTE.len()];
        let color = *colors.entry(span.label.as_str()).or_insert(next);

        body.push_str(&escape(&text[cursor..span.start]));
        body.push_str(&format!(
            "<mark class=\"entity\" style=\"background: {color}; padding: 0.45em 0.6em; \
             margin: 0 0.25em; line-height: 1; border-radius: 0.35em;\">{}\
             <span style=\"font-size: 0.8em; font-weight: bold; line-height: 1; \
             border-radius: 0.35em; vertical-align: middle; margin-left: 0.5rem\">{}</span></mark>",
            escape(surface),
            escape(&span.label),
        ));
        cursor = span.end;
    }
    body.push_str(&escape(&text[cursor..]));

    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>nerc</title>\n</head>\n\
         <body style=\"font-size: 16px; font-family: -apple-system, sans-serif; padding: 4rem 2rem;\">\n\
         <div class=\"entities\" style=\"line-height: 2.5; direction: ltr\">{body}</div>\n\
         </body>\n</html>\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_entities() {
        let html = render_page(
            "Shaka Khan went to Paris",
            &[EntitySpan::new(0, 10, "PER"), EntitySpan::new(19, 24, "LOC")],
            "en",
        )
        .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<html lang=\"en\">"));
        assert_eq!(html.matches("<mark").count(), 2);
        assert!(html.contains(">Shaka Khan<span"));
        assert!(html.contains(">PER</span></mark> went to <mark"));
    }

    #[test]
    fn test_escapes_text() {
        let html = render_page("a < b & \"c\"", &[], "fr").unwrap();
        assert!(html.contains("a &lt; b &amp; &quot;c&quot;"));
        assert!(!html.contains("<mark"));
    }

    #[test]
    fn test_same_label_same_color() {
        let html = render_page(
            "Lyon Paris",
            &[EntitySpan::new(0, 4, "LOC"), EntitySpan::new(5, 10, "LOC")],
            "fr",
        )
        .unwrap();
        assert_eq!(html.matches(PALETTE[0]).count(), 2);
        assert!(!html.contains(PALETTE[1]));
    }

    #[test]
    fn test_skips_overlapping_span() {
        let html = render_page(
            "New York City",
            &[EntitySpan::new(0, 8, "LOC"), EntitySpan::new(4, 13, "LOC")],
            "en",
        )
        .unwrap();
        assert_eq!(html.matches("<mark").count(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_span() {
        assert!(render_page("abc", &[EntitySpan::new(1, 9, "X")], "en").is_err());
    }
}
