//! Markdown → HTML rendering for the result toggle.
//!
//! The state snapshot carries both the raw extraction text and this
//! rendered form, so flipping the toggle in the UI is a pure presentation
//! change — the stored text is never re-extracted.

use pulldown_cmark::{html, Options, Parser};

/// Render markdown text to an HTML fragment.
///
/// GFM tables and strikethrough are enabled because the extraction prompt
/// explicitly asks the model for pipe tables.
pub fn to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_emphasis() {
        let html = to_html("# Title\n\nsome *emphasis*");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[test]
    fn renders_pipe_tables() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let text = "## Section\n\n- one\n- two";
        assert_eq!(to_html(text), to_html(text));
    }

    #[test]
    fn plain_text_becomes_a_paragraph() {
        assert_eq!(to_html("just text"), "<p>just text</p>\n");
    }
}
