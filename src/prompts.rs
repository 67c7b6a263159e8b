//! The default extraction prompt.
//!
//! Centralised here so the default behaviour can be changed in exactly one
//! place and inspected by tests without driving a real model. The web UI
//! pre-fills its prompt box with this text; users can edit it per request.

/// Default prompt sent with every page image unless the user edits it.
pub const DEFAULT_OCR_PROMPT: &str = "\
Extract all text and tables from this image. Preserve the layout and \
formatting as much as possible.

Output pretty formatted markdown";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_asks_for_markdown() {
        assert!(DEFAULT_OCR_PROMPT.contains("markdown"));
        assert!(!DEFAULT_OCR_PROMPT.trim().is_empty());
    }
}
