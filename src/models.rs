//! The fixed catalog of supported vision models.
//!
//! The studio deliberately offers a short, curated list instead of a free
//! text field: every entry here has been verified to accept an image plus a
//! prompt and to produce usable page transcriptions through the local
//! engine. The approximate download size is shown in the UI so users know
//! what the first load will cost them.

use serde::Serialize;

/// One entry in the supported-model catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSpec {
    /// Engine-side model tag, e.g. `qwen2.5vl:7b`.
    pub tag: &'static str,
    /// Short human-readable label for the dropdown.
    pub label: &'static str,
    /// Model family, shown as a caption.
    pub family: &'static str,
    /// Approximate weight download size in bytes (first load only).
    pub download_bytes: u64,
}

impl ModelSpec {
    /// `"3.2 GB"`-style rendering of [`ModelSpec::download_bytes`].
    pub fn download_size_label(&self) -> String {
        let gb = self.download_bytes as f64 / 1e9;
        if gb >= 1.0 {
            format!("{gb:.1} GB")
        } else {
            format!("{:.0} MB", self.download_bytes as f64 / 1e6)
        }
    }
}

/// The five supported vision models, smallest first.
pub const SUPPORTED_MODELS: &[ModelSpec] = &[
    ModelSpec {
        tag: "qwen2.5vl:3b",
        label: "Qwen2.5-VL 3B",
        family: "Qwen",
        download_bytes: 3_200_000_000,
    },
    ModelSpec {
        tag: "minicpm-v:8b",
        label: "MiniCPM-V 8B",
        family: "MiniCPM",
        download_bytes: 5_500_000_000,
    },
    ModelSpec {
        tag: "qwen2.5vl:7b",
        label: "Qwen2.5-VL 7B",
        family: "Qwen",
        download_bytes: 6_000_000_000,
    },
    ModelSpec {
        tag: "llama3.2-vision:11b",
        label: "Llama 3.2 Vision 11B",
        family: "Llama",
        download_bytes: 7_800_000_000,
    },
    ModelSpec {
        tag: "qwen2.5vl:32b",
        label: "Qwen2.5-VL 32B",
        family: "Qwen",
        download_bytes: 21_000_000_000,
    },
];

/// Look up a catalog entry by its engine tag.
pub fn find(tag: &str) -> Option<&'static ModelSpec> {
    SUPPORTED_MODELS.iter().find(|m| m.tag == tag)
}

/// Comma-separated list of all supported tags, for error messages.
pub fn known_tags() -> String {
    SUPPORTED_MODELS
        .iter()
        .map(|m| m.tag)
        .collect::<Vec<_>>()
        .join(", ")
}
