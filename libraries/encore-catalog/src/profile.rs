//! Per-catalog configuration.

use serde::{Deserialize, Serialize};

/// How one catalog builds locators and picks audio files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProfile {
    /// Base for `<base>/<show folder>/<filename>` locators
    #[serde(default = "default_download_base")]
    pub download_base: String,

    /// Base for `<base>/<show id>` metadata index requests
    #[serde(default = "default_metadata_base")]
    pub metadata_base: String,

    /// File formats accepted as playable audio, in the archive's naming
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,

    /// Filename fragments that mark a low quality derivative
    #[serde(default = "default_low_quality_markers")]
    pub low_quality_markers: Vec<String>,

    /// Size of the initial byte range for whole-set single files
    #[serde(default = "default_initial_range_bytes")]
    pub initial_range_bytes: u64,
}

fn default_download_base() -> String {
    "https://archive.org/download".to_string()
}

fn default_metadata_base() -> String {
    "https://archive.org/metadata".to_string()
}

fn default_allowed_formats() -> Vec<String> {
    vec!["VBR MP3".to_string(), "MP3".to_string()]
}

fn default_low_quality_markers() -> Vec<String> {
    vec!["_64kb".to_string()]
}

fn default_initial_range_bytes() -> u64 {
    512_000
}

impl Default for CatalogProfile {
    fn default() -> Self {
        Self {
            download_base: default_download_base(),
            metadata_base: default_metadata_base(),
            allowed_formats: default_allowed_formats(),
            low_quality_markers: default_low_quality_markers(),
            initial_range_bytes: default_initial_range_bytes(),
        }
    }
}

impl CatalogProfile {
    /// Profile rooted at a different host, keeping the default selection rules
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            download_base: format!("{base}/download"),
            metadata_base: format!("{base}/metadata"),
            ..Self::default()
        }
    }

    pub fn accepts_format(&self, format: &str) -> bool {
        self.allowed_formats
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(format.trim()))
    }

    pub fn is_low_quality(&self, filename: &str) -> bool {
        self.low_quality_markers
            .iter()
            .any(|marker| filename.contains(marker.as_str()))
    }
}
