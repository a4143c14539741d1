//! Engine configuration.
//!
//! Everything has a default, so an empty JSON object (or no file at all) is a
//! valid configuration. Proxy URLs have no default: their sources stay off
//! until configured.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::Language;
use crate::strategy::{Phase, DEFAULT_PHASES};

pub const DEFAULT_USER_AGENT: &str = concat!("image-resolve/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub local_language: Language,
    pub international_language: Language,
    pub commons_api_url: String,
    pub local_wikipedia_api_url: String,
    pub international_wikipedia_api_url: String,
    /// Media database proxy: `GET <url>?query=&type=&year=`
    pub media_db_url: Option<String>,
    /// Music catalog proxy: `GET <url>?q=`
    pub music_catalog_url: Option<String>,
    pub user_agent: String,
    /// Thumbnail width requested from the wikis.
    pub thumb_width: u32,
    /// Candidates examined per search phase.
    pub result_limit: usize,
    /// Appended to national-archive searches.
    pub archive_qualifier: String,
    pub phases: Vec<Phase>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_language: Language::Nl,
            international_language: Language::En,
            commons_api_url: "https://commons.wikimedia.org/w/api.php".to_string(),
            local_wikipedia_api_url: "https://nl.wikipedia.org/w/api.php".to_string(),
            international_wikipedia_api_url: "https://en.wikipedia.org/w/api.php".to_string(),
            media_db_url: None,
            music_catalog_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            thumb_width: 800,
            result_limit: 5,
            archive_qualifier: "Nationaal Archief".to_string(),
            phases: DEFAULT_PHASES.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            bail!("Invalid config: at least one search phase is required");
        }
        if self.result_limit == 0 {
            bail!("Invalid config: result_limit must be at least 1");
        }
        if self.thumb_width == 0 {
            bail!("Invalid config: thumb_width must be at least 1");
        }
        for (name, url) in [
            ("commons_api_url", &self.commons_api_url),
            ("local_wikipedia_api_url", &self.local_wikipedia_api_url),
            ("international_wikipedia_api_url", &self.international_wikipedia_api_url),
        ] {
            if url.trim().is_empty() {
                bail!("Invalid config: {} must not be empty", name);
            }
        }
        Ok(())
    }
}
