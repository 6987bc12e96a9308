//! Command handlers for the `mam` binary.

pub mod config;
pub mod journeys;
pub mod markov;
pub mod run;
pub mod shapley;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use mam_core::{AttributionConfig, JourneyCollection};
use tracing::debug;

use crate::config::ConfigLoader;

/// Input shared by every command that runs models.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Journey collection (JSON array of journeys)
    #[arg(short, long)]
    pub journeys: PathBuf,

    /// Config file layered over the user and project config
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl InputArgs {
    /// Load the journey collection and the merged configuration
    pub fn load(&self) -> Result<(JourneyCollection, AttributionConfig)> {
        let config = ConfigLoader::load(self.config.as_deref())?;
        let journeys = load_journeys(&self.journeys)?;
        Ok((journeys, config))
    }
}

/// Read and validate a JSON journey collection.
pub fn load_journeys(path: &Path) -> Result<JourneyCollection> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let journeys = JourneyCollection::from_json_reader(BufReader::new(file))
        .with_context(|| format!("Failed to load journeys from {}", path.display()))?;
    debug!(path = %path.display(), journeys = journeys.len(), "Loaded journeys");
    Ok(journeys)
}

/// Table with the house style and a cyan header row.
pub fn styled_table<I, S>(headers: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .into_iter()
            .map(|h| Cell::new(h.into()).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_journeys_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journeys.json");
        std::fs::write(
            &path,
            r#"[{"channels": ["Email", "Direct"], "converted": true, "conversion_value": 3.0}]"#,
        )
        .unwrap();

        let journeys = load_journeys(&path).unwrap();
        assert_eq!(journeys.len(), 1);
    }

    #[test]
    fn test_load_journeys_rejects_empty_channels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journeys.json");
        std::fs::write(&path, r#"[{"channels": [], "converted": false}]"#).unwrap();

        let err = load_journeys(&path).unwrap_err();
        assert!(format!("{err:#}").contains("index 0"));
    }

    #[test]
    fn test_load_journeys_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load_journeys(&dir.path().join("nope.json")).is_err());
    }
}
