use super::types::{
    RawMamConfig, RawMarkov, RawModelsSection, RawPositionWeights, RawShapley, RawTimeDecay,
};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use mam_core::{
    AttributionConfig, MarkovConfig, ModelSelection, PositionWeights, ShapleyConfig,
    TimeDecayConfig,
};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project + explicit file)
    pub fn load(explicit: Option<&Path>) -> Result<AttributionConfig> {
        let mut raw = RawMamConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(&project_path)?);
        }

        // Layer 3: --config file, which must exist
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            raw = Self::merge_raw(raw, Self::read_raw(path)?);
        }

        // Convert to final config with defaults applied
        let config = Self::finalize(raw);
        config
            .validate()
            .context("Configuration rejected before running any model")?;
        Ok(config)
    }

    fn read_raw(path: &Path) -> Result<RawMamConfig> {
        debug!(path = %path.display(), "Reading config layer");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Get user config path (platform-specific)
    /// Can be overridden with MAM_USER_CONFIG_DIR env var (useful for isolated tests)
    pub fn user_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("MAM_USER_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.toml"));
        }
        ProjectDirs::from("", "", "mam").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with MAM_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("MAM_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".mam/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawMamConfig, overlay: RawMamConfig) -> RawMamConfig {
        let (b, o) = (base.models, overlay.models);
        RawMamConfig {
            round_values_to: overlay.round_values_to.or(base.round_values_to),
            path_separator: overlay.path_separator.or(base.path_separator),
            models: RawModelsSection {
                family: o.family.or(b.family),
                exclude: o.exclude.or(b.exclude),
                last_click_non_channel: o.last_click_non_channel.or(b.last_click_non_channel),
                position_weights: RawPositionWeights {
                    first: o.position_weights.first.or(b.position_weights.first),
                    middle: o.position_weights.middle.or(b.position_weights.middle),
                    last: o.position_weights.last.or(b.position_weights.last),
                },
                time_decay: RawTimeDecay {
                    decay_over_time: o.time_decay.decay_over_time.or(b.time_decay.decay_over_time),
                    frequency_hours: o.time_decay.frequency_hours.or(b.time_decay.frequency_hours),
                },
                markov: RawMarkov {
                    transition_to_same_state: o
                        .markov
                        .transition_to_same_state
                        .or(b.markov.transition_to_same_state),
                    value_mode: o.markov.value_mode.or(b.markov.value_mode),
                    eigen_tolerance: o.markov.eigen_tolerance.or(b.markov.eigen_tolerance),
                },
                shapley: RawShapley {
                    size: o.shapley.size.or(b.shapley.size),
                    order: o.shapley.order.or(b.shapley.order),
                    values: o.shapley.values.or(b.shapley.values),
                    custom_values: o.shapley.custom_values.or(b.shapley.custom_values),
                },
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawMamConfig) -> AttributionConfig {
        let defaults = AttributionConfig::default();
        let d = defaults.models;
        let m = raw.models;

        AttributionConfig {
            round_values_to: raw.round_values_to.unwrap_or(defaults.round_values_to),
            path_separator: raw.path_separator.unwrap_or(defaults.path_separator),
            models: ModelSelection {
                family: m.family.unwrap_or(d.family),
                exclude: m.exclude.unwrap_or(d.exclude),
                last_click_non_channel: m
                    .last_click_non_channel
                    .unwrap_or(d.last_click_non_channel),
                position_weights: PositionWeights {
                    first: m.position_weights.first.unwrap_or(d.position_weights.first),
                    middle: m.position_weights.middle.unwrap_or(d.position_weights.middle),
                    last: m.position_weights.last.unwrap_or(d.position_weights.last),
                },
                time_decay: TimeDecayConfig {
                    decay_over_time: m
                        .time_decay
                        .decay_over_time
                        .unwrap_or(d.time_decay.decay_over_time),
                    frequency_hours: m
                        .time_decay
                        .frequency_hours
                        .unwrap_or(d.time_decay.frequency_hours),
                },
                markov: MarkovConfig {
                    transition_to_same_state: m
                        .markov
                        .transition_to_same_state
                        .unwrap_or(d.markov.transition_to_same_state),
                    value_mode: m.markov.value_mode.unwrap_or(d.markov.value_mode),
                    eigen_tolerance: m
                        .markov
                        .eigen_tolerance
                        .unwrap_or(d.markov.eigen_tolerance),
                },
                shapley: ShapleyConfig {
                    size: m.shapley.size.unwrap_or(d.shapley.size),
                    order: m.shapley.order.unwrap_or(d.shapley.order),
                    values: m.shapley.values.unwrap_or(d.shapley.values),
                    custom_values: m.shapley.custom_values.unwrap_or(d.shapley.custom_values),
                },
            },
        }
    }

    /// Load a single config file on top of defaults (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &Path) -> Result<AttributionConfig> {
        if path.exists() {
            Ok(Self::finalize(Self::read_raw(path)?))
        } else {
            Ok(AttributionConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mam_core::{ModelFamily, ValueMode};
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    /// Run `f` with both config layers pointed at the given directories
    fn with_config_dirs<T>(user: &Path, project: &Path, f: impl FnOnce() -> T) -> T {
        // SAFETY: every caller is #[serial], so no other test reads these variables concurrently
        unsafe {
            std::env::set_var("MAM_USER_CONFIG_DIR", user);
            std::env::set_var("MAM_PROJECT_CONFIG_DIR", project);
        }
        let result = f();
        unsafe {
            std::env::remove_var("MAM_USER_CONFIG_DIR");
            std::env::remove_var("MAM_PROJECT_CONFIG_DIR");
        }
        result
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config, AttributionConfig::default());
    }

    #[test]
    fn test_load_from_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
round_values_to = 2

[models]
family = "heuristic"
exclude = ["time_decay"]

[models.position_weights]
first = 0.5
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.round_values_to, 2);
        assert_eq!(config.models.family, ModelFamily::Heuristic);
        assert_eq!(config.models.exclude, vec!["time_decay"]);
        assert_eq!(config.models.position_weights.first, 0.5);
        assert_eq!(config.models.position_weights.middle, 0.2);
        assert_eq!(config.path_separator, " > ");
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_raw_overlay_overrides_base() {
        let base = RawMamConfig {
            round_values_to: Some(3),
            path_separator: Some(" | ".to_string()),
            models: RawModelsSection {
                markov: RawMarkov {
                    value_mode: Some(ValueMode::Monetary),
                    eigen_tolerance: Some(0.01),
                    ..Default::default()
                },
                ..Default::default()
            },
        };

        let overlay = RawMamConfig {
            round_values_to: Some(6),
            path_separator: None, // Should preserve base value
            models: RawModelsSection {
                markov: RawMarkov {
                    value_mode: Some(ValueMode::Frequency),
                    ..Default::default()
                },
                ..Default::default()
            },
        };

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.round_values_to, Some(6));
        assert_eq!(merged.path_separator, Some(" | ".to_string()));
        assert_eq!(merged.models.markov.value_mode, Some(ValueMode::Frequency));
        // overlay's None falls through to base value via .or()
        assert_eq!(merged.models.markov.eigen_tolerance, Some(0.01));
    }

    #[test]
    fn test_finalize_fills_defaults() {
        let config = ConfigLoader::finalize(RawMamConfig::default());
        assert_eq!(config, AttributionConfig::default());
    }

    #[test]
    #[serial]
    fn test_user_config_path_names_mam() {
        // SAFETY: serialized with the other tests touching this variable
        unsafe { std::env::remove_var("MAM_USER_CONFIG_DIR") };
        if let Some(path) = ConfigLoader::user_config_path() {
            assert!(path.to_string_lossy().contains("mam"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }

    #[test]
    #[serial]
    fn test_project_config_path() {
        // SAFETY: serialized with the other tests touching this variable
        unsafe { std::env::remove_var("MAM_PROJECT_CONFIG_DIR") };
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".mam/config.toml"));
    }

    #[test]
    #[serial]
    fn test_user_config_path_override() {
        let dir = TempDir::new().unwrap();
        let path = with_config_dirs(dir.path(), dir.path(), ConfigLoader::user_config_path);
        assert_eq!(path, Some(dir.path().join("config.toml")));
    }

    #[test]
    #[serial]
    fn test_load_layers_user_project_and_explicit() {
        let user_dir = TempDir::new().unwrap();
        std::fs::write(
            user_dir.path().join("config.toml"),
            "round_values_to = 5\n[models.markov]\nvalue_mode = \"monetary\"\n",
        )
        .unwrap();

        let project_dir = TempDir::new().unwrap();
        std::fs::write(
            project_dir.path().join("config.toml"),
            "round_values_to = 1\n[models.shapley]\nsize = 3\n",
        )
        .unwrap();

        let explicit_dir = TempDir::new().unwrap();
        let explicit = explicit_dir.path().join("run.toml");
        std::fs::write(&explicit, "[models.shapley]\norder = true\n").unwrap();

        let config = with_config_dirs(user_dir.path(), project_dir.path(), || {
            ConfigLoader::load(Some(&explicit))
        })
        .unwrap();

        // project overrides user, explicit adds to project
        assert_eq!(config.round_values_to, 1);
        assert_eq!(config.models.shapley.size, 3);
        assert!(config.models.shapley.order);
        // only the user layer sets this
        assert_eq!(config.models.markov.value_mode, ValueMode::Monetary);
        // no layer sets this
        assert_eq!(config.models.markov.eigen_tolerance, 0.001);
    }

    #[test]
    #[serial]
    fn test_load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        let result = with_config_dirs(dir.path(), dir.path(), || {
            ConfigLoader::load(Some(&missing))
        });

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("bad.toml");
        std::fs::write(&explicit, "[models.time_decay]\ndecay_over_time = 1.5\n").unwrap();

        let result = with_config_dirs(dir.path(), dir.path(), || {
            ConfigLoader::load(Some(&explicit))
        });

        assert!(result.is_err());
    }
}
