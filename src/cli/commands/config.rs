//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command against the file at `config_path`.
pub fn run_config(action: &ConfigAction, mut settings: Settings, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&settings)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            println!("{}", toml_str);
        }

        ConfigAction::Set { key, value } => {
            settings.set_value(key, value)?;
            settings.save_to(config_path)?;
            Output::success(&format!("Set {} = {}", key, value));
            Output::kv("Config file", &config_path.display().to_string());
        }

        ConfigAction::Path => {
            println!("{}", config_path.display());
        }

        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                Output::warning(&format!(
                    "Config already exists at {} (use --force to overwrite)",
                    config_path.display()
                ));
                return Ok(());
            }

            Settings::default().save_to(config_path)?;
            Output::success(&format!("Wrote default config to {}", config_path.display()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_persists_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run_config(
            &ConfigAction::Set {
                key: "assistant.max_rounds".to_string(),
                value: "4".to_string(),
            },
            Settings::default(),
            &path,
        )
        .unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.assistant.max_rounds, 4);
    }

    #[test]
    fn test_init_does_not_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[assistant]\nmax_rounds = 3\n").unwrap();

        run_config(&ConfigAction::Init { force: false }, Settings::default(), &path).unwrap();
        assert_eq!(Settings::load_from(Some(&path)).unwrap().assistant.max_rounds, 3);

        run_config(&ConfigAction::Init { force: true }, Settings::default(), &path).unwrap();
        assert_eq!(Settings::load_from(Some(&path)).unwrap().assistant.max_rounds, 2);
    }
}
