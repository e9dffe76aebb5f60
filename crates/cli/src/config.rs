use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use razao_import::Categorizer;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub log_filter: String,
    pub format: OutputFormat,
    /// TOML file of `[[rules]]`; relative paths resolve against the config file.
    pub category_rules: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_filter: "info".to_string(),
            format: OutputFormat::Text,
            category_rules: None,
        }
    }
}

impl Config {
    /// `--config` when given (must exist), else the per-user config file when
    /// present, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Config> {
        if let Some(path) = explicit {
            return Config::from_file(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Config::from_file(&path),
            _ => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        if let (Some(rules), Some(dir)) = (&config.category_rules, path.parent()) {
            if rules.is_relative() {
                config.category_rules = Some(dir.join(rules));
            }
        }
        Ok(config)
    }

    pub fn categorizer(&self) -> anyhow::Result<Categorizer> {
        let Some(path) = &self.category_rules else {
            return Ok(Categorizer::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read category rules {}", path.display()))?;
        Categorizer::from_toml(&text)
            .with_context(|| format!("Invalid category rules {}", path.display()))
    }
}

pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("br", "razao", "Razao")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use razao_import::Category;
    use std::io::Write;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "");
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn reads_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "config.toml",
            "log_filter = \"razao_import=debug\"\nformat = \"json\"\ncategory_rules = \"rules.toml\"\n",
        );
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.log_filter, "razao_import=debug");
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.category_rules, Some(dir.path().join("rules.toml")));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.toml", "colour = true\n");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config"));
    }

    #[test]
    fn custom_rules_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "rules.toml",
            "[[rules]]\ncategory = \"FEE\"\nkeywords = [\"iof\"]\n",
        );
        let path = write(dir.path(), "config.toml", "category_rules = \"rules.toml\"\n");

        let categorizer = Config::from_file(&path).unwrap().categorizer().unwrap();
        assert_eq!(categorizer.categorize("IOF"), Category::Fee);
        assert_eq!(categorizer.categorize("pix"), Category::Other);
    }

    #[test]
    fn no_rules_path_uses_builtin_table() {
        let categorizer = Config::default().categorizer().unwrap();
        assert_eq!(categorizer, Categorizer::default());
    }
}
