use anyhow::{Context, Result};
use crate::error::MuxError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const KEY_SESSION_FILE_ENABLED: &str = "session_file_enabled";
const KEY_ATTACH_AFTER_CREATION: &str = "attach_after_creation";
const KEY_SESSION_FILE: &str = "session_file";
const KEY_CONFIG_FILE: &str = "config_file";

/// Manager settings, persisted as flat `key=value` lines. The file is
/// rewritten wholesale on every change; there is no atomic replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub session_file_enabled: bool,
    pub attach_after_creation: bool,
    pub session_file: PathBuf,
    pub config_file: PathBuf,
}

impl Config {
    pub fn defaults(config_file: PathBuf) -> Self {
        let base = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Config {
            session_file_enabled: false,
            attach_after_creation: false,
            session_file: base.join("sessions.json"),
            config_file,
        }
    }

    pub fn default_config_file() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to locate home directory")?;
        Ok(home.join(".muxman").join("config"))
    }

    /// Reads the config file, falling back to defaults when it is missing,
    /// unreadable, or corrupt. A missing file is persisted immediately so it
    /// exists for the next run; a bad one is left alone and only warned about.
    pub fn load(path: &Path) -> Config {
        let defaults = Config::defaults(path.to_path_buf());

        if !path.exists() {
            if let Err(err) = defaults.save() {
                warn!("could not write default config to {}: {err}", path.display());
            }
            return defaults;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!("config file {} is unreadable ({err}), using defaults", path.display());
                return defaults;
            }
        };

        match Config::parse(&content, path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}, using defaults");
                defaults
            }
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Config, MuxError> {
        let mut config = Config::defaults(path.to_path_buf());
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                MuxError::ConfigLoad {
                    path: path.to_path_buf(),
                    detail: format!("expected key=value, got '{line}'"),
                }
            })?;
            match key {
                KEY_SESSION_FILE_ENABLED => {
                    config.session_file_enabled = parse_bool(path, key, value)?;
                }
                KEY_ATTACH_AFTER_CREATION => {
                    config.attach_after_creation = parse_bool(path, key, value)?;
                }
                KEY_SESSION_FILE => config.session_file = PathBuf::from(value),
                // The file's own location is decided by the caller; the key is
                // written back for visibility but never honored on load.
                KEY_CONFIG_FILE => {}
                _ => {
                    return Err(MuxError::ConfigLoad {
                        path: path.to_path_buf(),
                        detail: format!("unknown key '{key}'"),
                    })
                }
            }
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.config_file.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let content = format!(
            "{KEY_SESSION_FILE_ENABLED}={}\n{KEY_ATTACH_AFTER_CREATION}={}\n{KEY_SESSION_FILE}={}\n{KEY_CONFIG_FILE}={}\n",
            self.session_file_enabled,
            self.attach_after_creation,
            self.session_file.display(),
            self.config_file.display(),
        );
        fs::write(&self.config_file, content)
            .with_context(|| format!("Failed to write to file: {}", self.config_file.display()))?;
        Ok(())
    }

    pub fn toggle_session_file(&mut self) -> Result<()> {
        self.session_file_enabled = !self.session_file_enabled;
        self.save()
    }

    pub fn toggle_attach_after_creation(&mut self) -> Result<()> {
        self.attach_after_creation = !self.attach_after_creation;
        self.save()
    }
}

fn parse_bool(
    path: &Path,
    key: &str,
    value: &str,
) -> Result<bool, MuxError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(MuxError::ConfigLoad {
            path: path.to_path_buf(),
            detail: format!("{key} must be true or false, got '{value}'"),
        }),
    }
}
