use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    /// Load `~/.llm-guard/config.toml`, writing defaults on first run.
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_path = home.join(".llm-guard").join("config.toml");
        Self::load_or_init_at(&config_path)
    }

    /// Load the config at `config_path`; its parent directory becomes the
    /// root of the workspace.
    pub fn load_or_init_at(config_path: &Path) -> Result<Self> {
        let guard_dir = config_path
            .parent()
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf);

        if !guard_dir.exists() {
            fs::create_dir_all(&guard_dir).context("Failed to create config directory")?;
        }
        let workspace_dir = guard_dir.join("workspace");
        fs::create_dir_all(&workspace_dir).context("Failed to create workspace directory")?;

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path = config_path.to_path_buf();
            config.workspace_dir = workspace_dir;
            config
        } else {
            let config = Self {
                config_path: config_path.to_path_buf(),
                workspace_dir,
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
