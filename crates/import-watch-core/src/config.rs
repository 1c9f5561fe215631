use crate::error::Error;
use crate::model::{AdminCredential, WatchTarget};
use crate::resolver::DescriptorLayout;
use crate::service::ServiceSettings;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub watch_list: PathBuf,
    pub suffix_file: String,
    pub window_hours: f64,
    pub companion_glob: String,
    #[serde(default)]
    pub descriptor: DescriptorLayout,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

#[derive(Clone, Default, Deserialize)]
pub struct AdminSettings {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSettings")
            .field("user", &self.user)
            .field("password", &"********")
            .finish()
    }
}

impl AppConfig {
    /// Settings for a run that talks to the service; the host must be set.
    pub fn service_settings(&self) -> Result<&ServiceSettings, Error> {
        if !self.service.has_host() {
            return Err(Error::MissingSetting("service.host"));
        }
        Ok(&self.service)
    }

    pub fn admin_credential(&self) -> Result<AdminCredential, Error> {
        let user = self.admin.user.trim();
        if user.is_empty() {
            return Err(Error::MissingCredential("admin.user is not set".to_string()));
        }
        if self.admin.password.is_empty() {
            return Err(Error::MissingCredential(
                "admin.password is not set".to_string(),
            ));
        }
        Ok(AdminCredential {
            user: user.to_string(),
            secret: self.admin.password.clone(),
        })
    }
}

/// Read `Config.toml` (or `path`), then `IMPORT_WATCH__*` environment overrides.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };
    let builder = Config::builder()
        .set_default("watch_list", "watch_list.txt")?
        .set_default("suffix_file", ".import_suffixes")?
        .set_default("window_hours", 24.0)?
        .set_default("companion_glob", "README*")?
        .add_source(file)
        .add_source(Environment::with_prefix("IMPORT_WATCH").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Build one target per watch-list entry, reading each directory's suffix file.
pub fn load_watch_targets(watch_list: &Path, suffix_file: &str) -> Result<Vec<WatchTarget>, Error> {
    let text = fs::read_to_string(watch_list).map_err(|source| Error::WatchList {
        path: watch_list.to_path_buf(),
        source,
    })?;

    let targets: Vec<WatchTarget> = parse_watch_list(&text)
        .into_iter()
        .map(|root| {
            let suffixes = read_suffix_file(&root.join(suffix_file));
            WatchTarget { root, suffixes }
        })
        .collect();

    if targets.is_empty() {
        return Err(Error::NoWatchTargets(watch_list.to_path_buf()));
    }
    Ok(targets)
}

pub fn parse_watch_list(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect()
}

/// Lower-cased, de-duplicated suffixes; whitespace or comma separated.
pub fn parse_suffixes(text: &str) -> Vec<String> {
    let mut suffixes: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or_default();
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            let token = token.trim().to_lowercase();
            if !token.is_empty() && !suffixes.contains(&token) {
                suffixes.push(token);
            }
        }
    }
    suffixes
}

fn read_suffix_file(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => parse_suffixes(&text),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                debug!("Cannot read {}: {}", path.display(), err);
            }
            Vec::new()
        }
    }
}
