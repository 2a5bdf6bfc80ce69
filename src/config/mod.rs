use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "PUBLIC_SUPABASE_URL";
pub const ACCESS_KEY_ENV: &str = "PUBLIC_SUPABASE_ANON_KEY";
pub const DEFAULT_TABLE: &str = "control";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing store setting: set {var} (or `{key}` in the config file)")]
    Missing { var: &'static str, key: &'static str },

    #[error("config file not found '{path}'")]
    NotFound { path: String },

    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write config '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config path '{path}'")]
    InvalidPath { path: String },
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(alias = "supabase_url")]
    pub endpoint: Option<String>,
    #[serde(alias = "supabase_anon_key")]
    pub access_key: Option<String>,
    pub table: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub export_dir: Option<String>,
    pub font_dir: Option<String>,
    pub font_family: Option<String>,
    pub no_color: Option<bool>,
}

/// Endpoint and key for the hosted table, both required.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCredentials {
    pub endpoint: String,
    pub access_key: String,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".prodcontrol").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &Path, allow_missing: bool) -> Result<ConfigFile, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            serde_yaml::from_str::<ConfigFile>(&contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                source: e,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound {
            path: path.display().to_string(),
        }),
        Err(e) => Err(ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Environment wins over the config file; a value blank in both is fatal.
pub fn resolve_credentials<F>(cfg: &ConfigFile, lookup: F) -> Result<StoreCredentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = non_blank(lookup(ENDPOINT_ENV))
        .or_else(|| non_blank(cfg.endpoint.clone()))
        .ok_or(ConfigError::Missing {
            var: ENDPOINT_ENV,
            key: "endpoint",
        })?;
    let access_key = non_blank(lookup(ACCESS_KEY_ENV))
        .or_else(|| non_blank(cfg.access_key.clone()))
        .ok_or(ConfigError::Missing {
            var: ACCESS_KEY_ENV,
            key: "access_key",
        })?;
    Ok(StoreCredentials {
        endpoint,
        access_key,
    })
}

fn default_config_yaml() -> String {
    r#"# prodcontrol config
#
# Location (default):
#   ~/.prodcontrol/config.yml

# Store (the environment variables PUBLIC_SUPABASE_URL and
# PUBLIC_SUPABASE_ANON_KEY take precedence over these)
# endpoint: https://your-project.supabase.co
# access_key: your-anon-key
table: control

# HTTP (optional; no timeout unless set)
# timeout: 30
# proxy: http://127.0.0.1:8080

# Export
export_dir: .
font_dir: ./fonts
font_family: LiberationSans

# Output styling
no_color: false
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path.parent().ok_or_else(|| ConfigError::InvalidPath {
        path: path.display().to_string(),
    })?;
    std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
        path: parent.display().to_string(),
        source: e,
    })?;
    std::fs::write(path, default_config_yaml()).map_err(|e| ConfigError::Write {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(true)
}
