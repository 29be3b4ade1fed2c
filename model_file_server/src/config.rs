use std::{
    collections::BTreeSet,
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use crate::error::ServiceError;

/// Subdirectory, next to the executable, that holds the served artifacts.
pub const MODEL_SUBDIR: &str = "models";

pub const DEFAULT_ALLOWED_FILES: &[&str] = &["llama-squint.pte", "tokenizer.model"];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub model_dir: PathBuf,
    pub allowed_files: BTreeSet<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::from_lookup(|key| env::var(key).ok())?)
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr = lookup("SERVER_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));

        let model_dir = match lookup("MODEL_DIR") {
            Some(raw) if !raw.trim().is_empty() => absolutize(Path::new(raw.trim()))?,
            _ => default_model_dir()?,
        };

        let allowed_files = match lookup("ALLOWED_FILES") {
            Some(raw) => parse_allowed_files(&raw),
            None => DEFAULT_ALLOWED_FILES.iter().map(|s| s.to_string()).collect(),
        };
        if allowed_files.is_empty() {
            return Err(ServiceError::Config(
                "ALLOWED_FILES must name at least one file".into(),
            ));
        }

        Ok(Self {
            listen_addr,
            model_dir,
            allowed_files,
        })
    }
}

fn parse_allowed_files(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn default_model_dir() -> Result<PathBuf, ServiceError> {
    let exe = env::current_exe()?;
    let base = exe.parent().unwrap_or_else(|| Path::new("."));
    absolutize(&base.join(MODEL_SUBDIR))
}

fn absolutize(path: &Path) -> Result<PathBuf, ServiceError> {
    Ok(std::path::absolute(path)?)
}
