// config.rs - relay settings from the environment (optionally seeded from .env)
use anyhow::{anyhow, bail, Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::gemini::DEFAULT_BASE_URL;
use crate::relay::ModelNames;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_BODY_LIMIT_MB: usize = 50;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key:          String,
    pub bind:             IpAddr,
    pub port:             u16,
    pub gemini_base_url:  String,
    pub models:           ModelNames,
    pub body_limit_bytes: usize,
}

impl RelayConfig {
    /// Read the process environment after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            log::info!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("API_KEY").ok_or_else(|| anyhow!("API_KEY environment variable is not set"))?;

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("PORT must be a port number, got '{}'", raw))?,
            None => DEFAULT_PORT,
        };

        let bind = match get("MIXER_BIND") {
            Some(raw) => raw.parse::<IpAddr>().with_context(|| format!("MIXER_BIND is not an IP address: '{}'", raw))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let body_limit_mb = match get("MIXER_BODY_LIMIT_MB") {
            Some(raw) => raw.parse::<usize>().with_context(|| format!("MIXER_BODY_LIMIT_MB must be an integer, got '{}'", raw))?,
            None => DEFAULT_BODY_LIMIT_MB,
        };
        if body_limit_mb == 0 {
            bail!("MIXER_BODY_LIMIT_MB must be greater than zero");
        }

        let defaults = ModelNames::default();
        Ok(Self {
            api_key,
            bind,
            port,
            gemini_base_url:  get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            models: ModelNames {
                image: get("MIXER_IMAGE_MODEL").unwrap_or(defaults.image),
                text:  get("MIXER_TEXT_MODEL").unwrap_or(defaults.text),
            },
            body_limit_bytes: body_limit_mb * 1024 * 1024,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
