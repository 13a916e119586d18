use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

// Catalog service configuration sourced from environment variables, with an
// optional YAML file layered on top.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    /// Absolute base URL used for hypermedia links, `Location` headers and
    /// uploaded file URLs.
    pub public_url: String,
    pub files_root: PathBuf,
    pub cache_ttl: Duration,
    /// Upper bound on cached responses; least recently read entries go first.
    pub cache_capacity: NonZeroUsize,
    pub capability_ttl: Duration,
    /// Hex encoded Ed25519 seed. A random key is generated when absent.
    pub signing_seed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    public_url: Option<String>,
    files_root: Option<PathBuf>,
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<NonZeroUsize>,
    capability_ttl_secs: Option<u64>,
    signing_seed: Option<String>,
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("CATALOG_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse CATALOG_BIND")?;
        let metrics_bind = std::env::var("CATALOG_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse CATALOG_METRICS_BIND")?;
        let public_url = std::env::var("CATALOG_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let files_root = std::env::var("CATALOG_FILES_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/files"));
        let cache_ttl_secs: u64 = std::env::var("CATALOG_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .with_context(|| "parse CATALOG_CACHE_TTL_SECS")?;
        let cache_capacity: NonZeroUsize = std::env::var("CATALOG_CACHE_CAPACITY")
            .unwrap_or_else(|_| "1024".to_string())
            .parse()
            .with_context(|| "parse CATALOG_CACHE_CAPACITY")?;
        let capability_ttl_secs: u64 = std::env::var("CATALOG_CAPABILITY_TTL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .with_context(|| "parse CATALOG_CAPABILITY_TTL_SECS")?;
        let signing_seed = std::env::var("CATALOG_SIGNING_SEED").ok();
        Ok(Self {
            bind_addr,
            metrics_bind,
            public_url,
            files_root,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_capacity,
            capability_ttl: Duration::from_secs(capability_ttl_secs),
            signing_seed,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("CATALOG_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read CATALOG_CONFIG: {path}"))?;
            let override_cfg: CatalogConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse catalog config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.public_url {
                config.public_url = value;
            }
            if let Some(value) = override_cfg.files_root {
                config.files_root = value;
            }
            if let Some(value) = override_cfg.cache_ttl_secs {
                config.cache_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.cache_capacity {
                config.cache_capacity = value;
            }
            if let Some(value) = override_cfg.capability_ttl_secs {
                config.capability_ttl = Duration::from_secs(value);
            }
            if let Some(value) = override_cfg.signing_seed {
                config.signing_seed = Some(value);
            }
        }
        Ok(config)
    }
}
