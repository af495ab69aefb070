//! Service configuration.
//!
//! Values come from `PERSONAS_*` environment variables; the server binary lets
//! command-line flags override them. Unset values fall back to defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};

use crate::storage::{ObjectLocation, StoreBackend};

pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_BUCKET: &str = "sistoperat-fastapi-h3x";
pub const DEFAULT_KEY: &str = "personas.csv";
pub const DEFAULT_LOCAL_ROOT: &str = "data";

pub const USAGE: &str = "personas server

USAGE:
  personas_server [--http-port N] [--bind ADDR] [--bucket NAME] [--key KEY] [--backend s3|local|memory] [--local-root PATH]

OPTIONS:
  --http-port N       HTTP port (env: PERSONAS_HTTP_PORT, default 8000)
  --bind ADDR         Bind address (env: PERSONAS_BIND_ADDR, default 0.0.0.0)
  --bucket NAME       Bucket holding the dataset (env: PERSONAS_BUCKET, default sistoperat-fastapi-h3x)
  --key KEY           Object key of the CSV dataset (env: PERSONAS_KEY, default personas.csv)
  --backend KIND      Object store backend (env: PERSONAS_BACKEND, default s3)
  --local-root PATH   Root folder for the local backend (env: PERSONAS_LOCAL_ROOT, default data)
";

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub bind_addr: String,
    pub bucket: String,
    pub key: String,
    pub backend: StoreBackend,
    pub local_root: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            key: DEFAULT_KEY.to_string(),
            backend: StoreBackend::S3,
            local_root: PathBuf::from(DEFAULT_LOCAL_ROOT),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by any `PERSONAS_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("PERSONAS_HTTP_PORT") { cfg.http_port = parse_port(&v, "PERSONAS_HTTP_PORT")?; }
        if let Some(v) = lookup("PERSONAS_BIND_ADDR") { cfg.bind_addr = v; }
        if let Some(v) = lookup("PERSONAS_BUCKET") { cfg.bucket = v; }
        if let Some(v) = lookup("PERSONAS_KEY") { cfg.key = v; }
        if let Some(v) = lookup("PERSONAS_BACKEND") { cfg.backend = parse_backend(&v, "PERSONAS_BACKEND")?; }
        if let Some(v) = lookup("PERSONAS_LOCAL_ROOT") { cfg.local_root = PathBuf::from(v); }
        cfg.check()?;
        Ok(cfg)
    }

    /// Apply command-line flags on top of the current values.
    pub fn apply_args(mut self, args: &[String]) -> Result<Self> {
        if let Some(v) = flag_value(args, "--http-port")? { self.http_port = parse_port(&v, "--http-port")?; }
        if let Some(v) = flag_value(args, "--bind")? { self.bind_addr = v; }
        if let Some(v) = flag_value(args, "--bucket")? { self.bucket = v; }
        if let Some(v) = flag_value(args, "--key")? { self.key = v; }
        if let Some(v) = flag_value(args, "--backend")? { self.backend = parse_backend(&v, "--backend")?; }
        if let Some(v) = flag_value(args, "--local-root")? { self.local_root = PathBuf::from(v); }
        self.check()?;
        Ok(self)
    }

    pub fn location(&self) -> ObjectLocation {
        ObjectLocation::new(self.bucket.clone(), self.key.clone())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.http_port)
            .parse()
            .map_err(|e| anyhow!("invalid bind address '{}:{}': {}", self.bind_addr, self.http_port, e))
    }

    fn check(&self) -> Result<()> {
        if self.bucket.trim().is_empty() { bail!("bucket name must not be empty"); }
        if self.key.trim().is_empty() { bail!("object key must not be empty"); }
        Ok(())
    }
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn flag_value(args: &[String], flag: &str) -> Result<Option<String>> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return match args.get(i + 1) {
                Some(v) if !v.starts_with("--") => Ok(Some(v.clone())),
                _ => Err(anyhow!("{} requires a value", flag)),
            };
        }
        i += 1;
    }
    Ok(None)
}

fn parse_port(v: &str, what: &str) -> Result<u16> {
    v.trim().parse::<u16>().map_err(|_| anyhow!("{}: '{}' is not a valid port", what, v))
}

fn parse_backend(v: &str, what: &str) -> Result<StoreBackend> {
    StoreBackend::parse(v).ok_or_else(|| anyhow!("{}: unknown backend '{}' (expected s3, local or memory)", what, v))
}
