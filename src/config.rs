use std::{env, fmt::Display, io, path::PathBuf, str::FromStr};

use tracing::{info, warn};

pub const REVIEWS_FILE: &str = "reviews.json";
pub const LEDGER_FILE: &str = "ips.json";
pub const INDEX_FILE: &str = "index.html";

/// Validation limits applied to every submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min_rating: f64,
    pub max_rating: f64,
    pub max_text_len: usize,
    pub max_name_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_rating: 5.0,
            max_text_len: 1000,
            max_name_len: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding `reviews.json` and `ips.json`.
    pub data_dir: PathBuf,
    /// Directory served for every unmatched GET.
    pub static_dir: PathBuf,
    pub limits: Limits,
}

impl Config {
    pub fn load() -> io::Result<Self> {
        Ok(Self {
            port: try_load("PORT", "3000")?,
            data_dir: try_load("DATA_DIR", ".")?,
            static_dir: try_load("STATIC_DIR", "static")?,
            limits: Limits::default(),
        })
    }

    pub fn reviews_path(&self) -> PathBuf {
        self.data_dir.join(REVIEWS_FILE)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.static_dir.join(INDEX_FILE)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> io::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        io::Error::new(io::ErrorKind::InvalidInput, format!("{key}={raw}: {e}"))
    })
}
