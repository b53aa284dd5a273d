//! Centralized configuration and builder for PageSeal.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - SealConfig::from_env() reads the PS_* env vars; fluent with_* setters
//!   override specific fields.
//!
//! Tunables:
//! - page_size (ENV PS_PAGE_SIZE, default 4096)
//! - reserve (ENV PS_RESERVE, default 0) — initial reserved tail bytes per page
//! - data_fsync (ENV PS_DATA_FSYNC, default true) — fsync after page writes

use std::fmt;

use crate::consts::DEFAULT_PAGE_SIZE;

/// Top-level configuration for PageSeal pagers/connections.
#[derive(Clone, Debug)]
pub struct SealConfig {
    /// Page size in bytes for newly created databases.
    /// Env: PS_PAGE_SIZE (default 4096)
    pub page_size: u32,

    /// Initial reserved bytes at the tail of each page (codec metadata area).
    /// Env: PS_RESERVE (default 0)
    pub reserve: u32,

    /// Whether to fsync the backing file after every page write.
    /// Env: PS_DATA_FSYNC (default true; "0|false|off|no" => false)
    pub data_fsync: bool,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            reserve: 0,
            data_fsync: true,
        }
    }
}

impl SealConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("PS_PAGE_SIZE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.page_size = n;
            }
        }

        if let Ok(v) = std::env::var("PS_RESERVE") {
            if let Ok(n) = v.trim().parse::<u32>() {
                cfg.reserve = n;
            }
        }

        if let Ok(v) = std::env::var("PS_DATA_FSYNC") {
            let s = v.trim().to_ascii_lowercase();
            cfg.data_fsync = !(s == "0" || s == "false" || s == "off" || s == "no");
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_page_size(mut self, ps: u32) -> Self {
        self.page_size = ps;
        self
    }

    pub fn with_reserve(mut self, reserve: u32) -> Self {
        self.reserve = reserve;
        self
    }

    pub fn with_data_fsync(mut self, on: bool) -> Self {
        self.data_fsync = on;
        self
    }
}

impl fmt::Display for SealConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SealConfig {{ page_size: {}, reserve: {}, data_fsync: {} }}",
            self.page_size, self.reserve, self.data_fsync
        )
    }
}
