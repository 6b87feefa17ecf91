use serde::Deserialize;

// =======================================================
// SERVER SECTION + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// TCP port the camera server listens on.
    pub port: u16,
    /// Display name advertised in the Server header and status payload.
    pub server_name: String,
    /// Attach CORS headers to every response and answer OPTIONS preflights.
    pub cors_enabled: bool,
    /// Maximum accepted request body size in bytes.
    pub max_request_body_bytes: u64,
    /// Idle timeout for socket reads, in seconds.
    pub idle_timeout_secs: u64,
    /// Directory holding captured photos and videos.
    pub photos_dir: String,
    /// Cap on concurrently served connections.
    pub max_connections: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: 8089,
            server_name: "glasscam".into(),
            cors_enabled: true,
            max_request_body_bytes: 10 * 1024 * 1024,
            idle_timeout_secs: 30,
            photos_dir: "./photos".into(),
            max_connections: 256,
        }
    }
}

// =======================================================
// RATE LIMIT SECTION + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Requests admitted per client within one window.
    pub max_requests: u32,
    /// Sliding window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

// =======================================================
// CACHE SECTION + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Maximum number of live cache entries before LRU eviction.
    pub max_entries: usize,
    /// Default TTL for cached payloads in milliseconds. 0 = no expiry.
    pub default_ttl_millis: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: 50,
            default_ttl_millis: 0,
        }
    }
}

// =======================================================
// CAM CONFIG — main config
// =======================================================
#[derive(Debug, Clone, Deserialize)]
pub struct CamConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub rate_limit: RateLimitSection,

    #[serde(default)]
    pub cache: CacheSection,
}

impl Default for CamConfig {
    fn default() -> Self {
        let mut cfg = Self {
            server: ServerSection::default(),
            rate_limit: RateLimitSection::default(),
            cache: CacheSection::default(),
        };
        cfg.apply_defaults();
        cfg
    }
}

impl CamConfig {
    pub fn port(&self) -> u16 {
        self.server.port
    }

    pub fn server_name(&self) -> &str {
        &self.server.server_name
    }

    pub fn cors_enabled(&self) -> bool {
        self.server.cors_enabled
    }

    pub fn max_request_body_bytes(&self) -> u64 {
        self.server.max_request_body_bytes
    }

    pub fn idle_timeout_secs(&self) -> u64 {
        self.server.idle_timeout_secs
    }

    pub fn photos_dir(&self) -> &str {
        &self.server.photos_dir
    }

    pub fn max_connections(&self) -> u16 {
        self.server.max_connections
    }

    pub fn rate_limit_max_requests(&self) -> u32 {
        self.rate_limit.max_requests
    }

    pub fn rate_limit_window_secs(&self) -> u64 {
        self.rate_limit.window_secs
    }

    pub fn cache_max_entries(&self) -> usize {
        self.cache.max_entries
    }

    pub fn cache_default_ttl_millis(&self) -> u64 {
        self.cache.default_ttl_millis
    }

    pub fn from_file(file_name: &str) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::new(file_name, config::FileFormat::Ini).required(false))
            .build()?;

        let mut cfg: CamConfig = built.try_deserialize()?;

        cfg.apply_defaults();
        Ok(cfg)
    }

    pub fn from_file_or_default(file_name: &str) -> Self {
        match Self::from_file(file_name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error reading config '{file_name}': {e}");
                eprintln!("Continuing with default config (in-memory)...");
                CamConfig::default()
            }
        }
    }

    // Zero/empty values from a partially-filled INI file fall back to
    // the built-in defaults.
    fn apply_defaults(&mut self) {
        let def_server = ServerSection::default();

        if self.server.port == 0 {
            self.server.port = def_server.port;
        }
        if self.server.server_name.is_empty() {
            self.server.server_name = def_server.server_name.clone();
        }
        if self.server.max_request_body_bytes == 0 {
            self.server.max_request_body_bytes = def_server.max_request_body_bytes;
        }
        if self.server.idle_timeout_secs == 0 {
            self.server.idle_timeout_secs = def_server.idle_timeout_secs;
        }
        if self.server.photos_dir.is_empty() {
            self.server.photos_dir = def_server.photos_dir.clone();
        }
        if self.server.max_connections == 0 {
            self.server.max_connections = def_server.max_connections;
        }

        let def_rate = RateLimitSection::default();

        if self.rate_limit.max_requests == 0 {
            self.rate_limit.max_requests = def_rate.max_requests;
        }
        if self.rate_limit.window_secs == 0 {
            self.rate_limit.window_secs = def_rate.window_secs;
        }

        let def_cache = CacheSection::default();

        if self.cache.max_entries == 0 {
            self.cache.max_entries = def_cache.max_entries;
        }
        // default_ttl_millis == 0 is meaningful (no expiry); leave as-is.
    }
}

#[cfg(test)]
mod tests {
    use super::{CamConfig, RateLimitSection, ServerSection};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = CamConfig::default();
        assert_eq!(cfg.port(), 8089);
        assert!(cfg.cors_enabled());
        assert_eq!(cfg.rate_limit_max_requests(), 100);
        assert_eq!(cfg.rate_limit_window_secs(), 60);
        assert_eq!(cfg.cache_max_entries(), 50);
        assert_eq!(cfg.cache_default_ttl_millis(), 0);
    }

    #[test]
    fn apply_defaults_backfills_zero_values() {
        let mut cfg = CamConfig {
            server: ServerSection {
                port: 0,
                server_name: String::new(),
                max_request_body_bytes: 0,
                ..ServerSection::default()
            },
            rate_limit: RateLimitSection {
                max_requests: 0,
                window_secs: 0,
            },
            cache: Default::default(),
        };
        cfg.apply_defaults();

        assert_eq!(cfg.port(), 8089);
        assert_eq!(cfg.server_name(), "glasscam");
        assert_eq!(cfg.max_request_body_bytes(), 10 * 1024 * 1024);
        assert_eq!(cfg.rate_limit_max_requests(), 100);
        assert_eq!(cfg.rate_limit_window_secs(), 60);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = CamConfig::from_file_or_default("does-not-exist.conf");
        assert_eq!(cfg.port(), 8089);
        assert_eq!(cfg.photos_dir(), "./photos");
    }
}
