use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Conversion settings
// ---------------------------------------------------------------------------

/// Knobs for engine start-up, primary queries, preview and export.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// How many times to probe for the engine before giving up.
    pub engine_attempts: u32,
    /// Pause between engine probes.
    pub engine_delay: Duration,
    /// Row limit for the primary-path attribute + geometry query.
    pub row_limit: u32,
    /// Spatial reference every primary result is reprojected into.
    pub target_srs: String,
    /// Delay before re-trying a display on a map that is not ready yet.
    pub preview_retry: Duration,
    /// Download name of the standalone HTML map.
    pub html_filename: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            engine_attempts: 100,
            engine_delay: Duration::from_millis(100),
            row_limit: 5000,
            target_srs: "EPSG:4326".to_string(),
            preview_retry: Duration::from_millis(500),
            html_filename: "cloud-native-map.html".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Defaults overridden by `GEOGATE_ENGINE_ATTEMPTS`, `GEOGATE_ENGINE_DELAY_MS`
    /// and `GEOGATE_ROW_LIMIT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            engine_attempts: env_var("GEOGATE_ENGINE_ATTEMPTS", defaults.engine_attempts),
            engine_delay: Duration::from_millis(env_var(
                "GEOGATE_ENGINE_DELAY_MS",
                defaults.engine_delay.as_millis() as u64,
            )),
            row_limit: env_var("GEOGATE_ROW_LIMIT", defaults.row_limit),
            ..defaults
        }
    }
}

// ---------------------------------------------------------------------------
// HTTPS server settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Directory served as static assets.
    pub root: PathBuf,
    /// Subject name of the generated self-signed certificate.
    pub subject: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3443)),
            root: PathBuf::from("."),
            subject: "localhost".to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `GEOGATE_ADDR` and `GEOGATE_ROOT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let addr = match env::var("GEOGATE_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                log::warn!("ignoring invalid GEOGATE_ADDR {raw:?}: {err}");
                defaults.addr
            }),
            Err(_) => defaults.addr,
        };
        let root = env::var("GEOGATE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.root);
        Self {
            addr,
            root,
            subject: defaults.subject,
        }
    }
}

/// `key` parsed as `T`; unset or unparsable values give `default`.
fn env_var<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|err| {
            log::warn!("ignoring invalid {key} {raw:?}: {err}");
            default
        }),
        Err(_) => default,
    }
}
