//! Layered bring-up configuration: built-in defaults, optionally overridden
//! by a TOML file, with CLI flags taking final precedence. Mirrors the
//! teacher's `OnceLock<Config>` + `serde`/`toml` setup in shape, but scoped
//! only to bring-up parameters — filter state (remap table, transpose,
//! tuning) is never persisted here, since that survives only in memory for
//! the lifetime of one run.

use std::sync::OnceLock;

use serde::Deserialize;

static CONFIG: OnceLock<Config> = OnceLock::new();

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client_name: String,
    pub input_port_name: String,
    pub output_port_name: String,
    pub outbound_ring_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_name: "zynmidi-router".to_string(),
            input_port_name: "input".to_string(),
            output_port_name: "output".to_string(),
            outbound_ring_capacity: crate::ring::OUTBOUND_RING_CAPACITY,
        }
    }
}

pub fn init(config: Config) {
    CONFIG.set(config).ok();
}

pub fn get() -> Config {
    CONFIG.get().cloned().unwrap_or_default()
}

/// Read `path` as TOML and merge it over the built-in defaults. Logs and
/// falls back to defaults on any read/parse failure rather than failing
/// bring-up over an optional file.
pub fn load_file(path: &std::path::Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<Config>(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("failed to parse {}: {e}", path.display());
                Config::default()
            }
        },
        Err(e) => {
            log::warn!("failed to read {}: {e}", path.display());
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.client_name, "zynmidi-router");
        assert_eq!(cfg.outbound_ring_capacity, crate::ring::OUTBOUND_RING_CAPACITY);
    }

    #[test]
    fn load_file_falls_back_on_missing_file() {
        let cfg = load_file(std::path::Path::new("/nonexistent/path/config.toml"));
        assert_eq!(cfg.client_name, "zynmidi-router");
    }

    #[test]
    fn load_file_parses_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "client_name = \"custom\"\n").unwrap();
        let cfg = load_file(&path);
        assert_eq!(cfg.client_name, "custom");
        assert_eq!(cfg.input_port_name, "input");
    }
}
