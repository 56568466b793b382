use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use spectator_session::SessionConfig;
use spectator_system_playback::PlaybackConfig;
use spectator_world::CoordinatePolicy;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub(crate) const DEFAULT_CONFIG_FILE: &str = "spectator.toml";

const DEFAULT_STREAM_URL: &str = "ws://localhost:8080/replay/stream";
const DEFAULT_WINDOW_TITLE: &str = "Replay Spectator";
const DEFAULT_WINDOW_SIZE: i32 = 960;

/// Settings read from `spectator.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpectatorConfig {
    pub(crate) playback: PlaybackConfig,
    pub(crate) coordinates: CoordinatesConfig,
    pub(crate) window: WindowConfig,
    pub(crate) stream: StreamConfig,
}

/// Whether terrain and broadcast locations arrive relative to the map origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CoordinatesConfig {
    pub(crate) terrain_relative: bool,
    pub(crate) broadcast_relative: bool,
}

impl Default for CoordinatesConfig {
    fn default() -> Self {
        Self {
            terrain_relative: true,
            broadcast_relative: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct WindowConfig {
    pub(crate) title: String,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) vsync: bool,
    pub(crate) show_fps: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_WINDOW_TITLE.to_owned(),
            width: DEFAULT_WINDOW_SIZE,
            height: DEFAULT_WINDOW_SIZE,
            vsync: true,
            show_fps: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct StreamConfig {
    /// Replay stream endpoint used when `stream` is given no URL.
    pub(crate) url: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_owned(),
        }
    }
}

impl SpectatorConfig {
    /// Loads the configuration from `path`, or from `spectator.toml` in the
    /// working directory when it exists, falling back to defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    debug!("no configuration file; using defaults");
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse configuration")
    }

    /// Session settings derived from the playback and coordinate sections.
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            playback: self.playback,
            coordinates: CoordinatePolicy::new(
                self.coordinates.terrain_relative,
                self.coordinates.broadcast_relative,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = SpectatorConfig::parse("").expect("parses");
        assert_eq!(config, SpectatorConfig::default());
        assert_eq!(config.playback.ms_per_round, 200);
        assert_eq!(config.stream.url, DEFAULT_STREAM_URL);
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn sections_override_individual_fields() {
        let config = SpectatorConfig::parse(
            r#"
            [playback]
            ms_per_round = 50

            [coordinates]
            broadcast_relative = false

            [window]
            title = "Finals"
            show_fps = true
            "#,
        )
        .expect("parses");

        assert_eq!(config.playback.ms_per_round, 50);
        assert_eq!(config.playback.max_rounds, 2000);
        assert_eq!(config.window.title, "Finals");
        assert!(config.window.show_fps);
        assert!(config.window.vsync);

        let session = config.session_config();
        assert!(session.coordinates.terrain_relative());
        assert!(!session.coordinates.broadcast_relative());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = SpectatorConfig::parse("[playback]\nspeed = 2\n").expect_err("rejected");
        assert!(format!("{error:#}").contains("speed"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let error = SpectatorConfig::load(Some(Path::new("/nonexistent/spectator.toml")))
            .expect_err("missing file");
        assert!(error.to_string().contains("failed to read configuration"));
    }
}
