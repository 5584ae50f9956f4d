//! Configuration structs with sensible defaults and RON persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level game configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Mining timers, reach, and targeting grace periods.
    pub mining: MiningConfig,
    /// Local movement and collision tuning.
    pub movement: MovementConfig,
    /// Remote player interpolation tuning.
    pub reconciliation: ReconciliationConfig,
    /// Realtime channel settings.
    pub network: NetworkConfig,
    /// Progress save and leaderboard refresh timing.
    pub persistence: PersistenceConfig,
    /// Chat validation rules.
    pub chat: ChatConfig,
    /// Procedural world layout.
    pub world: WorldConfig,
    /// Input settings.
    pub input: InputConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Mining state machine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MiningConfig {
    /// Time a cube must be mined continuously before it breaks.
    pub mining_duration_ms: u64,
    /// Delay between a cube breaking and reappearing.
    pub respawn_duration_ms: u64,
    /// Maximum ray distance for selecting a cube, in world units.
    pub reach: f32,
    /// Consecutive miss frames before an idle selection is cleared.
    pub idle_grace_frames: u32,
    /// Consecutive miss frames before an active mining session is dropped.
    pub mining_grace_frames: u32,
    /// Extra distance past `reach` the player may drift while mining.
    pub reach_margin: f32,
    /// Period of the particle burst emitted while a session is open.
    pub particle_interval_ms: u64,
}

/// Local player movement configuration. Velocities are per frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MovementConfig {
    /// Horizontal speed at full input, world units per frame.
    pub move_speed: f32,
    /// Fraction of the velocity error removed each frame.
    pub smoothing: f32,
    /// Downward acceleration, world units per frame squared.
    pub gravity: f32,
    /// Upward velocity applied by a grounded jump.
    pub jump_velocity: f32,
    /// Maximum downward speed per frame.
    pub terminal_velocity: f32,
    /// Half of the player box height.
    pub player_half_height: f32,
    /// Half of the player box width on X and Z.
    pub player_half_width: f32,
    /// Eye offset above the player box center.
    pub eye_offset: f32,
    /// Distance within which a falling body counts as landing on a cube top.
    pub landing_tolerance: f32,
    /// Hard world floor.
    pub floor_height: f32,
    /// Spawn height above the floor.
    pub spawn_height: f32,
}

/// Remote player interpolation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Upper bound on dead-reckoning extrapolation.
    pub max_prediction_ms: u64,
    /// Interpolation factor applied every frame regardless of error.
    pub base_lerp: f32,
    /// Extra factor per world unit of positional error.
    pub error_boost: f32,
    /// Cap for the combined interpolation factor.
    pub max_lerp: f32,
    /// Interpolation factor for yaw.
    pub rotation_lerp: f32,
    /// Speed (units/s) above which an idle avatar starts moving.
    pub motion_start_speed: f32,
    /// Speed (units/s) below which a moving avatar stops.
    pub motion_stop_speed: f32,
    /// Minimum time an animation state is held before it may flip.
    pub motion_latch_ms: u64,
    /// Peers silent for longer than this are removed.
    pub stale_peer_timeout_ms: u64,
}

/// Realtime channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Shared channel name every client joins.
    pub channel_name: String,
    /// Topic carrying presence snapshots.
    pub presence_topic: String,
    /// Topic carrying chat messages.
    pub chat_topic: String,
    /// Minimum interval between outbound presence broadcasts.
    pub broadcast_interval_ms: u64,
    /// First reconnect delay.
    pub reconnect_initial_delay_ms: u64,
    /// Reconnect delay ceiling.
    pub reconnect_max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    pub reconnect_backoff: f64,
    /// Jitter factor (0.0 - 1.0) applied as +/- to each delay.
    pub reconnect_jitter: f64,
    /// Attempts before giving up until the next manual reconnect.
    pub reconnect_max_attempts: u32,
}

/// Progress persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Quiet period after the last change before progress is saved.
    pub save_debounce_ms: u64,
    /// Quiet period after the last change event before the leaderboard reloads.
    pub leaderboard_debounce_ms: u64,
    /// Number of leaderboard rows kept.
    pub leaderboard_size: usize,
    /// Delay before retrying a failed progress load.
    pub load_retry_ms: u64,
}

/// Chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum allowed message length in characters.
    pub max_message_length: usize,
    /// Messages retained in the local history.
    pub history_size: usize,
    /// Maximum messages per sender within the rate-limit window.
    pub rate_limit_messages: u32,
    /// Duration of the sliding rate-limit window.
    pub rate_limit_window_ms: u64,
}

/// Procedural world configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Seed for the heightmap and ore placement.
    pub seed: u64,
    /// Half-width of the square field of columns.
    pub radius: i32,
    /// Tallest column, in cubes.
    pub max_column_height: u32,
}

/// Input configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Mouse sensitivity multiplier.
    pub mouse_sensitivity: f32,
    /// Keybinding overrides (action name -> key name).
    pub keybindings: HashMap<String, String>,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            mining_duration_ms: 2_000,
            respawn_duration_ms: 60_000,
            reach: 5.0,
            idle_grace_frames: 3,
            mining_grace_frames: 6,
            reach_margin: 1.5,
            particle_interval_ms: 100,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.12,
            smoothing: 0.2,
            gravity: 0.012,
            jump_velocity: 0.22,
            terminal_velocity: 0.6,
            player_half_height: 0.9,
            player_half_width: 0.3,
            eye_offset: 0.7,
            landing_tolerance: 0.1,
            floor_height: 0.0,
            spawn_height: 12.0,
        }
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_prediction_ms: 150,
            base_lerp: 0.15,
            error_boost: 0.1,
            max_lerp: 0.6,
            rotation_lerp: 0.2,
            motion_start_speed: 0.6,
            motion_stop_speed: 0.15,
            motion_latch_ms: 200,
            stale_peer_timeout_ms: 10_000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channel_name: "quarry-world".to_string(),
            presence_topic: "player-state".to_string(),
            chat_topic: "chat".to_string(),
            broadcast_interval_ms: 100,
            reconnect_initial_delay_ms: 1_000,
            reconnect_max_delay_ms: 30_000,
            reconnect_backoff: 2.0,
            reconnect_jitter: 0.25,
            reconnect_max_attempts: 20,
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1_000,
            leaderboard_debounce_ms: 1_000,
            leaderboard_size: 10,
            load_retry_ms: 5_000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 200,
            history_size: 50,
            rate_limit_messages: 5,
            rate_limit_window_ms: 10_000,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            radius: 12,
            max_column_height: 4,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 1.0,
            keybindings: HashMap::new(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Platform config directory for Quarry (`<config_dir>/quarry`), falling
/// back to the working directory when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("quarry"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join("config.ron");
        let write_error = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;

        std::fs::write(&config_path, serialized).map_err(write_error)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = read_config(&config_dir.join("config.ron"))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("mining_duration_ms: 2000"));
        assert!(ron_str.contains("broadcast_interval_ms: 100"));
    }

    #[test]
    fn test_core_timings_match_gameplay_constants() {
        let config = Config::default();
        assert_eq!(config.mining.mining_duration_ms, 2_000);
        assert_eq!(config.mining.respawn_duration_ms, 60_000);
        assert_eq!(config.mining.reach, 5.0);
        assert_eq!(config.mining.idle_grace_frames, 3);
        assert_eq!(config.mining.mining_grace_frames, 6);
        assert_eq!(config.reconciliation.max_prediction_ms, 150);
        assert_eq!(config.persistence.save_debounce_ms, 1_000);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        let ron_str = "(mining: (reach: 7.5), network: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.mining.reach, 7.5);
        assert_eq!(config.mining.mining_duration_ms, 2_000);
        assert_eq!(config.chat, ChatConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.world.seed = 7;
        config.network.channel_name = "test-world".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.mining.reach = 6.0;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.mining.reach), Some(6.0));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_broken_file_error_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, "(mining: (reach: \"far\"))").unwrap();

        let err = Config::load_or_create(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }
}
