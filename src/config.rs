//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory (or CWD).
//! Falls back to sensible defaults if the file is missing or incomplete.
//!
//! ```toml
//! [general]
//! tick_rate_ms = 16
//! levels_file = "levels.toml"
//! log_file = "cvrunner.log"
//! log_level = "info"
//! seed = 1234
//!
//! [viewport]            # world units; omitted = derived from terminal size
//! width = 1280
//! height = 640
//!
//! [physics]
//! gravity = 1000
//! run_speed = 160
//! jump_speed = 500
//!
//! [layout]
//! floating_count = 10
//! tier_height = 120
//!
//! [progression]
//! coins_per_level = 5
//!
//! [gamepad]
//! jump = ["A"]
//! dismiss = ["B", "Start"]
//! ```

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::layout::LayoutParams;
use crate::sim::progression::ProgressionRules;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tick_rate_ms: u64,
    pub levels_file: Option<PathBuf>,
    pub log_file: PathBuf,
    pub log_level: String,
    pub seed: Option<u64>,
    pub viewport: ViewportConfig,
    pub physics: PhysicsConfig,
    pub layout: LayoutParams,
    pub progression: ProgressionRules,
    pub gamepad: GamepadConfig,
}

/// Fixed viewport in world units. `None` = derive from the terminal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewportConfig {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    /// Downward acceleration, units/s².
    pub gravity: f64,
    pub run_speed: f64,
    pub jump_speed: f64,
    pub player_bounce: f64,
    pub coin_bounce: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        PhysicsConfig {
            gravity: default_gravity(),
            run_speed: default_run_speed(),
            jump_speed: default_jump_speed(),
            player_bounce: default_player_bounce(),
            coin_bounce: default_coin_bounce(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub dismiss: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    viewport: TomlViewport,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    layout: TomlLayout,
    #[serde(default)]
    progression: TomlProgression,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default)]
    levels_file: Option<String>,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlViewport {
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_gravity")]
    gravity: f64,
    #[serde(default = "default_run_speed")]
    run_speed: f64,
    #[serde(default = "default_jump_speed")]
    jump_speed: f64,
    #[serde(default = "default_player_bounce")]
    player_bounce: f64,
    #[serde(default = "default_coin_bounce")]
    coin_bounce: f64,
}

#[derive(Deserialize, Debug)]
struct TomlLayout {
    #[serde(default = "default_ground_step")]
    ground_step: f64,
    #[serde(default = "default_floating_count")]
    floating_count: usize,
    #[serde(default = "default_spacing_min")]
    spacing_min: f64,
    #[serde(default = "default_spacing_jitter")]
    spacing_jitter: f64,
    #[serde(default = "default_tier_height")]
    tier_height: f64,
    #[serde(default = "default_tier_count")]
    tier_count: u32,
    #[serde(default = "default_min_y")]
    min_y: f64,
}

#[derive(Deserialize, Debug)]
struct TomlProgression {
    #[serde(default = "default_coins_per_level")]
    coins_per_level: usize,
    #[serde(default = "default_coin_step")]
    coin_step: f64,
    #[serde(default = "default_anchor_offset")]
    anchor_offset_x: f64,
    #[serde(default = "default_anchor_y")]
    anchor_y: f64,
    #[serde(default = "default_shake_ms")]
    shake_ms: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pad_dismiss")]
    dismiss: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 Hz
fn default_log_file() -> String { "cvrunner.log".into() }
fn default_log_level() -> String { "info".into() }

fn default_gravity() -> f64 { 1000.0 }
fn default_run_speed() -> f64 { 160.0 }
fn default_jump_speed() -> f64 { 500.0 }  // apex 125: just clears one 120 tier
fn default_player_bounce() -> f64 { 0.2 }
fn default_coin_bounce() -> f64 { 0.5 }

fn default_ground_step() -> f64 { LayoutParams::default().ground_step }
fn default_floating_count() -> usize { LayoutParams::default().floating_count }
fn default_spacing_min() -> f64 { LayoutParams::default().spacing_min }
fn default_spacing_jitter() -> f64 { LayoutParams::default().spacing_jitter }
fn default_tier_height() -> f64 { LayoutParams::default().tier_height }
fn default_tier_count() -> u32 { LayoutParams::default().tier_count }
fn default_min_y() -> f64 { LayoutParams::default().min_y }

fn default_coins_per_level() -> usize { ProgressionRules::default().coins_per_level }
fn default_coin_step() -> f64 { ProgressionRules::default().coin_step }
fn default_anchor_offset() -> f64 { ProgressionRules::default().anchor_offset_x }
fn default_anchor_y() -> f64 { ProgressionRules::default().anchor_y }
fn default_shake_ms() -> u32 { ProgressionRules::default().shake_ms }

fn default_pad_jump() -> Vec<String> { vec!["A".into()] }
fn default_pad_dismiss() -> Vec<String> { vec!["B".into(), "Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            tick_rate_ms: default_tick_rate(),
            levels_file: None,
            log_file: default_log_file(),
            log_level: default_log_level(),
            seed: None,
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            gravity: default_gravity(),
            run_speed: default_run_speed(),
            jump_speed: default_jump_speed(),
            player_bounce: default_player_bounce(),
            coin_bounce: default_coin_bounce(),
        }
    }
}

impl Default for TomlLayout {
    fn default() -> Self {
        TomlLayout {
            ground_step: default_ground_step(),
            floating_count: default_floating_count(),
            spacing_min: default_spacing_min(),
            spacing_jitter: default_spacing_jitter(),
            tier_height: default_tier_height(),
            tier_count: default_tier_count(),
            min_y: default_min_y(),
        }
    }
}

impl Default for TomlProgression {
    fn default() -> Self {
        TomlProgression {
            coins_per_level: default_coins_per_level(),
            coin_step: default_coin_step(),
            anchor_offset_x: default_anchor_offset(),
            anchor_y: default_anchor_y(),
            shake_ms: default_shake_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_pad_jump(),
            dismiss: default_pad_dismiss(),
            quit: default_pad_quit(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document; paths resolve against the CWD only.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(toml_cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative levels file: first candidate dir that has it, else CWD-relative.
        let levels_file = cfg.general.levels_file.as_deref().map(|name| {
            let path = PathBuf::from(name);
            if path.is_absolute() {
                return path;
            }
            search_dirs
                .iter()
                .map(|d| d.join(name))
                .find(|p| p.is_file())
                .unwrap_or(path)
        });

        let layout = LayoutParams {
            ground_step: cfg.layout.ground_step,
            floating_count: cfg.layout.floating_count,
            // Floating platforms must keep moving right.
            spacing_min: if cfg.layout.spacing_min > 0.0 {
                cfg.layout.spacing_min
            } else {
                default_spacing_min()
            },
            spacing_jitter: cfg.layout.spacing_jitter.max(0.0),
            tier_height: cfg.layout.tier_height,
            tier_count: cfg.layout.tier_count,
            min_y: cfg.layout.min_y,
            ..LayoutParams::default()
        };

        let progression = ProgressionRules {
            // A level with no coins could never be completed.
            coins_per_level: cfg.progression.coins_per_level.max(1),
            coin_step: cfg.progression.coin_step,
            anchor_offset_x: cfg.progression.anchor_offset_x,
            anchor_y: cfg.progression.anchor_y,
            shake_ms: cfg.progression.shake_ms,
            ..ProgressionRules::default()
        };

        GameConfig {
            tick_rate_ms: cfg.general.tick_rate_ms.max(1),
            levels_file,
            log_file: PathBuf::from(cfg.general.log_file),
            log_level: cfg.general.log_level,
            seed: cfg.general.seed,
            viewport: ViewportConfig {
                width: cfg.viewport.width,
                height: cfg.viewport.height,
            },
            physics: PhysicsConfig {
                gravity: cfg.physics.gravity,
                run_speed: cfg.physics.run_speed,
                jump_speed: cfg.physics.jump_speed,
                player_bounce: cfg.physics.player_bounce,
                coin_bounce: cfg.physics.coin_bounce,
            },
            layout,
            progression,
            gamepad: GamepadConfig {
                jump: cfg.gamepad.jump,
                dismiss: cfg.gamepad.dismiss,
                quit: cfg.gamepad.quit,
            },
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a linked binary still finds data next to the real one.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is up and before the terminal is captured, so
/// problems go straight to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    eprintln!("Warning: config.toml parse error: {e}");
                    eprintln!("Using default settings.");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                eprintln!("Warning: could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}
