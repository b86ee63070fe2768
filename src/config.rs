// config.rs — Settings loaded from gfless.toml next to the DLL.
//
// Every section is optional. A missing file means "all defaults"; a file that
// exists but can't be read, parsed or validated is a hard error for the worker.
//
// The delay and interval values are empirically tuned against the host's UI
// and are kept here so they can be adjusted without a rebuild.

use crate::error::ConfigError;
use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// File name looked up in the DLL's directory.
pub const CONFIG_FILE_NAME: &str = "gfless.toml";

/// Largest accepted command frame.
const MAX_FRAME_SIZE: usize = 4096;

// ============================================================
// Root
// ============================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GflessConfig {
    pub pipes: PipeConfig,
    pub timings: Timings,
    pub logging: LoggingConfig,
    /// Host memory layout. Without it no widget ever resolves.
    pub layout: Option<HostLayout>,
}

impl GflessConfig {
    /// Load `gfless.toml` from `dir`, falling back to defaults if it doesn't exist.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text, &path)
    }

    /// Parse and validate a TOML document. `path` is only used in error messages.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.pipes.frame_size == 0 || self.pipes.frame_size > MAX_FRAME_SIZE {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "pipes.frame_size must be between 1 and {MAX_FRAME_SIZE}, got {}",
                    self.pipes.frame_size
                ),
            });
        }
        if self.pipes.primary.is_empty() || self.pipes.secondary.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "pipe names must not be empty".to_string(),
            });
        }
        self.logging.level_filter()?;
        if let Some(layout) = &self.layout {
            layout.server_select.locator.validate()?;
            layout.character_select.locator.validate()?;
        }
        Ok(())
    }
}

// ============================================================
// Pipes
// ============================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipeConfig {
    /// Duplex pipe created by the control process (handshake + commands).
    pub primary: String,
    /// Read-only pipe any peer may create to push Relogin commands.
    pub secondary: String,
    /// Bytes read per command frame.
    pub frame_size: usize,
    /// How long to wait for the primary pipe to appear.
    pub connect_timeout_ms: u32,
    /// Delay between attempts to (re)open the secondary pipe.
    pub reconnect_interval_ms: u64,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            primary: r"\\.\pipe\GflessClient".to_string(),
            secondary: r"\\.\pipe\ScriptCreatorLogin".to_string(),
            frame_size: 255,
            connect_timeout_ms: 20_000,
            reconnect_interval_ms: 500,
        }
    }
}

impl PipeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.connect_timeout_ms))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

// ============================================================
// Timings
// ============================================================

/// Poll interval and settle delays used by the login state machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timings {
    /// Interval between visibility / presence checks.
    pub poll_interval_ms: u64,
    /// After selecting the server language.
    pub language_settle_ms: u64,
    /// Between selecting the server and the channel.
    pub server_settle_ms: u64,
    /// After selecting the channel, before re-checking the character screen.
    pub channel_settle_ms: u64,
    /// Once the character screen is visible.
    pub character_screen_settle_ms: u64,
    /// Between selecting the character and clicking start.
    pub character_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            language_settle_ms: 2000,
            server_settle_ms: 1000,
            channel_settle_ms: 4000,
            character_screen_settle_ms: 500,
            character_settle_ms: 1000,
        }
    }
}

impl Timings {
    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
    pub fn language_settle(&self) -> Duration { Duration::from_millis(self.language_settle_ms) }
    pub fn server_settle(&self) -> Duration { Duration::from_millis(self.server_settle_ms) }
    pub fn channel_settle(&self) -> Duration { Duration::from_millis(self.channel_settle_ms) }
    pub fn character_screen_settle(&self) -> Duration { Duration::from_millis(self.character_screen_settle_ms) }
    pub fn character_settle(&self) -> Duration { Duration::from_millis(self.character_settle_ms) }
}

// ============================================================
// Logging
// ============================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// One of off, error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.level).map_err(|_| ConfigError::Invalid {
            reason: format!("unknown logging.level {:?}", self.level),
        })
    }
}

// ============================================================
// Host Memory Layout
// ============================================================
// Offsets are byte offsets from the start of the host object. They depend on
// the host build, which is why none of them has a default.

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostLayout {
    pub button: ButtonLayout,
    pub server_select: ServerSelectLayout,
    pub character_select: CharacterSelectLayout,
}

/// Fields of the host's generic graphic button object.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonLayout {
    pub selected_index_offset: usize,
    /// Pointer to the parameter block passed in eax on click.
    pub parameters_offset: usize,
    /// Pointer to the click handler.
    pub click_function_offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSelectLayout {
    pub locator: Locator,
    pub visible_offset: usize,
    pub language_button_offset: usize,
    pub server_button_offset: usize,
    pub channel_button_offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterSelectLayout {
    pub locator: Locator,
    pub visible_offset: usize,
    pub character_button_offset: usize,
    pub start_button_offset: usize,
}

/// Where to find the static pointer slot holding a widget singleton.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "LocatorTable")]
pub enum Locator {
    /// Fixed address of the slot.
    Address { address: usize },
    /// Masked byte pattern searched inside `module`; the slot address is the
    /// 4-byte value found `offset` bytes after the start of the match.
    Pattern {
        module: String,
        pattern: String,
        offset: usize,
    },
}

/// A locator as written in TOML, before the form is decided.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LocatorTable {
    address: Option<usize>,
    module: Option<String>,
    pattern: Option<String>,
    offset: Option<usize>,
}

impl TryFrom<LocatorTable> for Locator {
    type Error = String;

    fn try_from(t: LocatorTable) -> Result<Self, String> {
        match t {
            LocatorTable { address: Some(address), module: None, pattern: None, offset: None } => {
                Ok(Locator::Address { address })
            }
            LocatorTable { address: None, module: Some(module), pattern: Some(pattern), offset: Some(offset) } => {
                Ok(Locator::Pattern { module, pattern, offset })
            }
            _ => Err("locator needs either `address` alone or all of `module`, `pattern`, `offset`".to_string()),
        }
    }
}

impl Locator {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Locator::Address { address } if *address == 0 => Err(ConfigError::Invalid {
                reason: "locator address must not be zero".to_string(),
            }),
            Locator::Address { .. } => Ok(()),
            Locator::Pattern { pattern, .. } => crate::pattern::BytePattern::parse(pattern)
                .map(|_| ())
                .map_err(|e| ConfigError::Invalid {
                    reason: format!("locator pattern {pattern:?}: {e}"),
                }),
        }
    }
}
