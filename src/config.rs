//! Streamer configuration
//!
//! Configuration is a plain value built once at startup and handed to each
//! stage, so independent streams in one process can use different settings.
//! It is read from TOML; every field has a default.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::error::Error;
use crate::protocol::SIGNATURE;

/// Sample rates the Opus encoder accepts
pub const OPUS_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamerConfig {
    pub network: NetworkConfig,
    pub audio: AudioConfig,
    pub opus: OpusConfig,
    pub protocol: ProtocolConfig,
}

/// Collector endpoint and socket settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// `host:port` of the collector
    pub server_addr: String,
    /// SO_SNDBUF in bytes; `None` keeps the OS default
    pub send_buffer_size: Option<usize>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            send_buffer_size: None,
        }
    }
}

/// Capture and chunking settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Live capture sample rate
    pub sample_rate: u32,
    /// Samples per chunk
    pub frame_size: usize,
    /// Live session length in seconds
    pub session_secs: u64,
    /// How long a single device read may wait for audio
    pub capture_timeout_ms: u64,
    /// Input device name; the host default when unset
    pub device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
            session_secs: DEFAULT_SESSION_SECS,
            capture_timeout_ms: 2000,
            device: None,
        }
    }
}

impl AudioConfig {
    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

/// Opus application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpusApplication {
    Voip,
    Audio,
    LowDelay,
}

/// Opus encoder settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpusConfig {
    pub application: OpusApplication,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    pub vbr: bool,
    /// In-band forward error correction
    pub fec: bool,
    /// Expected packet loss, used when FEC is on
    pub packet_loss_perc: u8,
    /// Capacity of the output buffer; no frame is ever larger
    pub max_frame_bytes: usize,
}

impl Default for OpusConfig {
    fn default() -> Self {
        Self {
            application: OpusApplication::Audio,
            bitrate: DEFAULT_BITRATE,
            vbr: true,
            fec: false,
            packet_loss_perc: 0,
            max_frame_bytes: MAX_FRAME_BYTES,
        }
    }
}

/// Wire protocol settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub signature: u32,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            signature: SIGNATURE,
        }
    }
}

impl StreamerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Read configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Load from `path` if given, otherwise from the user config directory
    /// when a file exists there, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => {
                    tracing::info!("Loading config from {}", path.display());
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/udp-audio-streamer/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "udp-audio-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reject settings the encoder or socket cannot work with
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.server_addr.trim().is_empty() {
            return Err(Error::Config("network.server_addr is empty".into()));
        }

        self.validate_source_rate(self.audio.sample_rate)?;

        if self.opus.max_frame_bytes == 0 {
            return Err(Error::Config("opus.max_frame_bytes must be non-zero".into()));
        }
        if self.opus.max_frame_bytes + crate::protocol::HEADER_LEN > MAX_PACKET_SIZE {
            return Err(Error::Config(format!(
                "opus.max_frame_bytes {} does not fit a {} byte datagram",
                self.opus.max_frame_bytes, MAX_PACKET_SIZE
            )));
        }
        if self.opus.packet_loss_perc > 100 {
            return Err(Error::Config("opus.packet_loss_perc must be 0-100".into()));
        }
        if self.audio.capture_timeout_ms == 0 {
            return Err(Error::Config("audio.capture_timeout_ms must be non-zero".into()));
        }

        Ok(())
    }

    /// Check that the configured frame size is a legal Opus frame for a
    /// source running at `sample_rate`, which for files is the file's rate
    pub fn validate_source_rate(&self, sample_rate: u32) -> Result<(), Error> {
        validate_opus_format(sample_rate, self.audio.frame_size)
    }
}

/// Check that `frame_size` samples at `sample_rate` is a legal Opus frame
/// (2.5, 5, 10, 20, 40 or 60 ms)
pub fn validate_opus_format(sample_rate: u32, frame_size: usize) -> Result<(), Error> {
    if !OPUS_SAMPLE_RATES.contains(&sample_rate) {
        return Err(Error::Config(format!(
            "Sample rate {} Hz is not supported by Opus",
            sample_rate
        )));
    }

    // Frame durations in units of 0.5 ms
    let half_ms = frame_size as u64 * 2000 / sample_rate as u64;
    let exact = half_ms * sample_rate as u64 == frame_size as u64 * 2000;
    if !exact || ![5, 10, 20, 40, 80, 120].contains(&half_ms) {
        return Err(Error::Config(format!(
            "Frame size {} at {} Hz is not a valid Opus frame duration",
            frame_size, sample_rate
        )));
    }

    Ok(())
}
