//! Configuration management for the translation pipeline.
//!
//! Provides configuration loading, saving, and validation for inference
//! endpoints, capture scheduling, stream constraints, and frame encoding.

use crate::errors::PipelineError;
use crate::types::{CaptureMode, FacingMode, StreamConstraints};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub endpoints: EndpointConfig,
    pub capture: CaptureConfig,
    pub stream: StreamConfig,
    pub encoding: EncodingConfig,
}

/// Remote inference endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the recognition service
    pub base_url: String,
    /// Path for letter-level recognition
    pub letters_path: String,
    /// Path for word-level recognition
    pub words_path: String,
    /// Extra headers attached to every request, e.g. a tunnel bypass header.
    /// Deployment concern of the external host, not of the pipeline.
    pub extra_headers: Vec<HeaderPair>,
}

/// A single request header name/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

impl HeaderPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl EndpointConfig {
    /// Full URL for the given capture mode.
    pub fn url_for(&self, mode: CaptureMode) -> String {
        let path = match mode {
            CaptureMode::Letters => &self.letters_path,
            CaptureMode::Words => &self.words_path,
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Periodic capture scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Default capture interval in seconds
    pub default_interval_secs: u64,
    /// Lower bound for the user-adjustable interval
    pub min_interval_secs: u64,
    /// Upper bound for the user-adjustable interval
    pub max_interval_secs: u64,
}

impl CaptureConfig {
    /// Clamp a requested interval into the configured range.
    pub fn clamp_interval(&self, secs: u64) -> u64 {
        secs.clamp(self.min_interval_secs, self.max_interval_secs)
    }
}

/// Camera stream acquisition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Preferred camera facing
    pub facing: FacingMode,
    /// Preferred resolution [width, height]
    pub preferred_resolution: [u32; 2],
}

impl StreamConfig {
    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            facing: self.facing,
            width: self.preferred_resolution[0],
            height: self.preferred_resolution[1],
        }
    }
}

/// Still-frame encoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig {
                base_url: "http://127.0.0.1:8000".to_string(),
                letters_path: "/analyze".to_string(),
                words_path: "/analyze_word".to_string(),
                extra_headers: Vec::new(),
            },
            capture: CaptureConfig {
                default_interval_secs: 5,
                min_interval_secs: 2,
                max_interval_secs: 10,
            },
            stream: StreamConfig {
                facing: FacingMode::User,
                preferred_resolution: [1280, 720],
            },
            encoding: EncodingConfig { jpeg_quality: 90 },
        }
    }
}

impl TranslatorConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("Failed to read config file: {}", e))
        })?;

        let config: TranslatorConfig = toml::from_str(&contents).map_err(|e| {
            PipelineError::config(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PipelineError::config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            PipelineError::config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            PipelineError::config(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("signsight.toml")
    }

    /// Load from default location or create with defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoints.base_url.is_empty() {
            return Err("Endpoint base URL must not be empty".to_string());
        }
        if !self.endpoints.base_url.starts_with("http://")
            && !self.endpoints.base_url.starts_with("https://")
        {
            return Err("Endpoint base URL must be http(s)".to_string());
        }
        if !self.endpoints.letters_path.starts_with('/')
            || !self.endpoints.words_path.starts_with('/')
        {
            return Err("Endpoint paths must start with '/'".to_string());
        }

        if self.capture.min_interval_secs == 0 {
            return Err("Minimum capture interval must be at least 1 second".to_string());
        }
        if self.capture.min_interval_secs > self.capture.max_interval_secs {
            return Err("Minimum capture interval exceeds maximum".to_string());
        }
        if self.capture.default_interval_secs < self.capture.min_interval_secs
            || self.capture.default_interval_secs > self.capture.max_interval_secs
        {
            return Err("Default capture interval outside [min, max]".to_string());
        }

        if self.stream.preferred_resolution[0] == 0 || self.stream.preferred_resolution[1] == 0 {
            return Err("Invalid preferred resolution".to_string());
        }

        if self.encoding.jpeg_quality == 0 || self.encoding.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        Ok(())
    }
}
