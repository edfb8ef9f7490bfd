// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the lazy-bandpass project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! Filter settings are read from a YAML file, validated against the embedded
//! JSON schema (`resources/config.schema.json`) and then deserialised into
//! [`BandpassConfig`]. Every field is optional in the file and falls back to
//! the usual extracellular defaults (300 Hz - 6000 Hz spectral filter).
//!
//! ## Usage
//!
//! ```no_run
//! use lazy_bandpass::config::BandpassConfig;
//!
//! let mut config = BandpassConfig::from_file("bandpass.yaml").unwrap();
//! config.apply_args(Some(500.0), None, None, None, None, None);
//! let parameters = config.to_parameters();
//! let cache = config.cache_policy().unwrap();
//! ```

use crate::cache::CachePolicy;
use crate::error::FilterError;
use crate::preprocessing::{BandpassParameters, FilterKind};
use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

/// Filter configuration as found in a YAML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandpassConfig {
    /// High-pass cutoff in Hz
    #[serde(default = "default_freq_min")]
    pub freq_min: f64,
    /// Low-pass cutoff in Hz
    #[serde(default = "default_freq_max")]
    pub freq_max: f64,
    /// Low-pass transition width in Hz (spectral filter only)
    #[serde(default = "default_freq_wid")]
    pub freq_wid: f64,
    #[serde(default)]
    pub filter_type: FilterKind,
    /// Butterworth order (recursive filter only)
    #[serde(default = "default_order")]
    pub order: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub cache_to_file: bool,
    #[serde(default)]
    pub cache_chunks: bool,
}

fn default_freq_min() -> f64 {
    BandpassParameters::default().freq_min
}

fn default_freq_max() -> f64 {
    BandpassParameters::default().freq_max
}

fn default_freq_wid() -> f64 {
    BandpassParameters::default().freq_wid
}

fn default_order() -> usize {
    BandpassParameters::default().order
}

fn default_chunk_size() -> usize {
    BandpassParameters::default().chunk_size
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            freq_min: default_freq_min(),
            freq_max: default_freq_max(),
            freq_wid: default_freq_wid(),
            filter_type: FilterKind::default(),
            order: default_order(),
            chunk_size: default_chunk_size(),
            cache_to_file: false,
            cache_chunks: false,
        }
    }
}

impl BandpassConfig {
    /// Load configuration from a file
    ///
    /// A missing file is created with the default values, which are returned.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;
        // An empty document means "all defaults"
        let json_value = match serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?
        {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            value => value,
        };

        let schema_str = include_str!("../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: BandpassConfig = serde_json::from_value(json_value)
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Checks the schema cannot express: parameter consistency and exclusive cache flags
    pub fn validate(&self) -> std::result::Result<(), FilterError> {
        self.to_parameters().validate()?;
        self.cache_policy()?;
        Ok(())
    }

    pub fn to_parameters(&self) -> BandpassParameters {
        BandpassParameters {
            freq_min: self.freq_min,
            freq_max: self.freq_max,
            freq_wid: self.freq_wid,
            filter_type: self.filter_type,
            order: self.order,
            chunk_size: self.chunk_size,
        }
    }

    pub fn cache_policy(&self) -> std::result::Result<CachePolicy, FilterError> {
        CachePolicy::from_flags(self.cache_to_file, self.cache_chunks)
    }

    /// Override values with the ones given on the command line
    pub fn apply_args(
        &mut self,
        freq_min: Option<f64>,
        freq_max: Option<f64>,
        freq_wid: Option<f64>,
        filter_type: Option<FilterKind>,
        order: Option<usize>,
        chunk_size: Option<usize>,
    ) {
        if let Some(freq_min) = freq_min {
            debug!("Overriding freq_min from command line: {}", freq_min);
            self.freq_min = freq_min;
        }
        if let Some(freq_max) = freq_max {
            debug!("Overriding freq_max from command line: {}", freq_max);
            self.freq_max = freq_max;
        }
        if let Some(freq_wid) = freq_wid {
            debug!("Overriding freq_wid from command line: {}", freq_wid);
            self.freq_wid = freq_wid;
        }
        if let Some(filter_type) = filter_type {
            debug!("Overriding filter type from command line: {}", filter_type);
            self.filter_type = filter_type;
        }
        if let Some(order) = order {
            debug!("Overriding order from command line: {}", order);
            self.order = order;
        }
        if let Some(chunk_size) = chunk_size {
            debug!("Overriding chunk size from command line: {}", chunk_size);
            self.chunk_size = chunk_size;
        }
    }

    /// Set the cache flags from a policy
    pub fn set_cache_policy(&mut self, policy: CachePolicy) {
        debug!("Overriding cache policy from command line: {}", policy);
        self.cache_to_file = policy == CachePolicy::WholeRecording;
        self.cache_chunks = policy == CachePolicy::PerChunk;
    }
}

/// Print the embedded configuration schema on stdout
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../resources/config.schema.json");
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = BandpassConfig::from_yaml_str("").unwrap();
        assert_eq!(config, BandpassConfig::default());
        assert_eq!(config.to_parameters(), BandpassParameters::default());
        assert_eq!(config.cache_policy().unwrap(), CachePolicy::None);
    }

    #[test]
    fn test_partial_document() {
        let config =
            BandpassConfig::from_yaml_str("freq_min: 100\nfilter_type: butter\norder: 2\n")
                .unwrap();
        assert_eq!(config.freq_min, 100.0);
        assert_eq!(config.freq_max, 6000.0);
        assert_eq!(config.filter_type, FilterKind::Recursive);
        assert_eq!(config.order, 2);
    }

    #[test]
    fn test_schema_rejects_unknown_and_invalid_fields() {
        assert!(BandpassConfig::from_yaml_str("freq_mni: 100\n").is_err());
        assert!(BandpassConfig::from_yaml_str("freq_min: -5\n").is_err());
        assert!(BandpassConfig::from_yaml_str("filter_type: chebyshev\n").is_err());
        assert!(BandpassConfig::from_yaml_str("chunk_size: 0\n").is_err());
    }

    #[test]
    fn test_both_cache_flags_are_rejected() {
        let result = BandpassConfig::from_yaml_str("cache_to_file: true\ncache_chunks: true\n");
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<FilterError>(),
            Some(FilterError::IncompatibleCaching)
        ));
    }

    #[test]
    fn test_apply_args_overrides_only_given_values() {
        let mut config = BandpassConfig::default();
        config.apply_args(Some(250.0), None, Some(500.0), Some(FilterKind::Recursive), None, None);
        assert_eq!(config.freq_min, 250.0);
        assert_eq!(config.freq_max, 6000.0);
        assert_eq!(config.freq_wid, 500.0);
        assert_eq!(config.filter_type, FilterKind::Recursive);
        assert_eq!(config.order, 3);

        config.set_cache_policy(CachePolicy::PerChunk);
        assert_eq!(config.cache_policy().unwrap(), CachePolicy::PerChunk);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bandpass.yaml");

        // Missing file is created with defaults
        let created = BandpassConfig::from_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, BandpassConfig::default());

        let mut config = created;
        config.freq_max = 3000.0;
        config.cache_to_file = true;
        config.save_to_file(&path).unwrap();
        let loaded = BandpassConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.cache_policy().unwrap(), CachePolicy::WholeRecording);
    }
}
