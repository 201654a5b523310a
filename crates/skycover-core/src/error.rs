//! Error types for the segmentation pipeline.

use thiserror::Error;

/// Result alias used throughout skycover-core.
pub type Result<T> = std::result::Result<T, SegmentError>;

#[derive(Error, Debug)]
pub enum SegmentError {
    /// Input raster is not 3-channel or has zero area.
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    /// Clustering could not be performed on the given samples.
    #[error("clustering failed: {reason}")]
    Clustering { reason: String },

    /// A configuration value is out of its valid range.
    #[error("invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Configuration could not be read or parsed.
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SegmentError {
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage { reason: reason.into() }
    }

    pub fn clustering(reason: impl Into<String>) -> Self {
        Self::Clustering { reason: reason.into() }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Wrap an I/O or parse failure while loading configuration.
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
