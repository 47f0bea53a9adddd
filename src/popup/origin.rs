// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parent-origin gate
//!
//! The popup learns its parent's origin from the first valid message it
//! receives and pins it. Every message, including that first one, must
//! carry a structurally valid origin; afterwards it must also equal the
//! pinned one.

use thiserror::Error;
use url::Url;

/// Marker browsers use for opaque origins
pub const NULL_ORIGIN: &str = "null";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OriginError {
    #[error("Origin is empty")]
    Empty,

    #[error("Origin is the null marker")]
    Null,

    #[error("Origin '{0}' is not a valid URL")]
    Unparseable(String),

    #[error("Origin '{actual}' does not match pinned origin '{expected}'")]
    Mismatch { expected: String, actual: String },
}

/// Validate `origin` and return its normalized serialization
pub fn validate_origin(origin: &str) -> Result<String, OriginError> {
    if origin.is_empty() {
        return Err(OriginError::Empty);
    }
    if origin == NULL_ORIGIN {
        return Err(OriginError::Null);
    }

    let url = Url::parse(origin).map_err(|_| OriginError::Unparseable(origin.to_string()))?;
    let normalized = url.origin().ascii_serialization();
    if normalized == NULL_ORIGIN {
        return Err(OriginError::Null);
    }
    Ok(normalized)
}

#[derive(Debug, Default)]
pub struct OriginGate {
    pinned: Option<String>,
}

impl OriginGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject a message's origin, pinning the first valid one
    pub fn admit(&mut self, origin: &str) -> Result<&str, OriginError> {
        let normalized = validate_origin(origin)?;

        match &self.pinned {
            Some(pinned) if *pinned != normalized => {
                return Err(OriginError::Mismatch {
                    expected: pinned.clone(),
                    actual: normalized,
                });
            }
            Some(_) => {}
            None => {
                tracing::info!("📌 Pinned parent origin {}", normalized);
                self.pinned = Some(normalized);
            }
        }

        Ok(self.pinned.as_deref().unwrap_or_default())
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }
}
