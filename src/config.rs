//! Per-traversal configuration of the quad kernels.
//!
//! Culling and path selection are plain values passed to the intersectors, so two
//! traversals in the same process can run with different policies.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::Error;

/// Environment variable read by [`IntersectorConfig::from_env`] for the culling mode.
pub const CULLING_ENV: &str = "QUADSECT_CULLING";

/// Environment variable read by [`IntersectorConfig::from_env`] for the path preference.
pub const PATH_ENV: &str = "QUADSECT_PATH";

/// Which facing of a triangle may report a hit.
///
/// The front face is the one whose vertices appear counter-clockwise from the ray origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Culling {
    /// Both faces hit. Only rays parallel to the plane miss (`den != 0`).
    #[default]
    None,
    /// Back faces are culled (`den > 0`).
    Backface,
}

/// Which single-ray kernel the dispatcher should run for a quad batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PathPreference {
    /// Packed when the detected registers can hold both triangle halves, generic otherwise.
    #[default]
    Auto,
    /// Always run the two triangle halves as two separate tests.
    Generic,
    /// Always run both halves in one double-width test.
    Packed,
}

/// Configuration of a [`Dispatch`].
///
/// [`Dispatch`]: ../quad/struct.Dispatch.html
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IntersectorConfig {
    pub culling: Culling,
    pub path: PathPreference,
}

impl IntersectorConfig {
    pub fn new(culling: Culling, path: PathPreference) -> Self {
        IntersectorConfig { culling, path }
    }

    /// Reads [`CULLING_ENV`] and [`PATH_ENV`], keeping the defaults for unset variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`IntersectorConfig::from_env`], with a custom variable source.
    ///
    /// # Examples
    /// ```
    /// use quadsect::config::{Culling, IntersectorConfig, PathPreference, CULLING_ENV};
    ///
    /// let config = IntersectorConfig::from_lookup(|key| {
    ///     (key == CULLING_ENV).then(|| "backface".to_string())
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.culling, Culling::Backface);
    /// assert_eq!(config.path, PathPreference::Auto);
    /// ```
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = IntersectorConfig::default();
        if let Some(value) = lookup(CULLING_ENV) {
            config.culling = value.parse()?;
            trace!(culling = ?config.culling, "culling overridden from {}", CULLING_ENV);
        }
        if let Some(value) = lookup(PATH_ENV) {
            config.path = value.parse()?;
            trace!(path = ?config.path, "path overridden from {}", PATH_ENV);
        }
        Ok(config)
    }
}

impl FromStr for Culling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Culling::None),
            "backface" | "back" => Ok(Culling::Backface),
            _ => Err(Error::UnknownCulling(s.to_string())),
        }
    }
}

impl FromStr for PathPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(PathPreference::Auto),
            "generic" => Ok(PathPreference::Generic),
            "packed" => Ok(PathPreference::Packed),
            _ => Err(Error::UnknownPath(s.to_string())),
        }
    }
}

impl fmt::Display for Culling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Culling::None => "none",
            Culling::Backface => "backface",
        })
    }
}

impl fmt::Display for PathPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathPreference::Auto => "auto",
            PathPreference::Generic => "generic",
            PathPreference::Packed => "packed",
        })
    }
}
