//! Client platform and update-protocol version negotiation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platforms that can request updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Get the platform as the string used on the wire and in `metadata.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// Parse a platform. Matching is exact: `IOS` is rejected.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(Error::InvalidPlatform(other.to_string())),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negotiated update-protocol version.
///
/// Version 0 clients only understand manifests. Version 1 adds directives
/// (rollback, no update available).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    pub const V0: Self = Self(0);
    pub const V1: Self = Self(1);

    /// Create from a raw version number.
    pub fn new(version: u32) -> Self {
        Self(version)
    }

    /// Parse the value of an `expo-protocol-version` header.
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| Error::InvalidProtocolVersion(s.to_string()))
    }

    /// Get the raw version number.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Whether clients at this version understand directive responses.
    pub fn supports_directives(&self) -> bool {
        self.0 >= 1
    }

    /// Whether the server may answer "no update" when the client already runs the latest bundle.
    ///
    /// Only version 1 does this; version 0 always gets the manifest re-served.
    pub fn supports_no_update_short_circuit(&self) -> bool {
        self.0 == 1
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
