//! WPS protocol flavours served by the engine.
//!
//! Both flavours share one job lifecycle; they only differ in the names
//! used when status is reported back to a client.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Properties-bag key under which the protocol version is passed to executors.
pub const PROPERTY_WPS_VERSION: &str = "wps.version";

/// Properties-bag key under which the job id is passed to executors.
pub const PROPERTY_JOB_ID: &str = "wps.job_id";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WpsVersion {
    #[serde(rename = "1.0.0")]
    V1_0_0,
    #[default]
    #[serde(rename = "2.0")]
    V2_0,
}

impl WpsVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_0_0 => "1.0.0",
            Self::V2_0 => "2.0",
        }
    }
}

impl fmt::Display for WpsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WpsVersion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.0.0" | "1.0" => Ok(Self::V1_0_0),
            "2.0" | "2.0.0" => Ok(Self::V2_0),
            other => Err(CoreError::Validation(format!(
                "Unsupported WPS version '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_flavours() {
        assert_eq!("1.0.0".parse::<WpsVersion>().unwrap(), WpsVersion::V1_0_0);
        assert_eq!("2.0".parse::<WpsVersion>().unwrap(), WpsVersion::V2_0);
        assert_eq!(" 2.0.0 ".parse::<WpsVersion>().unwrap(), WpsVersion::V2_0);
    }

    #[test]
    fn rejects_unknown_version() {
        assert!("3.0".parse::<WpsVersion>().is_err());
    }

    #[test]
    fn serializes_as_version_string() {
        let json = serde_json::to_string(&WpsVersion::V1_0_0).unwrap();
        assert_eq!(json, "\"1.0.0\"");
        let parsed: WpsVersion = serde_json::from_str("\"2.0\"").unwrap();
        assert_eq!(parsed, WpsVersion::V2_0);
    }

    #[test]
    fn default_is_two_point_oh() {
        assert_eq!(WpsVersion::default(), WpsVersion::V2_0);
    }
}
