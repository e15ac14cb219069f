use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::version::ZERO_VERSION;

/// Security verdict published on a tool page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum SecurityStatus {
    Clean,
    Warning,
    Suspicious,
    Disabled,
    #[default]
    Unknown,
}

impl SecurityStatus {
    /// Map the colour class used by the site's status badge.
    pub fn from_class(class: &str) -> Self {
        match class {
            "gray" => SecurityStatus::Disabled,
            "red" => SecurityStatus::Warning,
            "orange" => SecurityStatus::Suspicious,
            "green" => SecurityStatus::Clean,
            _ => SecurityStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityStatus::Clean => "Clean",
            SecurityStatus::Warning => "Warning",
            SecurityStatus::Suspicious => "Suspicious",
            SecurityStatus::Disabled => "Disabled",
            SecurityStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SecurityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Option<String>> for SecurityStatus {
    fn from(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("Clean") => SecurityStatus::Clean,
            Some("Warning") => SecurityStatus::Warning,
            Some("Suspicious") => SecurityStatus::Suspicious,
            Some("Disabled") => SecurityStatus::Disabled,
            _ => SecurityStatus::Unknown,
        }
    }
}

impl From<SecurityStatus> for String {
    fn from(value: SecurityStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Licensing model advertised below the tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum ToolType {
    Freeware,
    Trial,
    OpenSource,
    Demo,
    Paid,
    FreeToPlay,
    #[default]
    Unknown,
}

impl ToolType {
    /// Detection order: the first label contained in the descriptor wins.
    pub const DETECTABLE: [ToolType; 6] = [
        ToolType::Freeware,
        ToolType::Trial,
        ToolType::OpenSource,
        ToolType::Demo,
        ToolType::Paid,
        ToolType::FreeToPlay,
    ];

    /// Find the licensing label inside a free-text descriptor.
    pub fn detect(descriptor: &str) -> Self {
        Self::DETECTABLE
            .into_iter()
            .find(|t| descriptor.contains(t.as_str()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::Freeware => "Freeware",
            ToolType::Trial => "Trial",
            ToolType::OpenSource => "Open Source",
            ToolType::Demo => "Demo",
            ToolType::Paid => "Paid",
            ToolType::FreeToPlay => "Free to Play",
            ToolType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Option<String>> for ToolType {
    fn from(value: Option<String>) -> Self {
        value
            .as_deref()
            .and_then(|s| Self::DETECTABLE.into_iter().find(|t| t.as_str() == s))
            .unwrap_or_default()
    }
}

impl From<ToolType> for String {
    fn from(value: ToolType) -> Self {
        value.as_str().to_string()
    }
}

/// One tracked tool as persisted in the catalog file.
///
/// The catalog key is the entry's name and is not repeated in the record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub link: String,
    #[serde(
        rename = "latest version",
        default = "zero_version",
        deserialize_with = "version_scalar"
    )]
    pub latest_version: String,
    #[serde(default)]
    pub downloaded: Option<String>,
    #[serde(rename = "windows versions", default)]
    pub platforms: Option<String>,
    #[serde(default)]
    pub status: SecurityStatus,
    #[serde(default, deserialize_with = "rating_scalar")]
    pub rating: f64,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "type", default)]
    pub tool_type: ToolType,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into(),
            latest_version: zero_version(),
            downloaded: None,
            platforms: None,
            status: SecurityStatus::Unknown,
            rating: 0.0,
            size: None,
            tool_type: ToolType::Unknown,
            website: None,
            error: None,
        }
    }

    /// An entry without a page link cannot be reconciled.
    pub fn is_reconcilable(&self) -> bool {
        !self.link.trim().is_empty()
    }
}

fn zero_version() -> String {
    ZERO_VERSION.to_string()
}

/// Hand-edited catalogs often carry `latest version: 1.1` unquoted.
fn version_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error;

    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(zero_version()),
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a version scalar, found {:?}",
            other
        ))),
    }
}

fn rating_scalar<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_yaml::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}
