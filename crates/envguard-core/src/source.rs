//! Schema documents and environment input
//!
//! Thin loaders that turn files and the process environment into the
//! values the compiler and executor work on. No validation happens here.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use crate::error::LoadError;

/// Supported schema document encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Json,
    Yaml,
    Toml,
}

impl SchemaFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "json" => Ok(SchemaFormat::Json),
            "yaml" | "yml" => Ok(SchemaFormat::Yaml),
            "toml" => Ok(SchemaFormat::Toml),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaFormat::Json => write!(f, "JSON"),
            SchemaFormat::Yaml => write!(f, "YAML"),
            SchemaFormat::Toml => write!(f, "TOML"),
        }
    }
}

/// Read a schema document from disk, choosing the parser by extension
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Value, LoadError> {
    let path = path.as_ref();
    let format = SchemaFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), format = %format, "Loaded schema document");
    parse_schema_str(&content, format).map_err(|reason| LoadError::Parse {
        path: path.display().to_string(),
        format: format.to_string(),
        reason,
    })
}

/// Parse schema text in the given format into a JSON value
///
/// Key order of the document is preserved.
pub fn parse_schema_str(content: &str, format: SchemaFormat) -> Result<Value, String> {
    match format {
        SchemaFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        SchemaFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        SchemaFormat::Toml => {
            let value: toml::Value = toml::from_str(content).map_err(|e| e.to_string())?;
            serde_json::to_value(value).map_err(|e| e.to_string())
        }
    }
}

/// The string-to-string mapping being validated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvInput {
    vars: BTreeMap<String, String>,
}

impl EnvInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let mut vars = BTreeMap::new();
        for (key, value) in std::env::vars_os() {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => {
                    vars.insert(key, value);
                }
                (Ok(key), Err(_)) => {
                    tracing::warn!(variable = %key, "Skipping environment variable with non UTF-8 value");
                }
                (Err(key), _) => {
                    tracing::warn!(variable = ?key, "Skipping environment variable with non UTF-8 name");
                }
            }
        }
        Self { vars }
    }

    /// Read a `.env` file
    pub fn from_dotenv_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let entries = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(&origin, e))?;
        Self::collect_dotenv(entries, &origin)
    }

    /// Parse `.env` content
    ///
    /// ```text
    /// # comment
    /// export KEY=value  # trailing comment
    /// QUOTED="value with spaces
    /// over two lines"
    /// LITERAL='no $SUBSTITUTION here'
    /// ```
    ///
    /// Later assignments win. `$NAME` references in unquoted and
    /// double-quoted values expand from earlier lines or the process
    /// environment.
    pub fn from_dotenv_str(content: &str) -> Result<Self, LoadError> {
        Self::collect_dotenv(dotenvy::from_read_iter(content.as_bytes()), "<inline>")
    }

    fn collect_dotenv(
        entries: impl Iterator<Item = Result<(String, String), dotenvy::Error>>,
        origin: &str,
    ) -> Result<Self, LoadError> {
        let mut vars = BTreeMap::new();
        for entry in entries {
            let (key, value) = entry.map_err(|e| dotenv_error(origin, e))?;
            vars.insert(key, value);
        }

        tracing::debug!(origin = %origin, variables = vars.len(), "Loaded .env entries");
        Ok(Self { vars })
    }

    /// Keep only variables whose name starts with `prefix`
    pub fn with_prefix(self, prefix: &str) -> Self {
        Self {
            vars: self
                .vars
                .into_iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .collect(),
        }
    }

    /// Overlay another input; its values win
    pub fn merge(mut self, other: EnvInput) -> Self {
        self.vars.extend(other.vars);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON object with one string member per variable
    pub fn to_document(&self) -> Value {
        let map: Map<String, Value> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

fn dotenv_error(origin: &str, err: dotenvy::Error) -> LoadError {
    match err {
        dotenvy::Error::Io(source) => LoadError::Io {
            path: origin.to_string(),
            source,
        },
        other => LoadError::Dotenv {
            path: origin.to_string(),
            reason: other.to_string(),
        },
    }
}

impl FromIterator<(String, String)> for EnvInput {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, String>> for EnvInput {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for EnvInput {
    fn from(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }
}
