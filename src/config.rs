use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::field_rewriter::DEFAULT_MINIMAL_ALIAS_TABLES;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{0}' (expected MAJOR.MINOR)")]
pub struct VersionParseError(String);

/// Host framework version the compiled queries are targeted at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetVersion {
    pub major: u32,
    pub minor: u32,
}

impl TargetVersion {
    pub const LATEST: TargetVersion = TargetVersion { major: 5, minor: 2 };

    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for TargetVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for TargetVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for TargetVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetVersion> for String {
    fn from(version: TargetVersion) -> Self {
        version.to_string()
    }
}

/// Behavioural differences between target versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// `ResultType::RowCount` is available.
    pub row_count_result: bool,
    /// EXPLAIN accepts a format and options.
    pub explain_options: bool,
    /// Inserts hand back the requested returning columns rather than only the
    /// last inserted id.
    pub insert_returning_columns: bool,
}

impl Capabilities {
    pub fn for_version(version: TargetVersion) -> Self {
        Self {
            row_count_result: version >= TargetVersion::new(5, 2),
            explain_options: version >= TargetVersion::new(4, 0),
            insert_returning_columns: version >= TargetVersion::new(3, 0),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_version(TargetVersion::LATEST)
    }
}

fn validate_table_names(tables: &[String]) -> Result<(), ValidationError> {
    if tables.iter().any(|t| t.is_empty() || t.contains(char::is_whitespace)) {
        return Err(ValidationError::new("minimal_alias_tables")
            .with_message("table names cannot be empty or contain whitespace".into()));
    }
    Ok(())
}

/// Compiler configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Render every query with minimal aliases
    pub minimal_aliases: bool,

    /// Objects that always need minimal aliases
    #[validate(custom(function = "validate_table_names"))]
    pub minimal_alias_tables: Vec<String>,

    /// Fail on fragments that cannot be rewritten instead of warning
    pub strict_fragments: bool,

    /// Rows fetched per round trip when streaming results (1-2000)
    #[validate(range(
        min = 1,
        max = 2000,
        message = "Chunk size must be between 1 and 2000"
    ))]
    pub chunk_size: usize,

    pub target_version: TargetVersion,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            minimal_aliases: false,
            minimal_alias_tables: DEFAULT_MINIMAL_ALIAS_TABLES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            strict_fragments: false,
            chunk_size: 100,
            target_version: TargetVersion::LATEST,
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            minimal_aliases: parse_env_var("SOQL_MINIMAL_ALIASES", "false")?,
            strict_fragments: parse_env_var("SOQL_STRICT_FRAGMENTS", "false")?,
            chunk_size: parse_env_var("SOQL_CHUNK_SIZE", "100")?,
            target_version: parse_env_var("SOQL_TARGET_VERSION", "5.2")?,
            ..Default::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file; missing keys take their defaults
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides on top of this configuration
    pub fn apply_cli(&mut self, cli: &CliOverrides) -> Result<(), ConfigError> {
        if cli.minimal_aliases {
            self.minimal_aliases = true;
        }
        if cli.strict_fragments {
            self.strict_fragments = true;
        }
        if let Some(chunk_size) = cli.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(version) = cli.target_version {
            self.target_version = version;
        }
        self.validate()?;
        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_version(self.target_version)
    }
}

/// Command line overrides (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub minimal_aliases: bool,
    pub strict_fragments: bool,
    pub chunk_size: Option<usize>,
    pub target_version: Option<TargetVersion>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
