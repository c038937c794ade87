//! Graph configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! id_prefix = "code"
//! id_digits = 4
//! max_id_attempts = 256
//! flow_capacity = 1024
//! draft_key_prefix = "code_draft"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Prefix of generated code ids (`<prefix>_<digits>`).
    pub id_prefix: String,
    /// Number of random decimal digits in a generated id.
    pub id_digits: u32,
    /// Attempts before id generation reports exhaustion.
    pub max_id_attempts: u32,
    /// Broadcast capacity of the change-notification bus.
    pub flow_capacity: usize,
    /// Prefix of draft storage keys (`<prefix>_<code id>`).
    pub draft_key_prefix: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            id_prefix: "code".to_string(),
            id_digits: 4,
            max_id_attempts: 256,
            flow_capacity: 1024,
            draft_key_prefix: "code_draft".to_string(),
        }
    }
}

impl GraphConfig {
    pub fn from_toml_str(input: &str) -> GraphResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| GraphError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    /// Size of the random id space: `10^id_digits`.
    pub fn id_space(&self) -> u64 {
        10u64.saturating_pow(self.id_digits)
    }

    pub(crate) fn validate(&self) -> GraphResult<()> {
        if self.id_digits == 0 || self.id_digits > 18 {
            return Err(GraphError::Config(format!(
                "id_digits must be between 1 and 18, got {}",
                self.id_digits
            )));
        }
        if self.max_id_attempts == 0 {
            return Err(GraphError::Config("max_id_attempts must be positive".into()));
        }
        if self.flow_capacity == 0 {
            return Err(GraphError::Config("flow_capacity must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(GraphConfig::from_toml_str("").unwrap(), GraphConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = GraphConfig::from_toml_str("id_prefix = \"fn\"\nid_digits = 6\n").unwrap();
        assert_eq!(config.id_prefix, "fn");
        assert_eq!(config.id_digits, 6);
        assert_eq!(config.id_space(), 1_000_000);
        assert_eq!(config.max_id_attempts, 256);
    }

    #[test]
    fn test_rejects_zero_digits() {
        let err = GraphConfig::from_toml_str("id_digits = 0").unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(GraphConfig::from_toml_str("id_digits = ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "draft_key_prefix = \"scratch\"").unwrap();
        let config = GraphConfig::load(file.path()).unwrap();
        assert_eq!(config.draft_key_prefix, "scratch");
    }

    #[test]
    fn test_load_missing_file() {
        let err = GraphConfig::load("/nonexistent/graph.toml").unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }
}
