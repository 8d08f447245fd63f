//! Program configuration
//!
//! Settings that apply to every resource a program declares. Loaded from a YAML
//! file or from the standard AWS environment variables.

use crate::function::DEFAULT_COMPUTE_POLICIES;
use crate::{Result, ServerlessError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration shared by every declaration of a program
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProgramConfig {
    /// AWS region resources are deployed to (e.g., "us-east-1")
    pub region: String,
    /// Managed policy ARNs attached to functions created from inline code
    #[serde(default = "default_compute_policies")]
    pub compute_policies: Vec<String>,
}

fn default_compute_policies() -> Vec<String> {
    DEFAULT_COMPUTE_POLICIES
        .iter()
        .map(|policy| policy.to_string())
        .collect()
}

impl ProgramConfig {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            compute_policies: default_compute_policies(),
        }
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ServerlessError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the region from `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`
    pub fn from_env() -> Result<Self> {
        let region = std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .map_err(|_| {
                ServerlessError::Config(
                    "No AWS region configured; set AWS_REGION or AWS_DEFAULT_REGION".to_string(),
                )
            })?;

        let config = Self::new(&region);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.region.trim().is_empty() {
            return Err(ServerlessError::Config(
                "A region must be configured".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "region: eu-west-1").unwrap();

        let config = ProgramConfig::load(file.path()).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.compute_policies.len(), DEFAULT_COMPUTE_POLICIES.len());
    }

    #[test]
    fn test_custom_policies() {
        let config = ProgramConfig::from_yaml(
            "region: us-east-1\ncompute_policies:\n  - arn:aws:iam::aws:policy/ReadOnlyAccess\n",
        )
        .unwrap();
        assert_eq!(
            config.compute_policies,
            vec!["arn:aws:iam::aws:policy/ReadOnlyAccess".to_string()]
        );
    }

    #[test]
    fn test_empty_region_rejected() {
        let err = ProgramConfig::from_yaml("region: \"\"").unwrap_err();
        assert!(matches!(err, ServerlessError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ProgramConfig::load(Path::new("/nonexistent/config.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
