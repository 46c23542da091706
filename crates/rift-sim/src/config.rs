//! Engine configuration.
//!
//! Loaded from YAML (or JSON, which YAML accepts) and applied with
//! [`MockEngine::from_config`](crate::MockEngine::from_config):
//!
//! ```yaml
//! fallback:
//!   statusCode: 404
//! json:
//!   pretty: true
//! stubs:
//!   - method: POST
//!     uri: /orders
//!     responses:
//!       - statusCode: 201
//!         headers:
//!           Location: /orders/1
//!       - statusCode: 500
//!         latencyMs: 200
//! ```

use crate::services::JsonOptions;
use crate::stream::MIN_BIT_RATE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub fallback: FallbackConfig,
    pub json: JsonOptions,
    pub stubs: Vec<StubConfig>,
}

/// Response for requests no stub matches.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            status_code: 404,
            body: None,
        }
    }
}

/// A declarative setup. Every field present must match.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StubConfig {
    pub method: Option<String>,
    pub uri: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub query: Option<String>,
    pub body: Option<String>,
    pub partial_body: Option<String>,
    pub responses: Vec<StubResponseConfig>,
    pub verifiable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StubResponseConfig {
    pub status_code: Option<u16>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub latency_ms: Option<u64>,
    pub bit_rate: Option<u64>,
    pub timeout_ms: Option<u64>,
}

fn check_status(code: u16, location: &str) -> Result<(), anyhow::Error> {
    if !(100..=999).contains(&code) {
        anyhow::bail!("{location}: status code {code} is outside 100-999");
    }
    Ok(())
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: EngineConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        check_status(self.fallback.status_code, "fallback")?;

        for (index, stub) in self.stubs.iter().enumerate() {
            let location = format!("stubs[{index}]");
            if stub.responses.is_empty() {
                anyhow::bail!("{location}: at least one response is required");
            }
            if matches!(&stub.method, Some(m) if m.trim().is_empty()) {
                anyhow::bail!("{location}: method must not be empty");
            }
            if matches!(&stub.uri, Some(u) if u.trim().is_empty()) {
                anyhow::bail!("{location}: uri must not be empty");
            }

            for (position, response) in stub.responses.iter().enumerate() {
                let location = format!("{location}.responses[{position}]");
                if let Some(code) = response.status_code {
                    check_status(code, &location)?;
                }
                if let Some(bits) = response.bit_rate {
                    if bits < MIN_BIT_RATE {
                        anyhow::bail!(
                            "{location}: bitRate {bits} is below the minimum of {MIN_BIT_RATE}"
                        );
                    }
                }
                if let Some(ms) = response.timeout_ms {
                    if ms > i32::MAX as u64 {
                        anyhow::bail!("{location}: timeoutMs {ms} is too large");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.fallback.status_code, 404);
        assert!(!config.json.pretty);
        assert!(config.stubs.is_empty());
    }

    #[test]
    fn test_parse_stubs() {
        let yaml = r#"
json:
  pretty: true
stubs:
  - method: POST
    uri: /orders
    headers:
      Content-Type: application/json
    partialBody: sku
    verifiable: true
    responses:
      - statusCode: 201
        body: created
      - statusCode: 503
        latencyMs: 100
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert!(config.json.pretty);
        let stub = &config.stubs[0];
        assert_eq!(stub.method.as_deref(), Some("POST"));
        assert_eq!(stub.partial_body.as_deref(), Some("sku"));
        assert!(stub.verifiable);
        assert_eq!(stub.responses.len(), 2);
        assert_eq!(stub.responses[1].latency_ms, Some(100));
    }

    #[test]
    fn test_validation_errors() {
        let bad_status = "fallback:\n  statusCode: 42\n";
        assert!(EngineConfig::from_yaml_str(bad_status).is_err());

        let no_responses = "stubs:\n  - uri: /a\n";
        let err = EngineConfig::from_yaml_str(no_responses).unwrap_err();
        assert!(err.to_string().contains("stubs[0]"), "{err}");

        let slow = "stubs:\n  - uri: /a\n    responses:\n      - bitRate: 8\n";
        let err = EngineConfig::from_yaml_str(slow).unwrap_err();
        assert!(err.to_string().contains("bitRate"), "{err}");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fallback:\n  statusCode: 418\n  body: teapot").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.fallback.status_code, 418);
        assert_eq!(config.fallback.body.as_deref(), Some("teapot"));

        assert!(EngineConfig::from_file("/nonexistent/rift-sim.yaml").is_err());
    }
}
