//! Configuration management for rulegen.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::processor::ProcessorKind;

/// Secure string type that zeroizes memory on drop.
/// Used for the optional bearer credential attached to fetch requests.
#[derive(Clone, Default, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    pub fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Global limits and paths
    pub base: BaseConfig,

    /// Fetch credential settings
    pub fetch: FetchConfig,

    /// External converter binary (optional)
    pub converter: ConverterConfig,

    /// Task definitions, keyed by task name (also the output identifier)
    pub tasks: BTreeMap<String, TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    /// Directory receiving canonical and compiled artifacts
    pub output_dir: PathBuf,

    /// Max concurrent source downloads within one task
    pub max_concurrent_downloads: usize,

    /// Max tasks processed in parallel
    pub max_concurrent_tasks: usize,

    /// Download attempts per source before the task fails
    pub max_retries: u32,

    /// Per-attempt request timeout in seconds
    pub request_timeout: u64,

    /// Surviving-subdomain count per parent suffix that triggers a
    /// sprawl warning in the domain canonicalizer
    pub suffix_warn_threshold: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            max_concurrent_downloads: 10,
            max_concurrent_tasks: 3,
            max_retries: 3,
            request_timeout: 30,
            suffix_warn_threshold: 17,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FetchConfig {
    /// Bearer token can be set directly or via RULEGEN_TOKEN env var.
    /// Memory is securely zeroed when dropped.
    pub token: SecureString,
    /// Environment variable name to read the token from (optional)
    pub token_env: Option<String>,
}

impl FetchConfig {
    /// Get the effective token, checking env vars first.
    pub fn get_token(&self) -> SecureString {
        if let Some(ref env_name) = self.token_env {
            if let Ok(val) = env::var(env_name) {
                return SecureString::new(val);
            }
        }
        if let Ok(val) = env::var("RULEGEN_TOKEN") {
            return SecureString::new(val);
        }
        self.token.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConverterConfig {
    /// Path to the converter binary. Absent means compile requests fail
    /// soft: the canonical text artifact is still produced.
    pub binary: Option<PathBuf>,
}

/// One named unit of work producing one rule kind's artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Declared rule kind; authoritative for canonicalizer selection
    pub kind: RuleKind,

    /// Canonical text artifact layout
    #[serde(default)]
    pub format: OutputFormat,

    /// Whether to also produce a compiled binary artifact
    #[serde(default)]
    pub compile: bool,

    /// Declarative line filters applied after merge, before canonicalization
    #[serde(default)]
    pub filters: Vec<FilterRule>,

    /// Ordered source list; order decides tie-breaks before the final sort
    pub sources: Vec<SourceSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Domain,
    IpCidr,
}

impl RuleKind {
    /// Tag understood by the external converter
    pub fn converter_tag(self) -> &'static str {
        match self {
            RuleKind::Domain => "domain",
            RuleKind::IpCidr => "ipcidr",
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.converter_tag())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Yaml,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Yaml => "yaml",
        }
    }

    /// Format name understood by the external converter
    pub fn converter_tag(self) -> &'static str {
        self.extension()
    }
}

/// One remote list contributing lines to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: String,

    /// Payload format override; `yaml-payload-list` prepends the payload
    /// extraction step to the processor chain
    #[serde(default)]
    pub format: Option<SourceFormat>,

    /// Named processors applied left-to-right after fetch
    #[serde(default)]
    pub processors: Vec<ProcessorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "yaml-payload-list")]
    YamlPayloadList,
}

/// Regex-based include/exclude filter, passed as data and never executed
/// as code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    pub action: FilterAction,
    pub pattern: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Include,
    Exclude,
}

impl Config {
    /// Load configuration from a YAML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Any failure here is fatal to the whole run, before any task starts.
    pub fn validate(&self) -> Result<()> {
        if self.tasks.is_empty() {
            anyhow::bail!("No tasks defined");
        }

        if self.base.max_concurrent_downloads == 0 {
            anyhow::bail!("max_concurrent_downloads must be at least 1");
        }
        if self.base.max_concurrent_tasks == 0 {
            anyhow::bail!("max_concurrent_tasks must be at least 1");
        }
        if self.base.max_retries == 0 {
            anyhow::bail!("max_retries must be at least 1");
        }
        if self.base.request_timeout == 0 {
            anyhow::bail!("request_timeout must be at least 1 second");
        }

        for (name, task) in &self.tasks {
            if task.sources.is_empty() {
                anyhow::bail!("Task '{}' has no sources", name);
            }
            for source in &task.sources {
                if !source.url.starts_with("https://") {
                    anyhow::bail!(
                        "Task '{}' source URL must use HTTPS: {}",
                        name,
                        source.url
                    );
                }
            }
            for filter in &task.filters {
                regex::Regex::new(&filter.pattern).with_context(|| {
                    format!(
                        "Task '{}' has an invalid filter pattern: {}",
                        name, filter.pattern
                    )
                })?;
            }
        }

        Ok(())
    }

    /// Save configuration to a YAML file atomically.
    ///
    /// Uses tempfile + rename to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        let parent_dir = path.parent().unwrap_or(Path::new("."));
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml() -> &'static str {
        r#"
tasks:
  ads:
    kind: domain
    sources:
      - url: https://example.com/list.txt
        processors: [remove_comments_and_empty]
"#
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = serde_yaml::from_str(minimal_yaml()).unwrap();
        assert_eq!(config.tasks.len(), 1);
        let task = &config.tasks["ads"];
        assert_eq!(task.kind, RuleKind::Domain);
        assert_eq!(task.format, OutputFormat::Text);
        assert!(!task.compile);
        assert_eq!(task.sources.len(), 1);
        assert_eq!(
            task.sources[0].processors,
            vec![ProcessorKind::RemoveCommentsAndEmpty]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base.max_concurrent_downloads, 10);
        assert_eq!(config.base.max_concurrent_tasks, 3);
        assert_eq!(config.base.max_retries, 3);
        assert_eq!(config.base.request_timeout, 30);
        assert_eq!(config.base.suffix_warn_threshold, 17);
    }

    #[test]
    fn test_unknown_processor_rejected() {
        let yaml = r#"
tasks:
  ads:
    kind: domain
    sources:
      - url: https://example.com/list.txt
        processors: [run_arbitrary_script]
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_empty_tasks_rejected() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let yaml = r#"
tasks:
  ads:
    kind: domain
    sources:
      - url: file:///etc/passwd
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_plain_http_url_rejected() {
        let yaml = r#"
tasks:
  ads:
    kind: domain
    sources:
      - url: http://example.com/list.txt
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("HTTPS"));
    }

    #[test]
    fn test_invalid_filter_pattern_rejected() {
        let yaml = r#"
tasks:
  ads:
    kind: domain
    filters:
      - action: exclude
        pattern: "([unclosed"
    sources:
      - url: https://example.com/list.txt
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ipcidr_kind_parses() {
        let yaml = r#"
tasks:
  cn-ips:
    kind: ipcidr
    format: yaml
    compile: true
    sources:
      - url: https://example.com/cn.txt
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let task = &config.tasks["cn-ips"];
        assert_eq!(task.kind, RuleKind::IpCidr);
        assert_eq!(task.format, OutputFormat::Yaml);
        assert!(task.compile);
    }

    #[test]
    fn test_secure_string_redacted_in_debug() {
        let s = SecureString::from("super-secret");
        assert_eq!(format!("{:?}", s), "[REDACTED]");
    }

    #[test]
    fn test_yaml_payload_list_format_override() {
        let yaml = r#"
tasks:
  cn:
    kind: domain
    sources:
      - url: https://example.com/cn.yaml
        format: yaml-payload-list
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.tasks["cn"].sources[0].format,
            Some(SourceFormat::YamlPayloadList)
        );
    }
}
