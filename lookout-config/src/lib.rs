//! Loader for Lookout configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, the YAML file (optional by
//! default), inline YAML snippets, then `LOOKOUT_`-prefixed environment
//! variables using `__` between nested keys (`LOOKOUT_LLM__MODEL=gpt-4o`).
//! String values may reference other variables as `${VAR}`; expansion is
//! recursive up to a fixed depth.
//!
//! The two provider credentials fall back to `SERPER_API_KEY` and
//! `OPENAI_API_KEY` when no configured value resolves. A missing credential
//! is not an error here: the provider call fails later and the session
//! degrades.
use config::{Config, ConfigError, Environment, File};
use lookout_common::observability::LogFormat;
use lookout_llm::openai::OPENAI_API_BASE;
use lookout_llm::{DEFAULT_OPENAI_MODEL, DEFAULT_TEMPERATURE};
use lookout_web::fetch::DEFAULT_FETCH_TIMEOUT;
use lookout_web::serper::{DEFAULT_MAX_RESULTS, SERPER_SEARCH_ENDPOINT};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const SERPER_KEY_ENV: &str = "SERPER_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LookoutConfig {
    pub search: SearchSettings,
    pub llm: LlmSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: SERPER_SEARCH_ENDPOINT.into(),
            api_key: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    /// Total bound on a completion request, streaming included. Unset waits forever.
    pub request_timeout_secs: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: OPENAI_API_BASE.into(),
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Characters of each page kept in the search context.
    pub excerpt_chars: usize,
    pub fetch_timeout_secs: u64,
    /// Most recent history messages sent with each request; 0 sends everything.
    pub history_window: usize,
    pub exit_command: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            excerpt_chars: 500,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            history_window: 40,
            exit_command: "salir".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub stderr: bool,
    pub dir: Option<PathBuf>,
}

impl LookoutConfig {
    /// Serper key, or `""` when none was configured.
    pub fn search_api_key(&self) -> &str {
        self.search.api_key.as_deref().unwrap_or_default()
    }

    /// OpenAI key, or `""` when none was configured.
    pub fn llm_api_key(&self) -> &str {
        self.llm.api_key.as_deref().unwrap_or_default()
    }

    fn apply_credential_fallbacks(&mut self) {
        self.search.api_key = resolved(self.search.api_key.take()).or_else(|| env_key(SERPER_KEY_ENV));
        self.llm.api_key = resolved(self.llm.api_key.take()).or_else(|| env_key(OPENAI_KEY_ENV));
    }
}

/// Drop blank values and placeholders whose variable was never set.
fn resolved(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.contains("${"))
}

fn env_key(name: &str) -> Option<String> {
    resolved(std::env::var(name).ok())
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct LookoutConfigLoader {
    files: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for LookoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LookoutConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// let config = LookoutConfigLoader::new()
    ///     .with_yaml_str("session:\n  exit_command: quit")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.session.exit_command, "quit");
    /// assert_eq!(config.search.max_results, 5);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is merged only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use lookout_config::LookoutConfigLoader;
    ///
    /// let cfg = LookoutConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   model: "gpt-4o-mini"
    ///   temperature: 0.2
    ///   api_key: "sk-inline"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.llm.model, "gpt-4o-mini");
    /// assert_eq!(cfg.llm_api_key(), "sk-inline");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.files = self
            .files
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, overlay the environment, expand `${VAR}`
    /// placeholders and deserialize into [`LookoutConfig`].
    pub fn load(self) -> Result<LookoutConfig, ConfigError> {
        let cfg = self
            .files
            .add_source(
                Environment::with_prefix("LOOKOUT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: LookoutConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.apply_credential_fallbacks();

        tracing::debug!(
            search_endpoint = %typed.search.endpoint,
            model = %typed.llm.model,
            has_search_key = typed.search.api_key.is_some(),
            has_llm_key = typed.llm.api_key.is_some(),
            "config.loaded"
        );
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Lima")), ("COUNTRY", Some("PE"))], || {
            let mut v = json!(["hola-$CITY", { "loc": "${CITY}-${COUNTRY}" }, 42, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(v, json!(["hola-Lima", { "loc": "Lima-PE" }, 42, true, null]));
        });
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unresolved_placeholders_are_not_credentials() {
        assert_eq!(resolved(Some("${DOES_NOT_EXIST}".into())), None);
        assert_eq!(resolved(Some("  ".into())), None);
        assert_eq!(resolved(Some("sk-1".into())), Some("sk-1".into()));
    }

    #[test]
    #[serial]
    fn defaults_match_the_documented_values() {
        temp_env::with_vars_unset([SERPER_KEY_ENV, OPENAI_KEY_ENV], || {
            let cfg = LookoutConfigLoader::new().load().unwrap();
            assert_eq!(cfg.search.max_results, 5);
            assert_eq!(cfg.session.excerpt_chars, 500);
            assert_eq!(cfg.session.fetch_timeout_secs, 5);
            assert_eq!(cfg.session.exit_command, "salir");
            assert_eq!(cfg.llm.model, "gpt-3.5-turbo");
            assert!((cfg.llm.temperature - 0.7).abs() < f32::EPSILON);
            assert_eq!(cfg.search_api_key(), "");
            assert_eq!(cfg.llm_api_key(), "");
        });
    }

    #[test]
    #[serial]
    fn credentials_fall_back_to_provider_env_vars() {
        temp_env::with_vars(
            [(SERPER_KEY_ENV, Some("serper-env")), (OPENAI_KEY_ENV, Some("sk-env"))],
            || {
                let cfg = LookoutConfigLoader::new()
                    .with_yaml_str("llm:\n  api_key: sk-file")
                    .load()
                    .unwrap();
                assert_eq!(cfg.search_api_key(), "serper-env");
                assert_eq!(cfg.llm_api_key(), "sk-file");
            },
        );
    }

    #[test]
    #[serial]
    fn prefixed_env_overrides_nested_keys() {
        temp_env::with_vars(
            [
                ("LOOKOUT_LLM__MODEL", Some("gpt-4o-mini")),
                ("LOOKOUT_SESSION__HISTORY_WINDOW", Some("6")),
            ],
            || {
                let cfg = LookoutConfigLoader::new()
                    .with_yaml_str("llm:\n  model: from-yaml")
                    .load()
                    .unwrap();
                assert_eq!(cfg.llm.model, "gpt-4o-mini");
                assert_eq!(cfg.session.history_window, 6);
            },
        );
    }
}
