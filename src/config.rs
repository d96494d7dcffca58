//! Configuration, built from environment variables.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};
use crate::pipeline::processor::DEFAULT_CONCURRENCY;

/// Which intent classifier to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifierMode {
    #[default]
    Rules,
    Llm,
    Hybrid,
}

/// Which text extraction capability to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextExtractorKind {
    #[default]
    Heuristic,
    Llm,
}

/// Which document extraction capability to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentExtractorKind {
    #[default]
    Mock,
    Http,
}

macro_rules! env_enum {
    ($ty:ty, $key:literal, { $($label:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($label => Ok($variant),)+
                    other => Err(ConfigError::InvalidValue {
                        key: $key.to_string(),
                        message: format!(
                            "unknown value '{other}' (expected one of: {})",
                            [$($label),+].join(", ")
                        ),
                    }),
                }
            }
        }
    };
}

env_enum!(ClassifierMode, "INTAKE_CLASSIFIER", {
    "rules" => ClassifierMode::Rules,
    "llm" => ClassifierMode::Llm,
    "hybrid" => ClassifierMode::Hybrid,
});

env_enum!(TextExtractorKind, "INTAKE_TEXT_EXTRACTOR", {
    "heuristic" => TextExtractorKind::Heuristic,
    "llm" => TextExtractorKind::Llm,
});

env_enum!(DocumentExtractorKind, "INTAKE_DOCUMENT_EXTRACTOR", {
    "mock" => DocumentExtractorKind::Mock,
    "http" => DocumentExtractorKind::Http,
});

impl fmt::Display for ClassifierMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rules => "rules",
            Self::Llm => "llm",
            Self::Hybrid => "hybrid",
        })
    }
}

/// Runtime configuration for the intake service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierMode,
    pub text_extractor: TextExtractorKind,
    pub document_extractor: DocumentExtractorKind,
    /// Base URL of the document extraction service (`http` extractor only).
    pub extraction_endpoint: Option<String>,
    /// Per-item deadline for extraction calls.
    pub extraction_timeout: Duration,
    /// Present only when an LLM-backed component is selected.
    pub llm: Option<LlmConfig>,
    /// Where attachments of `.eml` inputs are written.
    pub attachment_dir: PathBuf,
    pub allowed_senders: Vec<String>,
    /// Emails processed in parallel.
    pub concurrency: usize,
    /// Enables daily-rolling file logs.
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let classifier: ClassifierMode = parse_or_default(get("INTAKE_CLASSIFIER"))?;
        let text_extractor: TextExtractorKind = parse_or_default(get("INTAKE_TEXT_EXTRACTOR"))?;
        let document_extractor: DocumentExtractorKind =
            parse_or_default(get("INTAKE_DOCUMENT_EXTRACTOR"))?;

        let extraction_endpoint = get("INTAKE_EXTRACTION_ENDPOINT");
        if document_extractor == DocumentExtractorKind::Http && extraction_endpoint.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "INTAKE_EXTRACTION_ENDPOINT".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_number(
            get("INTAKE_EXTRACTION_TIMEOUT_SECS"),
            "INTAKE_EXTRACTION_TIMEOUT_SECS",
            60,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_EXTRACTION_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let needs_llm =
            classifier != ClassifierMode::Rules || text_extractor == TextExtractorKind::Llm;
        let llm = if needs_llm {
            let backend: LlmBackend = match get("INTAKE_LLM_BACKEND") {
                Some(raw) => raw.parse()?,
                None => LlmBackend::OpenAi,
            };
            let api_key = get(backend.api_key_var())
                .ok_or_else(|| ConfigError::MissingEnvVar(backend.api_key_var().to_string()))?;
            let model = get("INTAKE_LLM_MODEL")
                .unwrap_or_else(|| backend.default_model().to_string());
            Some(LlmConfig {
                backend,
                api_key: secrecy::SecretString::from(api_key),
                model,
            })
        } else {
            None
        };

        let allowed_senders = get("INTAKE_ALLOWED_SENDERS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let concurrency: usize = parse_number(
            get("INTAKE_CONCURRENCY"),
            "INTAKE_CONCURRENCY",
            DEFAULT_CONCURRENCY,
        )?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_CONCURRENCY".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            classifier,
            text_extractor,
            document_extractor,
            extraction_endpoint,
            extraction_timeout: Duration::from_secs(timeout_secs),
            llm,
            attachment_dir: get("INTAKE_ATTACHMENT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./attachments")),
            allowed_senders,
            concurrency,
            log_dir: get("INTAKE_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or_default<T>(raw: Option<String>) -> Result<T, ConfigError>
where
    T: FromStr<Err = ConfigError> + Default,
{
    raw.map(|v| v.parse()).transpose().map(Option::unwrap_or_default)
}

fn parse_number<T: FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{v}' is not a valid number"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_need_no_llm() {
        let c = config(&[]).unwrap();
        assert_eq!(c.classifier, ClassifierMode::Rules);
        assert_eq!(c.text_extractor, TextExtractorKind::Heuristic);
        assert_eq!(c.document_extractor, DocumentExtractorKind::Mock);
        assert_eq!(c.extraction_timeout, Duration::from_secs(60));
        assert!(c.llm.is_none());
        assert_eq!(c.allowed_senders, ["*"]);
        assert_eq!(c.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(c.attachment_dir, PathBuf::from("./attachments"));
        assert!(c.log_dir.is_none());
    }

    #[test]
    fn hybrid_requires_api_key() {
        let err = config(&[("INTAKE_CLASSIFIER", "hybrid")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn llm_text_extractor_with_anthropic() {
        let c = config(&[
            ("INTAKE_TEXT_EXTRACTOR", "LLM"),
            ("INTAKE_LLM_BACKEND", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-ant-test"),
        ])
        .unwrap();
        let llm = c.llm.unwrap();
        assert_eq!(llm.backend, LlmBackend::Anthropic);
        assert_eq!(llm.model, "claude-sonnet-4-20250514");
        assert_eq!(llm.api_key.expose_secret(), "sk-ant-test");
    }

    #[test]
    fn http_extractor_requires_endpoint() {
        let err = config(&[("INTAKE_DOCUMENT_EXTRACTOR", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "INTAKE_EXTRACTION_ENDPOINT"));

        let c = config(&[
            ("INTAKE_DOCUMENT_EXTRACTOR", "http"),
            ("INTAKE_EXTRACTION_ENDPOINT", "http://extract.local"),
        ])
        .unwrap();
        assert_eq!(c.extraction_endpoint.as_deref(), Some("http://extract.local"));
    }

    #[test]
    fn invalid_values_name_their_key() {
        let err = config(&[("INTAKE_CLASSIFIER", "magic")]).unwrap_err();
        assert!(err.to_string().contains("INTAKE_CLASSIFIER"));

        let err = config(&[("INTAKE_CONCURRENCY", "many")]).unwrap_err();
        assert!(err.to_string().contains("INTAKE_CONCURRENCY"));

        let err = config(&[("INTAKE_EXTRACTION_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn allowlist_is_split_and_trimmed() {
        let c = config(&[("INTAKE_ALLOWED_SENDERS", "ops@carrier.com, @shipper.com ,")]).unwrap();
        assert_eq!(c.allowed_senders, ["ops@carrier.com", "@shipper.com"]);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let c = config(&[("INTAKE_CLASSIFIER", "  "), ("INTAKE_LOG_DIR", "")]).unwrap();
        assert_eq!(c.classifier, ClassifierMode::Rules);
        assert!(c.log_dir.is_none());
    }
}
