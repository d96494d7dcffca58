use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use freight_intake::capability::{
    DocumentExtractor, HeuristicTextExtractor, HttpDocumentExtractor, LlmTextExtractor,
    MockDocumentExtractor, TextExtractor,
};
use freight_intake::config::{AppConfig, ClassifierMode, DocumentExtractorKind, TextExtractorKind};
use freight_intake::error::IntakeError;
use freight_intake::intake::{is_sender_allowed, parse_message};
use freight_intake::llm::{LlmProvider, create_provider};
use freight_intake::pipeline::document::DocumentHandler;
use freight_intake::pipeline::rules::RulesEngine;
use freight_intake::pipeline::text::TextHandler;
use freight_intake::pipeline::{
    EmailInput, EmailProcessor, HybridClassifier, IntentClassifier, LlmClassifier, RuleClassifier,
};

const USAGE: &str = "usage: freight-intake [--pretty] <input>...\n\
    \n\
    Each input is an EmailInput .json file, an .eml message, a directory\n\
    of those, or - for one EmailInput JSON document on stdin.";

/// What the command line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Run { pretty: bool, inputs: Vec<String> },
}

fn parse_args<I>(args: I) -> anyhow::Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut pretty = false;
    let mut inputs = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--pretty" => pretty = true,
            "-h" | "--help" => return Ok(Command::Help),
            _ => inputs.push(arg),
        }
    }
    if inputs.is_empty() {
        bail!("no input given\n\n{USAGE}");
    }
    Ok(Command::Run { pretty, inputs })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (pretty, inputs) = match parse_args(std::env::args().skip(1))? {
        Command::Help => {
            eprintln!("{USAGE}");
            return Ok(());
        }
        Command::Run { pretty, inputs } => (pretty, inputs),
    };

    let config = AppConfig::from_env().context("invalid configuration")?;
    let _log_guard = init_tracing(config.log_dir.as_deref());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        classifier = %config.classifier,
        concurrency = config.concurrency,
        "Starting freight-intake"
    );

    let processor = build_processor(&config)?;

    let mut emails = Vec::new();
    for input in &inputs {
        emails.extend(load_input(input, &config).await);
    }
    info!(inputs = inputs.len(), emails = emails.len(), "Loaded emails");

    let responses = processor.process_batch(emails, config.concurrency).await;
    for response in &responses {
        let line = if pretty {
            serde_json::to_string_pretty(response)?
        } else {
            serde_json::to_string(response)?
        };
        println!("{line}");
    }

    Ok(())
}

/// Stderr logging, plus a daily-rolling file when `log_dir` is set.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "freight-intake.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

/// Wire classifier, capabilities, and handlers from configuration.
fn build_processor(config: &AppConfig) -> anyhow::Result<EmailProcessor> {
    let llm: Option<Arc<dyn LlmProvider>> = config
        .llm
        .as_ref()
        .map(create_provider)
        .transpose()
        .context("failed to create LLM provider")?;
    let require_llm = || {
        llm.clone()
            .context("an LLM-backed component is selected but no LLM is configured")
    };

    let classifier: Arc<dyn IntentClassifier> = match config.classifier {
        ClassifierMode::Rules => Arc::new(RuleClassifier::new(RulesEngine::default_rules())),
        ClassifierMode::Llm => Arc::new(LlmClassifier::new(require_llm()?)),
        ClassifierMode::Hybrid => Arc::new(HybridClassifier::new(
            RulesEngine::default_rules(),
            require_llm()?,
        )),
    };

    let document_extractor: Arc<dyn DocumentExtractor> = match config.document_extractor {
        DocumentExtractorKind::Mock => Arc::new(MockDocumentExtractor::new()),
        DocumentExtractorKind::Http => {
            let endpoint = config
                .extraction_endpoint
                .as_deref()
                .context("INTAKE_EXTRACTION_ENDPOINT is required for the http extractor")?;
            Arc::new(HttpDocumentExtractor::new(endpoint, config.extraction_timeout)?)
        }
    };

    let text_extractor: Arc<dyn TextExtractor> = match config.text_extractor {
        TextExtractorKind::Heuristic => Arc::new(HeuristicTextExtractor::new()),
        TextExtractorKind::Llm => Arc::new(LlmTextExtractor::new(require_llm()?)),
    };

    info!(
        classifier = %config.classifier,
        document_extractor = document_extractor.name(),
        text_extractor = text_extractor.name(),
        "Pipeline ready"
    );

    Ok(EmailProcessor::new(
        classifier,
        DocumentHandler::new(document_extractor).with_deadline(config.extraction_timeout),
        TextHandler::new(text_extractor).with_deadline(config.extraction_timeout),
    ))
}

/// Load every email named by one CLI argument. Failures are logged and
/// skipped.
async fn load_input(arg: &str, config: &AppConfig) -> Vec<EmailInput> {
    if arg == "-" {
        let mut raw = String::new();
        if let Err(e) = tokio::io::stdin().read_to_string(&mut raw).await {
            warn!(error = %e, "Failed to read stdin");
            return Vec::new();
        }
        return match parse_json_inputs(&raw) {
            Ok(emails) => emails,
            Err(e) => {
                warn!(input = "-", error = %e, "Skipping unreadable input");
                Vec::new()
            }
        };
    }

    let path = PathBuf::from(arg);
    let files = if path.is_dir() {
        match list_dir(&path).await {
            Ok(files) => files,
            Err(e) => {
                warn!(input = arg, error = %e, "Skipping unreadable directory");
                return Vec::new();
            }
        }
    } else {
        vec![path]
    };

    let mut emails = Vec::new();
    for file in files {
        match load_file(&file, config).await {
            Ok(loaded) => emails.extend(loaded),
            Err(IntakeError::SenderNotAllowed(sender)) => {
                warn!(input = %file.display(), sender, "Sender not in allowlist, skipping");
            }
            Err(e) => warn!(input = %file.display(), error = %e, "Skipping unreadable input"),
        }
    }
    emails
}

/// `.json`/`.eml` files inside a directory, sorted by name.
async fn list_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if matches!(extension(&path).as_deref(), Some("json" | "eml")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

async fn load_file(path: &Path, config: &AppConfig) -> Result<Vec<EmailInput>, IntakeError> {
    let raw = tokio::fs::read(path).await?;

    if extension(path).as_deref() == Some("eml") {
        let message = parse_message(&raw)?;
        let sender = message.sender.as_deref().unwrap_or("");
        if !is_sender_allowed(&config.allowed_senders, sender) {
            return Err(IntakeError::SenderNotAllowed(sender.to_string()));
        }
        let email = message.materialize(&config.attachment_dir).await?;
        return Ok(vec![email]);
    }

    let text = String::from_utf8(raw)
        .map_err(|_| IntakeError::Unparseable("input is not UTF-8".to_string()))?;
    parse_json_inputs(&text)
}

/// One `EmailInput` object or an array of them.
fn parse_json_inputs(raw: &str) -> Result<Vec<EmailInput>, IntakeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}
