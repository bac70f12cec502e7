//! Task orchestration: drives sources through fetch + process, merges,
//! canonicalizes, writes artifacts and coordinates tasks under bounded
//! concurrency.
//!
//! Each task moves through fetching, merging, canonicalizing and writing
//! stages. A task's failure never affects its siblings; outcomes are
//! collected into a run summary at the end.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{Config, RuleKind, SourceFormat, SourceSpec, TaskSpec};
use crate::convert::{CommandConverter, Converter};
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::processor::{self, ProcessorKind};
use crate::utils::format_count;
use crate::{domain, network, writer};

/// Outcome of one task, written once by the orchestrator.
#[derive(Debug, Serialize)]
pub struct TaskOutcome {
    pub name: String,
    /// Canonical text artifact, present on success
    pub text_artifact: Option<PathBuf>,
    /// Compiled artifact, present if requested and conversion succeeded
    pub compiled_artifact: Option<PathBuf>,
    /// Non-fatal diagnostics (kind mismatch, subdomain sprawl)
    pub warnings: Vec<String>,
    /// Fatal task error; text_artifact is None when set
    pub error: Option<String>,
    /// Conversion failure; affects only the compiled artifact
    pub compile_error: Option<String>,
}

impl TaskOutcome {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            text_artifact: None,
            compiled_artifact: None,
            warnings: Vec::new(),
            error: None,
            compile_error: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated per-task outcomes for one run, ordered by task name.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub tasks: Vec<TaskOutcome>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// The aggregation pipeline: configuration plus the shared fetcher and
/// optional converter.
pub struct Pipeline {
    config: Config,
    fetcher: Arc<Fetcher>,
    converter: Option<Arc<dyn Converter>>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(Fetcher::new(
            config.base.request_timeout,
            config.base.max_retries,
            config.fetch.get_token(),
        )?);
        let converter: Option<Arc<dyn Converter>> = config
            .converter
            .binary
            .clone()
            .map(|binary| Arc::new(CommandConverter::new(binary)) as Arc<dyn Converter>);
        Ok(Self {
            config,
            fetcher,
            converter,
        })
    }

    /// Replace the converter, mainly for tests injecting a mock.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Run every configured task under the task concurrency bound.
    ///
    /// Tasks are independent; a failed task is recorded in the summary and
    /// does not stop the others.
    pub async fn run(&self) -> RunSummary {
        let mut outcomes: Vec<TaskOutcome> = stream::iter(
            self.config
                .tasks
                .iter()
                .map(|(name, spec)| self.run_task(name, spec)),
        )
        .buffer_unordered(self.config.base.max_concurrent_tasks)
        .collect()
        .await;

        // Completion order is nondeterministic; the summary is not
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            "Run finished: {} succeeded, {} failed, {} downloaded",
            outcomes.iter().filter(|t| t.succeeded()).count(),
            outcomes.iter().filter(|t| !t.succeeded()).count(),
            crate::utils::format_bytes(self.fetcher.total_downloaded() as u64)
        );

        RunSummary { tasks: outcomes }
    }

    async fn run_task(&self, name: &str, spec: &TaskSpec) -> TaskOutcome {
        let mut outcome = TaskOutcome::new(name);
        if let Err(e) = self.process_task(name, spec, &mut outcome).await {
            warn!("[{}] task failed: {}", name, e);
            outcome.error = Some(e.to_string());
        }
        outcome
    }

    async fn process_task(
        &self,
        name: &str,
        spec: &TaskSpec,
        outcome: &mut TaskOutcome,
    ) -> Result<()> {
        info!("[{}] fetching {} sources", name, spec.sources.len());

        // Fetch all sources concurrently, buffering results by source
        // index so the merge order matches the declaration order no matter
        // which fetch finishes first.
        let mut results: Vec<(usize, Result<String>)> = stream::iter(
            spec.sources
                .iter()
                .enumerate()
                .map(|(index, source)| async move { (index, self.fetch_source(source).await) }),
        )
        .buffer_unordered(self.config.base.max_concurrent_downloads)
        .collect()
        .await;
        results.sort_by_key(|(index, _)| *index);

        // First failure (by declaration order) fails the task; completed
        // sibling fetches are discarded with it.
        let mut texts: Vec<String> = Vec::with_capacity(results.len());
        for (_, result) in results {
            texts.push(result?);
        }

        debug!("[{}] merging", name);
        let lines = merge_lines(&texts);
        let lines = processor::apply_filters(lines, &spec.filters)?;
        if lines.is_empty() {
            return Err(Error::Processing(format!(
                "task '{}' has no rules after merge and filtering",
                name
            )));
        }

        // Legacy compatibility shim: the declared kind is authoritative,
        // but a first line that looks like the other kind is worth a
        // warning.
        if let Some(first) = lines.first() {
            let sniffed = sniff_kind(first);
            if sniffed != spec.kind {
                let msg = format!(
                    "first merged line '{}' looks like {} rules but task declares {}; declared kind wins",
                    first, sniffed, spec.kind
                );
                warn!("[{}] {}", name, msg);
                outcome.warnings.push(msg);
            }
        }

        debug!("[{}] canonicalizing as {}", name, spec.kind);
        let merged_count = lines.len();
        let canonical = match spec.kind {
            RuleKind::Domain => {
                let set = domain::canonicalize(&lines, self.config.base.suffix_warn_threshold)?;
                for warning in &set.warnings {
                    warn!("[{}] {}", name, warning);
                }
                outcome.warnings.extend(set.warnings);
                set.lines
            }
            RuleKind::IpCidr => network::to_lines(&network::canonicalize(&lines)?),
        };
        info!(
            "[{}] {} merged rules -> {} canonical",
            name,
            format_count(merged_count),
            format_count(canonical.len())
        );

        let text_path = self
            .config
            .base
            .output_dir
            .join(format!("{}.{}", name, spec.format.extension()));
        writer::write_canonical(&text_path, &canonical, spec.format)?;
        outcome.text_artifact = Some(text_path.clone());

        if spec.compile {
            let compiled_path = self.config.base.output_dir.join(format!("{}.mrs", name));
            match self.compile(spec, &text_path, &compiled_path).await {
                Ok(()) => outcome.compiled_artifact = Some(compiled_path),
                Err(e) => {
                    // Only the binary artifact fails; the text artifact
                    // above stands.
                    warn!("[{}] {}", name, e);
                    outcome.compile_error = Some(e.to_string());
                }
            }
        }

        info!("[{}] done", name);
        Ok(())
    }

    /// Fetch one source and run its processor chain.
    async fn fetch_source(&self, source: &SourceSpec) -> Result<String> {
        let text = self.fetcher.fetch(&source.url).await?;

        let mut chain: Vec<ProcessorKind> = Vec::new();
        if source.format == Some(SourceFormat::YamlPayloadList) {
            chain.push(ProcessorKind::FormatYamlList);
        }
        if chain.is_empty() && source.processors.is_empty() {
            chain.push(ProcessorKind::RemoveCommentsAndEmpty);
        }
        chain.extend(source.processors.iter().copied());

        Ok(processor::apply_chain(&chain, text))
    }

    async fn compile(&self, spec: &TaskSpec, input: &Path, output: &Path) -> Result<()> {
        let Some(converter) = self.converter.clone() else {
            return Err(Error::Conversion(
                "compiled artifact requested but no converter binary configured".to_string(),
            ));
        };

        let kind = spec.kind;
        let format = spec.format;
        let input = input.to_path_buf();
        let output = output.to_path_buf();
        tokio::task::spawn_blocking(move || converter.convert(kind, format, &input, &output))
            .await
            .map_err(|e| Error::Conversion(format!("converter task panicked: {e}")))?
    }
}

/// Concatenate per-source texts in declaration order into one line set,
/// applying the comment/blank safety net uniformly regardless of each
/// source's processor configuration.
pub fn merge_lines(texts: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for text in texts {
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push(trimmed.to_string());
        }
    }
    lines
}

/// Guess a rule kind from one line's punctuation. Non-authoritative; used
/// only to warn when it disagrees with the declared kind.
pub fn sniff_kind(line: &str) -> RuleKind {
    if line.contains(':') || line.contains('/') {
        RuleKind::IpCidr
    } else {
        RuleKind::Domain
    }
}
