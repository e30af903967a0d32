//! pushgate - dry runs of the commit validation pipeline
//!
//! ## Commands
//!
//! - `check`: validate one described push against in-memory collaborators
//! - `validators`: list an assembled validator chain and its fingerprint

mod push;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use pushgate_core::{
    BranchNameKey, CommitReceivedEvent, CommitValidationError, CommitValidationMessage,
    IdentifiedUser, PatchSetId, ProjectName, ProjectState, SshInfo, ValidationConfig,
    ValidationInfos, ValidationMessageType, METRICS,
};
use pushgate_state::fakes::{
    MemoryBannedCommits, MemoryMetrics, MemoryPermissionBackend, MemoryProjectCache,
    MemoryProjectConfigLoader, SimpleApprovalQueryBuilder, StaticUrlFormatter,
};
use pushgate_validation::{
    CommitValidationInfoListener, CommitValidators, CommitValidatorsFactory, GerritCommitsRequest,
    MergedCommitsRequest, ReceiveCommitsRequest, RunOptions,
};
use serde::Serialize;
use tracing::{debug, info, Level};

use crate::push::{DryRunWorld, PushDescription};

#[derive(Parser)]
#[command(name = "pushgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Commit validation pipeline dry runs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a described push
    Check {
        /// Path to the push description (JSON)
        #[arg(long)]
        push: PathBuf,

        /// Server settings (TOML); defaults come from PUSHGATE_* variables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Which validator chain to run
        #[arg(short, long, value_enum, default_value_t = Scenario::Receive)]
        scenario: Scenario,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the validators of an assembled chain
    Validators {
        /// Server settings (TOML); defaults come from PUSHGATE_* variables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Which validator chain to list
        #[arg(short, long, value_enum, default_value_t = Scenario::Receive)]
        scenario: Scenario,
    },
}

/// Push scenario selecting the validator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
enum Scenario {
    /// Commits pushed by a client
    Receive,
    /// Commits created by the server
    Gerrit,
    /// Reviews of already merged commits
    Merged,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pushgate_core::init_tracing(cli.log_json, level);

    match cli.command {
        Commands::Check {
            push,
            config,
            scenario,
            json,
        } => cmd_check(&push, config.as_deref(), scenario, json).await,
        Commands::Validators { config, scenario } => {
            cmd_validators(config.as_deref(), scenario)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path)),
        None => ValidationConfig::from_env().context("Invalid PUSHGATE_* environment"),
    }
}

/// Logs every accepted commit.
struct LogInfoListener;

#[async_trait]
impl CommitValidationInfoListener for LogInfoListener {
    async fn commit_validated(
        &self,
        infos: &ValidationInfos,
        event: &CommitReceivedEvent,
        patch_set: Option<&PatchSetId>,
    ) -> Result<()> {
        info!(
            commit = %event.commit.id,
            branch = %event.branch.branch,
            patch_set = ?patch_set.map(ToString::to_string),
            validators = infos.len(),
            "commit accepted"
        );
        Ok(())
    }
}

fn factory(
    config: ValidationConfig,
    project_cache: Arc<MemoryProjectCache>,
    config_loader: Arc<MemoryProjectConfigLoader>,
    metrics: Arc<MemoryMetrics>,
) -> CommitValidatorsFactory {
    let url_formatter = Arc::new(StaticUrlFormatter::new(config.canonical_web_url.as_deref()));
    CommitValidatorsFactory::new(
        config,
        url_formatter,
        project_cache,
        config_loader,
        metrics,
        Arc::new(SimpleApprovalQueryBuilder),
    )
    .with_info_listener(Arc::new(LogInfoListener))
}

/// Outcome of one dry run.
#[derive(Debug, Serialize)]
struct CheckReport {
    commit: String,
    scenario: Scenario,
    fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    validators: Option<ValidationInfos>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<CommitValidationError>,
}

impl CheckReport {
    fn accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

async fn run_check(
    push: &PushDescription,
    config: ValidationConfig,
    scenario: Scenario,
) -> Result<CheckReport> {
    let world = DryRunWorld::from_push(push)?;
    let metrics = Arc::new(MemoryMetrics::new());
    let factory = factory(
        config,
        world.project_cache.clone(),
        world.config_loader.clone(),
        metrics.clone(),
    );

    let chain = match scenario {
        Scenario::Receive => factory.for_receive_commits(world.receive_request(push)),
        Scenario::Gerrit => factory.for_gerrit_commits(world.gerrit_request(push)),
        Scenario::Merged => factory.for_merged_commits(world.merged_request(push)),
    }
    .context("Failed to assemble validators")?;

    let event = world.event(push);
    let mut options = RunOptions::default();
    if let Some(patch_set) = push.patch_set {
        options = options.with_patch_set(patch_set);
    }

    let outcome = chain.validate(&event, &options).await;
    for increment in metrics.increments() {
        debug!(metric = %increment.metric, fields = ?increment.fields, "metric recorded");
    }

    let (validators, rejection) = match outcome {
        Ok(infos) => (Some(infos), None),
        Err(e) => (None, Some(e)),
    };
    Ok(CheckReport {
        commit: push.commit.id.to_string(),
        scenario,
        fingerprint: chain.fingerprint(),
        validators,
        rejection,
    })
}

fn severity(message: &CommitValidationMessage) -> &'static str {
    match message.message_type {
        ValidationMessageType::Fatal => "FATAL",
        ValidationMessageType::Error => "ERROR",
        ValidationMessageType::Warning => "WARNING",
        ValidationMessageType::Hint => "HINT",
        ValidationMessageType::Other => "",
    }
}

fn render_message(message: &CommitValidationMessage) -> String {
    match severity(message) {
        "" => message.message.trim_end().to_string(),
        level => format!("{}: {}", level, message.message.trim_end()),
    }
}

fn render_report_text(report: &CheckReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Commit:      {}\n", report.commit));
    out.push_str(&format!("Fingerprint: {}\n", report.fingerprint));

    if let Some(infos) = &report.validators {
        for (name, info) in infos.iter() {
            let status = if info.is_skipped() {
                "skipped"
            } else {
                "passed"
            };
            out.push_str(&format!("  {:<45} {}\n", name, status));
            for message in &info.messages {
                out.push_str(&format!("      {}\n", render_message(message)));
            }
        }
        out.push_str("Result: ACCEPTED\n");
    }

    if let Some(rejection) = &report.rejection {
        out.push_str("Result: REJECTED\n");
        out.push_str(&rejection.full_message());
        out.push('\n');
    }
    out
}

async fn cmd_check(
    push_path: &Path,
    config_path: Option<&Path>,
    scenario: Scenario,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let push = PushDescription::load(push_path)?;

    let report = run_check(&push, config, scenario).await?;
    METRICS.flush();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report_text(&report));
    }

    if let Some(rejection) = &report.rejection {
        anyhow::bail!("Commit {} rejected: {}", report.commit, rejection.reason);
    }
    Ok(())
}

fn assemble_sample(config: ValidationConfig, scenario: Scenario) -> Result<CommitValidators> {
    let project = ProjectName::new("sample");
    let branch = BranchNameKey::new(project.clone(), "refs/heads/main");
    let permissions = Arc::new(MemoryPermissionBackend::new());
    let user = IdentifiedUser::new(1);
    let factory = factory(
        config,
        Arc::new(MemoryProjectCache::new().with_project(ProjectState::active(project))),
        Arc::new(MemoryProjectConfigLoader::new()),
        Arc::new(MemoryMetrics::new()),
    );

    let chain = match scenario {
        Scenario::Receive => factory.for_receive_commits(ReceiveCommitsRequest {
            permissions,
            branch,
            user,
            ssh_info: SshInfo::default(),
            banned_commits: Arc::new(MemoryBannedCommits::new()),
            change: None,
            skip_validation: false,
        }),
        Scenario::Gerrit => factory.for_gerrit_commits(GerritCommitsRequest {
            permissions,
            branch,
            user,
            ssh_info: SshInfo::default(),
            change: None,
        }),
        Scenario::Merged => factory.for_merged_commits(MergedCommitsRequest {
            permissions,
            branch,
            user,
        }),
    }?;
    Ok(chain)
}

fn cmd_validators(config_path: Option<&Path>, scenario: Scenario) -> Result<()> {
    let config = load_config(config_path)?;
    let chain = assemble_sample(config, scenario)?;

    for (i, name) in chain.validator_names().iter().enumerate() {
        println!("{:>2}. {}", i + 1, name);
    }
    println!("Fingerprint: {}", chain.fingerprint());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push_json() -> serde_json::Value {
        json!({
            "ref_name": "refs/for/main",
            "project": { "name": "demo", "require_change_id": true },
            "commit": {
                "id": "1111111111111111111111111111111111111111",
                "parents": ["2222222222222222222222222222222222222222"],
                "author": { "name": "J. Doe", "email": "jdoe@example.com" },
                "committer": { "name": "J. Doe", "email": "jdoe@example.com" },
                "message": "Add feature\n\nChange-Id: I0123456789abcdef0123456789abcdef01234567\n"
            },
            "user": { "account_id": 1000, "user_name": "jdoe", "emails": ["jdoe@example.com"] },
            "changed_paths": ["src/lib.rs", "README.md"]
        })
    }

    fn write_push(dir: &tempfile::TempDir, value: &serde_json::Value) -> PathBuf {
        let path = dir.path().join("push.json");
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    #[tokio::test]
    async fn clean_push_is_accepted() {
        let push: PushDescription = serde_json::from_value(push_json()).unwrap();
        let report = run_check(&push, ValidationConfig::default(), Scenario::Receive)
            .await
            .unwrap();

        assert!(report.accepted());
        let infos = report.validators.as_ref().unwrap();
        assert_eq!(infos.len(), 12);
        assert!(infos.get("ChangeIdValidator").is_some());
        assert!(render_report_text(&report).contains("Result: ACCEPTED"));
    }

    #[tokio::test]
    async fn missing_change_id_is_rejected_with_hint() {
        let mut value = push_json();
        value["commit"]["message"] = json!("Add feature\n");
        let push: PushDescription = serde_json::from_value(value).unwrap();
        let mut config = ValidationConfig::default();
        config.canonical_web_url = Some("https://review.example.com".to_string());

        let report = run_check(&push, config, Scenario::Receive).await.unwrap();

        let rejection = report.rejection.as_ref().unwrap();
        assert_eq!(rejection.reason, "missing Change-Id in message footer");
        let text = render_report_text(&report);
        assert!(text.contains("Result: REJECTED"));
        assert!(text.contains("https://review.example.com/tools/hooks/commit-msg"));
    }

    #[tokio::test]
    async fn merged_scenario_ignores_message_policy() {
        let mut value = push_json();
        value["commit"]["message"] = json!("Add feature\n");
        let push: PushDescription = serde_json::from_value(value).unwrap();

        let report = run_check(&push, ValidationConfig::default(), Scenario::Merged)
            .await
            .unwrap();
        assert!(report.accepted());
        assert_eq!(report.validators.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn forged_author_needs_permission() {
        let mut value = push_json();
        value["commit"]["author"] = json!({ "name": "Other", "email": "other@example.com" });
        let push: PushDescription = serde_json::from_value(value.clone()).unwrap();
        let report = run_check(&push, ValidationConfig::default(), Scenario::Receive)
            .await
            .unwrap();
        assert_eq!(
            report.rejection.unwrap().reason,
            "invalid author"
        );

        value["granted"] = json!(["forge_author"]);
        let push: PushDescription = serde_json::from_value(value).unwrap();
        let report = run_check(&push, ValidationConfig::default(), Scenario::Receive)
            .await
            .unwrap();
        assert!(report.accepted());
    }

    #[tokio::test]
    async fn json_report_names_scenario_and_validators() {
        let push: PushDescription = serde_json::from_value(push_json()).unwrap();
        let report = run_check(&push, ValidationConfig::default(), Scenario::Gerrit)
            .await
            .unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["scenario"], "gerrit");
        assert!(value.get("rejection").is_none());
        assert_eq!(value["validators"]["FileCountValidator"]["status"], "passed");
    }

    #[tokio::test]
    async fn check_command_fails_on_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let mut value = push_json();
        value["banned"] = json!(["1111111111111111111111111111111111111111"]);
        let path = write_push(&dir, &value);

        let err = cmd_check(&path, None, Scenario::Receive, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[tokio::test]
    async fn check_command_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_push(&dir, &push_json());
        let config_path = dir.path().join("pushgate.toml");
        std::fs::write(&config_path, "max_files = 1\n").unwrap();

        let err = cmd_check(&path, Some(&config_path), Scenario::Receive, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Exceeding maximum number of files per change"));
    }

    #[test]
    fn sample_chains_have_stable_fingerprints() {
        let a = assemble_sample(ValidationConfig::default(), Scenario::Receive).unwrap();
        let b = assemble_sample(ValidationConfig::default(), Scenario::Receive).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let merged = assemble_sample(ValidationConfig::default(), Scenario::Merged).unwrap();
        assert_ne!(a.fingerprint(), merged.fingerprint());
    }

    #[test]
    fn messages_render_with_severity() {
        assert_eq!(
            render_message(&CommitValidationMessage::hint("run the hook\n")),
            "HINT: run the hook"
        );
        assert_eq!(
            render_message(&CommitValidationMessage::new("plain", ValidationMessageType::Other)),
            "plain"
        );
    }
}
