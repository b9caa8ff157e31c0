use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use mimic_core::{CredentialField, JobStage, Stage, WizardState};
use mimic_engine::{
    AnalysisResults, AuthApi, AutomationApi, ReqwestBackend, ScriptWriter, SessionProvider,
    SessionStore, StatusReport, VideoFile, WorkflowOrchestrator, WorkflowSettings,
};
use mimic_logging::{mimic_info, mimic_warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One `--credential label:username:password` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CredentialArg {
    pub label: String,
    pub username: String,
    pub password: String,
}

/// Splits on the first two colons so passwords may contain `:`.
pub(crate) fn parse_credential(value: &str) -> Result<CredentialArg, String> {
    let mut parts = value.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(label), Some(username), Some(password)) if !label.trim().is_empty() => {
            Ok(CredentialArg {
                label: label.trim().to_string(),
                username: username.to_string(),
                password: password.to_string(),
            })
        }
        _ => Err("expected label:username:password".to_string()),
    }
}

pub(crate) struct AppContext {
    pub backend: Arc<ReqwestBackend>,
    pub session: Arc<SessionStore>,
    pub workflow: WorkflowSettings,
}

impl AppContext {
    fn require_token(&self) -> Result<String> {
        match self.session.token() {
            Some(token) => Ok(token),
            None => bail!("not signed in: pass --token or set MIMIC_TOKEN"),
        }
    }
}

pub(crate) async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<()> {
    let user = ctx
        .session
        .sign_in(ctx.backend.as_ref() as &dyn AuthApi, email, password)
        .await?;
    print_session(ctx, &user.name, &user.email);
    Ok(())
}

pub(crate) async fn signup(
    ctx: &AppContext,
    name: &str,
    email: &str,
    password: &str,
) -> Result<()> {
    let user = ctx
        .session
        .sign_up(ctx.backend.as_ref() as &dyn AuthApi, name, email, password)
        .await?;
    print_session(ctx, &user.name, &user.email);
    Ok(())
}

fn print_session(ctx: &AppContext, name: &str, email: &str) {
    println!("Signed in as {name} <{email}>");
    if let Some(token) = ctx.session.token() {
        println!("export MIMIC_TOKEN={token}");
    }
}

pub(crate) async fn videos(ctx: &AppContext) -> Result<()> {
    let token = ctx.require_token()?;
    let list = ctx.backend.list_videos(&token).await?;
    if list.videos.is_empty() {
        println!("No videos uploaded yet.");
        return Ok(());
    }
    for video in &list.videos {
        println!(
            "{}  {}  {}  {}",
            video.id,
            video.original_name.as_deref().unwrap_or("-"),
            video.status.as_deref().unwrap_or("-"),
            video.upload_timestamp.as_deref().unwrap_or("-"),
        );
    }
    println!("{} video(s)", list.count.max(list.videos.len()));
    Ok(())
}

pub(crate) async fn health(ctx: &AppContext) -> Result<()> {
    let report = ctx.backend.health().await?;
    println!("automation service: {}", report.automation_service);
    println!("mcp server:         {}", report.mcp_server);
    if let Some(timestamp) = report.timestamp {
        println!("checked at:         {timestamp}");
    }
    Ok(())
}

/// Prints the analysis and execution state of one uploaded video.
pub(crate) async fn status(ctx: &AppContext, video_id: &str, with_results: bool) -> Result<()> {
    let token = ctx.require_token()?;
    let report = ctx.backend.analysis_status(&token, video_id).await?;
    print!("{}", format_status(&report));
    if with_results {
        let results = ctx.backend.analysis_results(&token, video_id).await?;
        print!("{}", format_results(&results));
    }
    Ok(())
}

fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "video:     {}", report.video_id);
    let _ = write!(out, "analysis:  {}", report.analysis);
    if let Some(steps) = report.analysis_steps {
        let _ = write!(out, " ({steps} step(s))");
    }
    out.push('\n');
    if let Some(error) = &report.analysis_error {
        let _ = writeln!(out, "  error:   {error}");
    }
    if let Some(execution) = &report.execution_status {
        let _ = writeln!(out, "execution: {execution}");
    }
    if let Some(error) = &report.execution_error {
        let _ = writeln!(out, "  error:   {error}");
    }
    for line in &report.execution_log {
        let _ = writeln!(out, "  | {line}");
    }
    if let Some(updated) = &report.last_updated {
        let _ = writeln!(out, "updated:   {updated}");
    }
    out
}

fn format_results(results: &AnalysisResults) -> String {
    let mut out = String::new();
    for step in &results.analysis.steps {
        let _ = writeln!(out, "  {}. {}", step.index + 1, step.summary());
    }
    if let Some(execution) = &results.execution {
        let _ = writeln!(out, "last run:  {}", execution.status);
        if let Some(error) = &execution.error {
            let _ = writeln!(out, "  error:   {error}");
        }
        for line in &execution.log {
            let _ = writeln!(out, "  | {line}");
        }
    }
    out
}

/// Drives the whole wizard for one recording and writes the script.
pub(crate) async fn run(
    ctx: &AppContext,
    video: &Path,
    credentials: &[CredentialArg],
    output_dir: &Path,
) -> Result<()> {
    let file = VideoFile::from_path(video)
        .with_context(|| format!("failed to read {}", video.display()))?;
    let writer = ScriptWriter::new(output_dir);

    let mut orchestrator = WorkflowOrchestrator::new(
        ctx.backend.clone(),
        ctx.session.clone(),
        ctx.workflow,
    );
    let cancel = orchestrator.cancel_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            mimic_warn!("interrupted, stopping");
            cancel.cancel();
        }
    });
    let printers = [
        spawn_progress_printer(orchestrator.upload_progress()),
        spawn_stage_printer(orchestrator.subscribe()),
    ];

    let outcome = drive(&mut orchestrator, &file, credentials, &writer).await;

    orchestrator.teardown();
    interrupt.abort();
    for printer in printers {
        printer.abort();
    }
    outcome
}

async fn drive(
    orchestrator: &mut WorkflowOrchestrator,
    file: &VideoFile,
    credentials: &[CredentialArg],
    writer: &ScriptWriter,
) -> Result<()> {
    let started = Utc::now();

    let artifact_id = orchestrator.submit_upload(file).await?;
    mimic_info!("uploaded as {}", artifact_id);

    let analysis = orchestrator.start_analysis().await?;
    println!("Detected {} step(s):", analysis.steps.len());
    for step in &analysis.steps {
        println!("  {}. {}", step.index + 1, step.summary());
    }

    for credential in credentials {
        let Some(id) = orchestrator.add_credential() else {
            bail!("wizard stopped");
        };
        let fields = [
            (CredentialField::Label, &credential.label),
            (CredentialField::Username, &credential.username),
            (CredentialField::Password, &credential.password),
        ];
        for (field, value) in fields {
            orchestrator.update_credential(&id, field, value.as_str());
        }
    }
    orchestrator.proceed()?;

    let script = orchestrator.generate_and_run()?;
    let path = writer.write(&script)?;
    let elapsed = Utc::now().signed_duration_since(started);
    println!(
        "Wrote {} ({} steps) in {}s",
        path.display(),
        script.step_count,
        elapsed.num_seconds()
    );
    Ok(())
}

fn spawn_progress_printer(mut progress: watch::Receiver<u8>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow_and_update();
            eprint!("\rUploading... {percent:>3}%");
            if percent == 100 {
                eprintln!();
            }
        }
    })
}

fn spawn_stage_printer(mut states: watch::Receiver<WizardState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last: Option<(Stage, Option<JobStage>)> = None;
        while states.changed().await.is_ok() {
            let view = states.borrow_and_update().view();
            let current = (view.stage, view.polled_stage);
            if last == Some(current) {
                continue;
            }
            if last.map(|(stage, _)| stage) != Some(view.stage) {
                eprintln!("Step {} of {}: {}", view.step_number, view.step_total, view.title);
            }
            if let Some(polled) = view.polled_stage.filter(|_| view.stage == Stage::Analyze) {
                eprintln!("  analysis {polled}");
            }
            if let Some(error) = &view.error {
                eprintln!("  error: {error}");
            }
            last = Some(current);
        }
    })
}
