//! `quillmate` binary: model management and editor actions from the terminal.

mod args;
mod config;

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context as _, bail};
use clap::Parser as _;
use quillmate_editor::{
    CommandDispatcher, CommandOutcome, DocumentSession, MarkdownRenderer,
    PulldownMarkdownRenderer, TextDocument, init_observability, shared,
};
use quillmate_harness::{
    AbortHandle, AiConfig, ChatRequest, Delta, Harness, JsonFileSettingsStore, NewModel,
    StopReason, StreamListener,
};

use crate::args::{AskArgs, Cli, Commands, RunArgs};

/// Writes each delta to stdout as it arrives.
struct StdoutListener;

impl StreamListener for StdoutListener {
    fn on_message(&mut self, delta: Delta) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(delta.content.as_bytes());
        let _ = out.flush();
    }

    fn on_stop(&mut self, reason: StopReason) {
        println!();
        if !reason.is_success() {
            eprintln!("stream ended: {reason:?}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    init_observability();

    let cli = Cli::parse();
    let settings_path = cli.settings.unwrap_or_else(config::default_settings_path);
    let store = JsonFileSettingsStore::open(&settings_path)
        .with_context(|| format!("opening settings at {}", settings_path.display()))?;
    let harness = Harness::builder()
        .config(AiConfig::from_env())
        .settings(Arc::new(store))
        .build()?;

    match cli.command {
        Commands::Models => list_models(&harness),
        Commands::Select { id } => {
            harness.set_current_model(&id)?;
            println!("current model: {id}");
        }
        Commands::AddModel(args) => {
            harness.add_custom_model(NewModel {
                id: args.id.clone(),
                name: args.name,
                is_new: args.new.then_some(true),
                icon: args.icon,
            })?;
            println!("added custom model {}", args.id);
        }
        Commands::RemoveModel { id } => {
            harness.remove_custom_model(&id)?;
            println!("removed custom model {id}");
        }
        Commands::Run(args) => run_command(harness, args).await?,
        Commands::Ask(args) => ask(&harness, args).await?,
    }
    Ok(())
}

fn list_models(harness: &Harness) {
    let current = harness.current_model().map(|m| m.id);
    for model in harness.models() {
        let marker = if current.as_deref() == Some(model.id.as_str()) {
            "*"
        } else {
            " "
        };
        let badge = if model.is_new == Some(true) { " (new)" } else { "" };
        println!(
            "{marker} {:<24} {:<28} {}{badge}",
            model.id, model.name, model.provider
        );
    }
}

async fn run_command(harness: Harness, args: RunArgs) -> anyhow::Result<()> {
    let command = args.command();
    let document = shared(TextDocument::new(args.text).select_all());
    let renderer: Arc<dyn MarkdownRenderer> = Arc::new(PulldownMarkdownRenderer::new());
    let dispatcher = CommandDispatcher::new(harness, document.clone(), renderer);

    match dispatcher.run(command).await {
        CommandOutcome::Applied { .. } => {
            let document = document
                .lock()
                .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
            println!("{}", document.text());
            Ok(())
        }
        CommandOutcome::NotHandled => bail!("no text given"),
        CommandOutcome::Busy => bail!("another command is running over this text"),
        CommandOutcome::Failed(e) => Err(e.into()),
    }
}

async fn ask(harness: &Harness, args: AskArgs) -> anyhow::Result<()> {
    let mut request = ChatRequest::new(args.prompt);
    if let Some(context) = args.context {
        request = request.selected_text(context);
    }
    let call = harness.prepare(request)?;
    tracing::debug!(model = %call.model().id, "prepared ask");
    abort_on_ctrl_c(call.abort_handle());

    if args.raw {
        call.run(&mut StdoutListener).await?;
        return Ok(());
    }

    let document = shared(TextDocument::new(""));
    let renderer: Arc<dyn MarkdownRenderer> = Arc::new(PulldownMarkdownRenderer::new());
    let mut session = DocumentSession::new(document.clone(), renderer, true);
    let summary = call.run(&mut session).await?;
    if summary.reason == StopReason::Truncated {
        eprintln!("warning: response ended without a finish marker");
    }
    let document = document
        .lock()
        .map_err(|_| anyhow::anyhow!("document lock poisoned"))?;
    println!("{}", document.text());
    Ok(())
}

fn abort_on_ctrl_c(handle: AbortHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });
}
