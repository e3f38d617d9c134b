//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use quillmate_editor::EditorCommand;

/// quillmate - AI writing assistant for plain text
#[derive(Parser, Debug)]
#[command(name = "quillmate")]
#[command(version, about = "AI writing assistant for plain text")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file holding the model selection and custom models
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available models, marking the current one
    Models,

    /// Select the model used for requests
    Select {
        /// Model id
        id: String,
    },

    /// Register a custom model
    AddModel(AddModelArgs),

    /// Remove a custom model
    RemoveModel {
        /// Model id
        id: String,
    },

    /// Run an editor action over the given text
    Run(RunArgs),

    /// Send a free-form prompt and stream the answer
    Ask(AskArgs),
}

#[derive(clap::Args, Debug)]
pub struct AddModelArgs {
    #[arg(long)]
    pub id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    /// Show the "new" badge
    #[arg(long)]
    pub new: bool,

    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    pub action: Action,

    /// Text to work on; the whole text is treated as the selection
    #[arg(short, long)]
    pub text: String,

    /// Target language for `translate` (e.g. "en", "zh")
    #[arg(long, default_value = "en")]
    pub lang: String,
}

#[derive(clap::Args, Debug)]
pub struct AskArgs {
    #[arg(short, long)]
    pub prompt: String,

    /// Context text sent after the prompt
    #[arg(long)]
    pub context: Option<String>,

    /// Print the raw streamed text instead of rendered HTML
    #[arg(long)]
    pub raw: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Action {
    Improve,
    Summarize,
    Translate,
    FixGrammar,
}

impl RunArgs {
    pub fn command(&self) -> EditorCommand {
        match self.action {
            Action::Improve => EditorCommand::ImproveWriting,
            Action::Summarize => EditorCommand::Summarize,
            Action::Translate => EditorCommand::Translate {
                target_language: self.lang.clone(),
            },
            Action::FixGrammar => EditorCommand::FixGrammar,
        }
    }
}
