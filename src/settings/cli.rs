use super::Parser;
use crate::domain_model::*;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "signchat", version, about = "Chat and learning progress over the hosted gateway")]
pub struct Cli {
    /// Settings file; defaults to settings/dev.toml (debug) or settings/release.toml.
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List chats, most recent activity first.
    Chats,
    /// Print the history of a chat.
    Messages { chat: ChatId },
    /// Send a message, optionally with an attachment uploaded first.
    Send {
        chat: ChatId,
        text: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Mark every message of a chat sent by others as read.
    Read { chat: ChatId },
    /// Create a chat with the session user and the given users.
    NewChat {
        #[arg(required = true)]
        users: Vec<UserId>,
        #[arg(long)]
        group: bool,
    },
    /// Print new messages of a chat until interrupted.
    Watch { chat: ChatId },
    Tutorial {
        #[command(subcommand)]
        action: TutorialAction,
    },
    Quiz {
        #[command(subcommand)]
        action: QuizAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TutorialAction {
    Start { tutorial: TutorialId },
    Done { tutorial: TutorialId },
    Summary,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QuizAction {
    /// Answers are given as `question_id=answer`.
    Submit {
        quiz: QuizSetId,
        #[arg(required = true)]
        answers: Vec<QuizAnswer>,
    },
    Progress { quiz: QuizSetId },
    History,
}
