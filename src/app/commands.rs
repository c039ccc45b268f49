use super::App;
use crate::domain_model::*;
use crate::logger::*;
use crate::presentation::*;
use crate::settings::{Command, QuizAction, TutorialAction};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::Write;
use tokio::sync::mpsc;

impl App {
    pub async fn run(&self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Chats => self.print_chats(out).await,
            Command::Messages { chat } => self.print_messages(chat, out).await,
            Command::Send { chat, text, file } => {
                let mut message = NewMessage::text(chat, self.user_id, text);
                if let Some(path) = file {
                    let attachment = Attachment::from_path(&path)
                        .await
                        .with_context(|| format!("read attachment {}", path.display()))?;
                    let url = self
                        .chat_service
                        .upload_attachment(&attachment, self.user_id)
                        .await?;
                    message = message.with_file_url(url);
                }
                let sent = self.chat_service.send_message(message).await?;
                self.chat_service.update_last_message_time(chat).await?;
                writeln!(out, "{}", message_line(&sent, Utc::now()))?;
                Ok(())
            }
            Command::Read { chat } => {
                let messages = self.chat_service.list_messages(chat).await?;
                let marked = self
                    .chat_service
                    .mark_messages_as_read(&messages, self.user_id)
                    .await?;
                writeln!(out, "marked {marked} messages as read")?;
                Ok(())
            }
            Command::NewChat { users, group } => {
                let mut participants = vec![self.user_id];
                participants.extend(users.into_iter().filter(|u| *u != self.user_id));
                let chat = self.chat_service.create_chat(&participants, group).await?;
                writeln!(
                    out,
                    "{}  {}",
                    chat.id,
                    chat_display_name(&chat, self.user_id)
                )?;
                Ok(())
            }
            Command::Watch { chat } => self.watch(chat, out).await,
            Command::Tutorial { action } => self.run_tutorial(action, out).await,
            Command::Quiz { action } => self.run_quiz(action, out).await,
        }
    }

    async fn print_chats(&self, out: &mut impl Write) -> Result<()> {
        let mut view = ChatListView::new(self.user_id);
        view.set_chats(self.chat_service.list_chats().await?);

        match view.content(Utc::now()) {
            ChatListContent::Loading => {}
            ChatListContent::Empty => writeln!(out, "{NO_CHATS_HINT}")?,
            ChatListContent::Rows(rows) => {
                for row in rows {
                    writeln!(
                        out,
                        "{}  [{}] {}  {}",
                        row.chat_id,
                        row.initials,
                        row.name,
                        row.last_activity.as_deref().unwrap_or("-")
                    )?;
                }
            }
        }
        Ok(())
    }

    async fn print_messages(&self, chat: ChatId, out: &mut impl Write) -> Result<()> {
        let mut thread = MessageThread::new(chat);
        thread.extend_history(self.chat_service.list_messages(chat).await?);

        let now = Utc::now();
        for message in thread.messages() {
            writeln!(out, "{}", message_line(message, now))?;
        }
        Ok(())
    }

    async fn watch(&self, chat: ChatId, out: &mut impl Write) -> Result<()> {
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("listen for Ctrl-C: {e}");
            }
        };
        self.watch_until(chat, out, interrupted).await
    }

    /// Prints new messages of `chat` until `stop` resolves or the feed ends.
    pub async fn watch_until(
        &self,
        chat: ChatId,
        out: &mut impl Write,
        stop: impl Future<Output = ()>,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = self
            .chat_service
            .subscribe_to_messages(
                chat,
                Box::new(move |message| {
                    let _ = tx.send(message);
                }),
            )
            .await?;
        info!("watching chat {}, Ctrl-C to stop", subscription.chat_id());

        tokio::pin!(stop);
        let mut thread = MessageThread::new(chat);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                next = rx.recv() => match next {
                    Some(message) => {
                        if thread.push(message.clone()) {
                            writeln!(out, "{}", message_line(&message, Utc::now()))?;
                            out.flush()?;
                        }
                    }
                    None => {
                        warn!("feed of chat {chat} ended");
                        break;
                    }
                }
            }
        }

        subscription.unsubscribe().await;
        Ok(())
    }

    async fn run_tutorial(&self, action: TutorialAction, out: &mut impl Write) -> Result<()> {
        let progress = &self.progress_service;
        match action {
            TutorialAction::Start { tutorial } => {
                let row = progress.start_tutorial(self.user_id, tutorial).await?;
                writeln!(out, "tutorial {} {:?}", row.tutorial_id, row.status)?;
            }
            TutorialAction::Done { tutorial } => {
                let row = progress.mark_tutorial_done(self.user_id, tutorial).await?;
                writeln!(out, "tutorial {} {:?}", row.tutorial_id, row.status)?;
            }
            TutorialAction::Summary => {
                let summary = progress.tutorial_summary(self.user_id).await?;
                writeln!(
                    out,
                    "started {}, completed {} ({}%)",
                    summary.total_started, summary.total_completed, summary.completion_percentage
                )?;
            }
        }
        Ok(())
    }

    async fn run_quiz(&self, action: QuizAction, out: &mut impl Write) -> Result<()> {
        let progress = &self.progress_service;
        match action {
            QuizAction::Submit { quiz, answers } => {
                let outcome = progress.submit_quiz(self.user_id, quiz, &answers).await?;
                writeln!(
                    out,
                    "{}/{} {}",
                    outcome.score,
                    outcome.total_questions,
                    if outcome.passed { "passed" } else { "failed" }
                )?;
            }
            QuizAction::Progress { quiz } => {
                match progress.quiz_progress(self.user_id, quiz).await? {
                    Some(row) => writeln!(out, "{}", quiz_line(&row))?,
                    None => writeln!(out, "quiz {quiz} not attempted")?,
                }
            }
            QuizAction::History => {
                for row in progress.quiz_history(self.user_id).await? {
                    writeln!(out, "{}", quiz_line(&row))?;
                }
            }
        }
        Ok(())
    }
}

pub fn message_line(message: &Message, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}] {}: {}",
        relative_time(message.created_at, now),
        message.sender_name().unwrap_or(UNKNOWN_USER_NAME),
        message.content
    );
    if let Some(url) = &message.file_url {
        line.push_str(&format!(" <{url}>"));
    }
    line
}

fn quiz_line(row: &QuizProgress) -> String {
    format!(
        "quiz {}  {}/{}  {}  {}",
        row.quiz_set_id,
        row.score,
        row.total_questions,
        if row.completed { "passed" } else { "failed" },
        row.last_attempted_at.to_rfc3339()
    )
}
