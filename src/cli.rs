//! Terminal front end — line-oriented REPL over the session core.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::api::Role;
use crate::notify::{Notification, NotificationLevel, Notifier};
use crate::profile::{ProfileDraft, ProfileFormAggregator, ProfileRecord, WizardStage};
use crate::session::{ConversationStore, MessageExchangeController, SessionEvent};

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Open(String),
    Delete(String),
    History,
    Profile,
    Help,
    Quit,
    Chat(String),
    /// Known command with a missing argument, or an unknown command.
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Chat(line.to_string());
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg) {
            ("new", _) => Command::New,
            ("list", _) => Command::List,
            ("history", _) => Command::History,
            ("profile", _) => Command::Profile,
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            ("open" | "delete", "") => Command::Invalid(format!("/{name} needs a conversation id")),
            ("open", id) => Command::Open(id.to_string()),
            ("delete", id) => Command::Delete(id.to_string()),
            _ => Command::Invalid(format!("Unknown command /{name}")),
        }
    }
}

const HELP: &str = "\
Commands:
  /new            start a new conversation
  /list           list conversations
  /open <id>      switch to a conversation
  /delete <id>    delete a conversation
  /history        show the active conversation
  /profile        fill in your profile and submit it
  /quit           exit
Anything else is sent as a chat message.";

/// Prints notifications to stderr.
pub struct CliNotifier;

impl Notifier for CliNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("✅ {}", notification.text),
            NotificationLevel::Error => eprintln!("❌ {}", notification.text),
        }
    }
}

/// Print assistant replies as they land in the store.
pub fn spawn_renderer(store: &ConversationStore) -> JoinHandle<()> {
    let mut rx = store.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::MessageAppended { message, .. }) if message.role == Role::Assistant => {
                    println!("\n{}\n", message.display_text());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Renderer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Outcome of a wizard prompt.
enum Answer {
    Value(String),
    Back,
    Cancel,
}

/// REPL over any line source.
pub struct Repl<R> {
    controller: MessageExchangeController,
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Repl<R> {
    pub fn new(controller: MessageExchangeController, reader: R) -> Self {
        Self {
            controller,
            lines: reader.lines(),
        }
    }

    fn store(&self) -> &Arc<ConversationStore> {
        self.controller.store()
    }

    /// Run until `/quit` or end of input.
    pub async fn run(&mut self) {
        self.store().load_conversations().await;
        eprintln!("{HELP}\n");
        eprint!("> ");

        while let Some(line) = self.next_line().await {
            if line.trim().is_empty() {
                eprint!("> ");
                continue;
            }
            match Command::parse(&line) {
                Command::Quit => break,
                command => self.execute(command).await,
            }
            eprint!("> ");
        }
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::New => {
                if let Some(conversation) = self.store().create_conversation().await {
                    println!("Conversation {}", conversation.id);
                }
            }
            Command::List => {
                self.store().load_conversations().await;
                self.print_conversations().await;
            }
            Command::Open(id) => {
                if self.store().select_conversation(&id).await {
                    self.print_history().await;
                }
            }
            Command::Delete(id) => {
                self.store().delete_conversation(&id).await;
            }
            Command::History => self.print_history().await,
            Command::Profile => {
                if let Some(draft) = self.run_wizard().await {
                    eprintln!("⏳ Submitting profile...");
                    self.controller.submit_profile(&draft).await;
                }
            }
            Command::Help => eprintln!("{HELP}"),
            Command::Chat(text) => {
                self.store().set_input(text).await;
                self.controller.submit_input().await;
            }
            Command::Invalid(reason) => eprintln!("{reason}"),
            Command::Quit => {}
        }
    }

    async fn print_conversations(&self) {
        let state = self.store().snapshot().await;
        if state.conversations.is_empty() {
            println!("No conversations yet. Use /new to start one.");
            return;
        }
        for conversation in &state.conversations {
            let marker = if state.active_conversation_id.as_deref() == Some(conversation.id.as_str()) {
                "*"
            } else {
                " "
            };
            println!(
                "{marker} {}  {}",
                conversation.id,
                conversation.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    async fn print_history(&self) {
        let state = self.store().snapshot().await;
        if state.active_conversation_id.is_none() {
            println!("No conversation selected.");
            return;
        }
        for message in state.visible_messages() {
            let who = match message.role {
                Role::User => "you",
                _ => "assistant",
            };
            println!("[{who}] {}\n", message.display_text());
        }
    }

    async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Error reading input: {}", e);
                None
            }
        }
    }

    async fn ask(&mut self, label: &str) -> Answer {
        eprint!("  {label}: ");
        match self.next_line().await {
            None => Answer::Cancel,
            Some(line) => match line.trim() {
                ":back" => Answer::Back,
                ":cancel" => Answer::Cancel,
                value => Answer::Value(value.to_string()),
            },
        }
    }

    /// Walk the profile stages. Returns the finished draft, or `None` if the
    /// user cancelled.
    async fn run_wizard(&mut self) -> Option<ProfileDraft> {
        let mut wizard = ProfileFormAggregator::new();
        eprintln!("Type :back to return to the previous section, :cancel to stop.");

        loop {
            let stage = wizard.stage();
            let number = WizardStage::ALL.iter().position(|s| *s == stage).unwrap_or(0) + 1;
            eprintln!("\n{number}/{}. {}", WizardStage::ALL.len(), stage.title());

            let mut fields: Vec<(String, String)> = Vec::new();
            let mut back = false;

            if let Some(group) = stage.repeatable_group() {
                loop {
                    let recorded = wizard.allocated_entries(group);
                    let prompt = if recorded == 0 { "Add an entry? (y/n)" } else { "Add another entry? (y/n)" };
                    match self.ask(prompt).await {
                        Answer::Cancel => return None,
                        Answer::Back => {
                            back = true;
                            break;
                        }
                        Answer::Value(v) if v.eq_ignore_ascii_case("y") => {
                            let index = wizard.allocate_entry(group);
                            for field in group.fields() {
                                match self.ask(&field.replace('_', " ")).await {
                                    Answer::Value(value) => fields.push((group.key(field, index), value)),
                                    Answer::Back => break,
                                    Answer::Cancel => return None,
                                }
                            }
                        }
                        Answer::Value(_) => break,
                    }
                }
            } else {
                for field in stage.fields() {
                    match self.ask(&field.replace('_', " ")).await {
                        Answer::Value(value) => fields.push((field.to_string(), value)),
                        Answer::Back => {
                            back = true;
                            break;
                        }
                        Answer::Cancel => return None,
                    }
                }
            }

            if back {
                wizard.record_stage(fields);
                wizard.go_back();
                continue;
            }

            if !stage.is_last() {
                wizard.advance(fields);
                continue;
            }

            let draft = wizard.finalize(fields);
            eprintln!("\n{}\n", ProfileRecord::from_draft(&draft).to_summary());
            match self.ask("Submit this profile? (y/n, :back to edit)").await {
                // Cursor is still on the last section; ask it again.
                Answer::Back => continue,
                Answer::Value(v) if !v.eq_ignore_ascii_case("n") => return Some(draft),
                _ => return None,
            }
        }
    }
}
