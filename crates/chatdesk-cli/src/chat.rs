use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chatdesk_core::services::speech::{ScriptedRecognizer, SpeechRecognizer, UnavailableRecognizer};
use chatdesk_core::services::transcribe_utterance;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::app::{App, print_message};

const HELP: &str = "\
Commands:
  /new                 start a new conversation
  /list                list conversations
  /switch <id>         switch to a conversation
  /rename <title>      rename the current conversation
  /delete [id]         delete a conversation (default: current)
  /attach <path>       attach a file to the next message
  /detach <n>          remove attachment number n
  /voice <words>       add a spoken phrase to the draft
  /key <KEY>           store the API key of the active provider
  /help                show this help
  /quit                leave
Anything else is sent as a message.";

enum Flow {
    Continue,
    Quit,
}

pub async fn run(app: &mut App) -> Result<()> {
    println!(
        "chatdesk ({}). Type /help for commands.",
        app.settings.provider.display_name()
    );
    if !app.credentials.has_credential() {
        app.notifications.info(
            "API key required",
            format!(
                "Set your {} API key with `chatdesk set-key <KEY>` or /key <KEY>",
                app.settings.provider.display_name()
            ),
        );
    }
    show_current(app);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        app.print_notifications();
        prompt(app)?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let flow = match line.strip_prefix('/') {
            Some(command) => handle_command(app, command).await?,
            None => {
                app.composer.append_text(line);
                send(app).await;
                Flow::Continue
            }
        };
        if let Flow::Quit = flow {
            break;
        }
    }

    app.previews.release_all();
    Ok(())
}

fn prompt(app: &App) -> Result<()> {
    let pending = app.composer.pending().len();
    if pending > 0 {
        print!("[{} attached] ", pending);
    }
    print!("> ");
    std::io::stdout().flush().context("Failed to flush stdout")
}

async fn send(app: &mut App) {
    match app.send().await {
        Ok(reply) => print_message(chatdesk_core::Role::Assistant, &reply),
        // Already reported through notifications
        Err(e) => tracing::debug!(error = %e, "Send failed"),
    }
}

fn show_current(app: &App) {
    let store = app.store.lock();
    if let Some(conversation) = store.current() {
        println!("# {}", conversation.title());
        for message in conversation.messages() {
            print_message(message.role, &message.content);
        }
    }
}

async fn handle_command(app: &mut App, command: &str) -> Result<Flow> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "quit" | "exit" => return Ok(Flow::Quit),
        "help" => println!("{}", HELP),
        "new" => {
            app.store.lock().create_conversation();
            app.previews.release_all();
            show_current(app);
        }
        "list" => app.print_list(),
        "switch" => {
            let switched = app.store.lock().select_conversation(arg);
            match switched {
                Ok(()) => {
                    app.previews.release_all();
                    show_current(app);
                }
                Err(e) => app.notifications.error("Cannot switch", e.to_string()),
            }
        }
        "rename" => {
            let mut store = app.store.lock();
            match store.active_id().map(str::to_string) {
                Some(id) if !arg.is_empty() => {
                    store.update_title(&id, arg);
                }
                Some(_) => app.notifications.error("Cannot rename", "A title is required"),
                None => app.notifications.error("Cannot rename", "No conversation is open"),
            }
        }
        "delete" => {
            let mut store = app.store.lock();
            let id = if arg.is_empty() {
                store.active_id().map(str::to_string)
            } else {
                Some(arg.to_string())
            };
            let deleted = id.map(|id| store.delete_conversation(&id)).unwrap_or(false);
            if !deleted {
                app.notifications.error("Cannot delete", "Conversation not found");
            }
        }
        "attach" => {
            if let Err(e) = app.attach_file(Path::new(arg)) {
                app.notifications.error("Cannot attach", format!("{:#}", e));
            }
            if let Some(attachment) = app.composer.pending().last().cloned() {
                if let Some(preview) = app.previews.preview(&attachment) {
                    println!("preview ready for {} ({} bytes)", attachment.name(), preview.len());
                }
            }
        }
        "detach" => match arg.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
            Some(index) => match app.composer.remove_attachment(index) {
                Some(removed) => {
                    app.previews.release(removed.id());
                    println!("removed {}", removed.name());
                }
                None => app.notifications.error("Cannot detach", "No such attachment"),
            },
            None => app.notifications.error("Cannot detach", "Usage: /detach <n>"),
        },
        "key" => {
            if app.credentials.set_credential(arg).is_err() {
                app.notifications.error("Cannot save key", "The API key must not be empty");
            } else {
                app.notifications.info("API key saved", app.settings.provider.display_name());
            }
        }
        "voice" => voice(app, arg).await,
        other => app
            .notifications
            .error("Unknown command", format!("/{} (try /help)", other)),
    }

    Ok(Flow::Continue)
}

/// Terminals have no microphone; the words after /voice stand in for one utterance
async fn voice(app: &mut App, words: &str) {
    let scripted;
    let recognizer: &dyn SpeechRecognizer = if words.is_empty() {
        &UnavailableRecognizer
    } else {
        scripted = ScriptedRecognizer::new();
        scripted.push_utterance(words.split_whitespace());
        &scripted
    };

    match transcribe_utterance(recognizer).await {
        Ok(Some(transcript)) => {
            app.composer.append_transcript(&transcript);
            println!("draft: {}", app.composer.draft());
        }
        Ok(None) => {}
        Err(e) => app.notifications.error("Voice input unavailable", e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_command() {
        for command in [
            "/new", "/list", "/switch", "/rename", "/delete", "/attach", "/detach", "/voice",
            "/key", "/help", "/quit",
        ] {
            assert!(HELP.contains(command), "help is missing {}", command);
        }
    }
}
