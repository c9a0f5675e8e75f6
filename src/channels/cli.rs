//! CLI transport: stdin/stdout REPL for local testing.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::activity::{Activity, Address, ChannelAccount, Content};
use crate::channels::{ActivityStream, Transport};
use crate::error::ChannelError;

/// Conversation id used for every CLI activity.
pub const CLI_CONVERSATION_ID: &str = "cli";

/// A simple CLI transport that reads lines from stdin and writes to stdout.
pub struct CliTransport {
    user: ChannelAccount,
    started: AtomicBool,
}

impl CliTransport {
    pub fn new() -> Self {
        Self {
            user: ChannelAccount::new("local-user"),
            started: AtomicBool::new(false),
        }
    }
}

impl Default for CliTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Render outbound content for a terminal, suggested actions as `[choice]`.
fn render(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::Activity(activity) => render_activity(activity),
    }
}

fn render_activity(activity: &Activity) -> String {
    match activity {
        Activity::Message(m) => match &m.suggested_actions {
            Some(suggested) if !suggested.actions.is_empty() => {
                let choices: Vec<String> = suggested
                    .actions
                    .iter()
                    .map(|a| format!("[{}]", a.title))
                    .collect();
                format!("{}\n{}", m.text, choices.join(" "))
            }
            _ => m.text.clone(),
        },
        other => format!("({})", other.kind()),
    }
}

#[async_trait]
impl Transport for CliTransport {
    fn name(&self) -> &str {
        "cli"
    }

    async fn activities(&self) -> Result<ActivityStream, ChannelError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ChannelError::StreamConsumed {
                name: "cli".to_string(),
            });
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user = self.user.clone();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let activity =
                            Activity::message(user.clone(), CLI_CONVERSATION_ID, &line);
                        if tx.send(activity).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn send(&self, _address: &Address, content: Content) {
        println!("\n{}\n", render(&content));
        eprint!("> ");
    }

    async fn send_async(&self, _address: &Address, content: Content) -> Result<(), ChannelError> {
        let mut stdout = tokio::io::stdout();
        let rendered = format!("\n{}\n\n", render(&content));
        stdout
            .write_all(rendered.as_bytes())
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "cli".into(),
                reason: e.to_string(),
            })?;
        stdout.flush().await.map_err(|e| ChannelError::SendFailed {
            name: "cli".into(),
            reason: e.to_string(),
        })?;
        eprint!("> ");
        Ok(())
    }

    async fn post_activity(&self, activity: Activity) -> Result<(), ChannelError> {
        let address = activity.address();
        self.send_async(&address, Content::from(activity)).await
    }
}
