//! Edit Script Replay
//!
//! Opens a document against a running Agentboard API, replays a JSON-lines
//! edit script through `EditorSession`, waits for every write to land and
//! prints the resulting document as markdown.
//!
//! ```text
//! doc-session [--config agentboard.json] <document-id> [script.jsonl]
//! ```
//!
//! Each script line is one step, e.g.
//!
//! ```text
//! {"op": "title", "title": "Launch plan"}
//! {"op": "append", "block_type": "todo", "content": "Write notes", "label": "notes"}
//! {"op": "update", "block": "notes", "content": "Write release notes"}
//! {"op": "toggle_todo", "block": "notes"}
//! ```
//!
//! Blocks created by the script can be referred to by `label`; labels keep
//! pointing at the block after the server confirms it.
//!
//! Settings come from the optional config file and `AGENTBOARD_*` variables.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use agentboard_core::editor::{EditorEvent, EditorSession};
use agentboard_core::models::{BlockId, BlockType};
use agentboard_core::{AppConfig, HttpClient};
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::TryRecvError};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Title {
        title: String,
    },
    Update {
        block: String,
        content: String,
    },
    Insert {
        after: Option<String>,
        block_type: BlockType,
        #[serde(default)]
        content: String,
        label: Option<String>,
    },
    Append {
        block_type: BlockType,
        #[serde(default)]
        content: String,
        label: Option<String>,
    },
    Split {
        block: String,
        offset: usize,
        label: Option<String>,
    },
    Remove {
        block: String,
    },
    Move {
        block: String,
        to: usize,
    },
    ToggleTodo {
        block: String,
    },
    ChangeType {
        block: String,
        block_type: BlockType,
    },
    Paste {
        after: Option<String>,
        markdown: String,
    },
    /// Let debounce timers run
    Wait {
        ms: u64,
    },
    Flush,
}

#[derive(Debug, Parser)]
#[command(name = "doc-session")]
#[command(about = "Replay a JSON-lines edit script against a document")]
struct Args {
    /// Config file layered under `AGENTBOARD_*` variables
    #[arg(short, long, env = "AGENTBOARD_CONFIG")]
    config: Option<PathBuf>,
    /// Document to open
    document_id: String,
    /// Script to replay; read from stdin when omitted
    script: Option<PathBuf>,
}

/// Script labels and the block ids they point at
#[derive(Default)]
struct Labels {
    ids: HashMap<String, BlockId>,
}

impl Labels {
    fn remember(&mut self, label: Option<String>, id: BlockId) {
        if let Some(label) = label {
            self.ids.insert(label, id);
        }
    }

    fn resolve(&self, reference: &str) -> BlockId {
        self.ids
            .get(reference)
            .cloned()
            .unwrap_or_else(|| BlockId::new(reference))
    }

    /// Follow placeholder confirmations reported since the last step
    fn follow(&mut self, events: &mut broadcast::Receiver<EditorEvent>) {
        loop {
            match events.try_recv() {
                Ok(EditorEvent::BlockConfirmed { placeholder, id }) => {
                    for target in self.ids.values_mut() {
                        if *target == placeholder {
                            *target = id.clone();
                        }
                    }
                }
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Missed {} editor events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }
}

async fn run_step(
    session: &EditorSession<HttpClient>,
    labels: &mut Labels,
    step: Step,
) -> anyhow::Result<()> {
    match step {
        Step::Title { title } => session.set_title(title).await?,
        Step::Update { block, content } => {
            session.update_content(&labels.resolve(&block), content).await?
        }
        Step::Insert {
            after,
            block_type,
            content,
            label,
        } => {
            let after = after.map(|reference| labels.resolve(&reference));
            let id = session.insert_after(after.as_ref(), block_type, content).await?;
            labels.remember(label, id);
        }
        Step::Append {
            block_type,
            content,
            label,
        } => {
            let id = session.append(block_type, content).await?;
            labels.remember(label, id);
        }
        Step::Split {
            block,
            offset,
            label,
        } => {
            let id = session.split_at(&labels.resolve(&block), offset).await?;
            labels.remember(label, id);
        }
        Step::Remove { block } => session.remove(&labels.resolve(&block)).await?,
        Step::Move { block, to } => session.move_block_to(&labels.resolve(&block), to).await?,
        Step::ToggleTodo { block } => session.toggle_todo(&labels.resolve(&block)).await?,
        Step::ChangeType { block, block_type } => {
            session.change_type(&labels.resolve(&block), block_type).await?
        }
        Step::Paste { after, markdown } => {
            let after = after.map(|reference| labels.resolve(&reference));
            let ids = session.paste_markdown(after.as_ref(), &markdown).await?;
            tracing::info!("Pasted {} block(s)", ids.len());
        }
        Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        Step::Flush => session.flush_now().await?,
    }
    Ok(())
}

fn read_script(path: Option<&PathBuf>) -> anyhow::Result<Vec<Step>> {
    let reader: Box<dyn BufRead> = match path {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut steps = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = serde_json::from_str(line)
            .with_context(|| format!("Invalid step on line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_session=info,agentboard_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    let steps = read_script(args.script.as_ref())?;

    let client = HttpClient::new(config.client.clone())?;
    let session = EditorSession::open(client, &args.document_id, config.editor.clone()).await?;
    let mut events = session.subscribe_to_events();
    let mut labels = Labels::default();

    tracing::info!(
        "Replaying {} step(s) against document {}",
        steps.len(),
        args.document_id
    );
    for (index, step) in steps.into_iter().enumerate() {
        labels.follow(&mut events);
        run_step(&session, &mut labels, step)
            .await
            .with_context(|| format!("Step {} failed", index + 1))?;
    }

    if let Err(e) = session.settle().await {
        tracing::error!("Some changes were not saved: {}", e);
        println!("{}", session.to_markdown().await);
        return Err(e.into());
    }
    session.close();

    println!("{}", session.to_markdown().await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::Parser;

    use super::{Args, Step};

    #[test]
    fn test_args_take_document_and_optional_script() {
        let args = Args::try_parse_from(["doc-session", "-c", "local.json", "doc-1"]).unwrap();
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("local.json")));
        assert_eq!(args.document_id, "doc-1");
        assert!(args.script.is_none());

        let args = Args::try_parse_from(["doc-session", "doc-1", "edits.jsonl"]).unwrap();
        assert_eq!(args.script.as_deref(), Some(std::path::Path::new("edits.jsonl")));
    }

    #[test]
    fn test_args_require_document_id() {
        let err = match Args::try_parse_from(["doc-session"]) {
            Ok(_) => panic!("expected missing document id"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_step_lines_parse() {
        let step: Step =
            serde_json::from_str(r#"{"op": "split", "block": "notes", "offset": 3}"#).unwrap();
        assert!(matches!(step, Step::Split { offset: 3, label: None, .. }));
        let step: Step = serde_json::from_str(r#"{"op": "flush"}"#).unwrap();
        assert!(matches!(step, Step::Flush));
    }
}
