//! Agent Run Watcher
//!
//! Follows an agent run's progress stream and prints each update until the
//! run completes or fails.
//!
//! ```text
//! agent-watch [--config agentboard.json] <run-id>
//! ```

use std::path::PathBuf;

use agentboard_core::client::AgentProgress;
use agentboard_core::{AppConfig, HttpClient};
use anyhow::bail;
use clap::Parser;
use futures::{pin_mut, StreamExt};

#[derive(Debug, Parser)]
#[command(name = "agent-watch")]
#[command(about = "Follow an agent run until it completes or fails")]
struct Args {
    /// Config file layered under `AGENTBOARD_*` variables
    #[arg(short, long, env = "AGENTBOARD_CONFIG")]
    config: Option<PathBuf>,
    /// Agent run to follow
    run_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_watch=info,agentboard_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let Args { config, run_id } = Args::parse();

    let config = AppConfig::load(config.as_deref())?;
    let client = HttpClient::new(config.client)?;

    let stream = client.agent_progress_stream(&run_id).await?;
    pin_mut!(stream);

    while let Some(progress) = stream.next().await {
        let progress = progress?;
        match &progress {
            AgentProgress::Started { agent_id, .. } => {
                println!("started (agent {})", agent_id.as_deref().unwrap_or("unknown"))
            }
            AgentProgress::Step {
                message, progress, ..
            } => match progress {
                Some(fraction) => println!("[{:>3.0}%] {}", fraction * 100.0, message),
                None => println!("[ .. ] {}", message),
            },
            AgentProgress::Output { content, .. } => println!("{}", content),
            AgentProgress::Completed { summary, .. } => {
                println!("completed: {}", summary.as_deref().unwrap_or("no summary"))
            }
            AgentProgress::Failed { error, .. } => eprintln!("failed: {}", error),
        }
        if progress.is_terminal() {
            if let AgentProgress::Failed { error, .. } = progress {
                bail!("Agent run {} failed: {}", run_id, error);
            }
            return Ok(());
        }
    }

    tracing::warn!("Progress stream for run {} ended before the run finished", run_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use clap::Parser;

    use super::Args;

    #[test]
    fn test_args_take_run_id() {
        let args = Args::try_parse_from(["agent-watch", "--config", "a.json", "run-7"]).unwrap();
        assert_eq!(args.run_id, "run-7");
        assert_eq!(args.config.as_deref(), Some(std::path::Path::new("a.json")));
    }

    #[test]
    fn test_args_reject_extra_positionals() {
        let err = match Args::try_parse_from(["agent-watch", "run-7", "run-8"]) {
            Ok(_) => panic!("expected unexpected argument error"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
