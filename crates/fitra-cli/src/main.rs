use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fitra_core::{DraftKey, Selection, TRAINING_NAMESPACE, parse_field, parse_field_value};
use fitra_store::{DraftStore, FileStore};
use fitra_sync::{DraftController, HistoryFetcher, LatestClient, LatestFetcher, NoRemote};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitra", version, about = "Per-day training drafts with latest-value prefill")]
struct Cli {
    /// JSON file holding stored drafts.
    #[arg(long, global = true, env = "FITRA_STORE", default_value = "fitra-drafts.json")]
    store: PathBuf,

    /// Subject the draft belongs to.
    #[arg(long, global = true, env = "FITRA_USER", default_value = "demo")]
    user: String,

    /// Calendar day (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    day: Option<NaiveDate>,

    #[arg(long, global = true, default_value = TRAINING_NAMESPACE)]
    namespace: String,

    /// Selected exercises, comma separated.
    #[arg(long, global = true, value_delimiter = ',')]
    items: Vec<String>,

    /// Base URL of the latest-values endpoint.
    #[arg(long, global = true, env = "FITRA_REMOTE")]
    remote: Option<String>,

    /// JSON file of recorded rows to prefill from instead of a remote.
    #[arg(long, global = true, conflicts_with = "remote")]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the draft.
    Show,
    /// Set one field of one exercise. An empty value clears it.
    Set {
        item: String,
        field: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
    /// Clear every field.
    Reset,
    /// Delete the stored draft.
    Remove,
    /// Print volume and totals for the draft.
    Summary,
}

fn build_fetcher(cli: &Cli) -> anyhow::Result<Arc<dyn LatestFetcher>> {
    if let Some(url) = &cli.remote {
        return Ok(Arc::new(LatestClient::new(url.clone())));
    }
    if let Some(path) = &cli.history {
        let history = HistoryFetcher::from_path(path)
            .with_context(|| format!("reading history from {}", path.display()))?;
        return Ok(Arc::new(history));
    }
    Ok(Arc::new(NoRemote))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let day = cli.day.unwrap_or_else(|| chrono::Local::now().date_naive());
    let key = DraftKey::new(cli.user.clone(), day, cli.namespace.clone());
    let selection = Selection::new(cli.items.iter().map(|s| s.trim().to_string()));
    let fetcher = build_fetcher(&cli)?;

    let store = DraftStore::new(Arc::new(FileStore::open(&cli.store)));
    let mut controller = DraftController::new(store, fetcher);
    controller.activate(key.clone(), selection);
    let phase = controller
        .settled()
        .await
        .context("draft activation ended before settling")?;
    info!(key = %key, phase = phase.as_str(), "draft ready");

    let output = match &cli.command {
        Command::Show => serde_json::to_string_pretty(&controller.draft())?,
        Command::Set { item, field, value } => {
            let field = parse_field(field)?;
            if !controller.update_field(item, field, parse_field_value(value)) {
                anyhow::bail!("{item:?} is not one of the selected --items");
            }
            serde_json::to_string_pretty(&controller.draft())?
        }
        Command::Reset => {
            controller.reset();
            serde_json::to_string_pretty(&controller.draft())?
        }
        Command::Remove => {
            controller.remove();
            serde_json::to_string_pretty(&controller.draft())?
        }
        Command::Summary => serde_json::to_string_pretty(&controller.summary())?,
    };
    println!("{output}");

    controller.deactivate();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_options_accepted_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fitra", "show", "--store", "d.json", "--user", "ana", "--day", "2026-01-02",
            "--namespace", "gym", "--items", "squat,bench", "--history", "h.json",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Show));
        assert_eq!(cli.store, PathBuf::from("d.json"));
        assert_eq!(cli.user, "ana");
        assert_eq!(cli.day, NaiveDate::from_ymd_opt(2026, 1, 2));
        assert_eq!(cli.namespace, "gym");
        assert_eq!(cli.items, ["squat", "bench"]);
        assert_eq!(cli.history, Some(PathBuf::from("h.json")));
    }

    #[test]
    fn remote_after_subcommand_conflicts_with_history() {
        let parsed = Cli::try_parse_from([
            "fitra", "--history", "h.json", "summary", "--remote", "http://localhost:8080",
        ]);
        assert!(parsed.is_err());
    }
}
