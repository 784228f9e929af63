// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use agent_fetch::{
    config::{keys, ConfigStore},
    fetch::{FetchReport, Fetcher, FileWriter, HttpClient},
    github::{parse_repository_url, RepositoryRef},
    index::IndexDocument,
    path::{default_config_dir, expand_path},
    select::{NameSelector, PromptSelector, SelectAll, Selector},
};

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{error::Error, path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_INDEX: &str = "agents.yaml";

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "agent-fetch [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Directory holding configuration instead of the default one.
    #[arg(long, global = true, value_name = "path")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let config_dir = match self.config_dir {
            Some(path) => path,
            None => default_config_dir()?,
        };
        let store = ConfigStore::open(config_dir)?;

        match self.command {
            Command::List(opts) => run_list(opts, &store).await,
            Command::Fetch(opts) => run_fetch(opts, &store).await,
            Command::Config(command) => run_config(command, store),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List entries of index document.
    #[command(override_usage = "agent-fetch list [options]")]
    List(ListOptions),

    /// Fetch selected entries of index document.
    #[command(override_usage = "agent-fetch fetch [options] [--all | --name <name>...]")]
    Fetch(FetchOptions),

    /// Manage configuration settings.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Clone, Debug)]
struct IndexOptions {
    /// Path to local index document.
    #[arg(short, long, value_name = "path", conflicts_with = "remote_index")]
    pub index: Option<String>,

    /// Path to index document inside the repository.
    #[arg(short = 'R', long, value_name = "path")]
    pub remote_index: Option<String>,

    /// URL of GitHub repository to fetch from.
    #[arg(short, long, value_name = "url")]
    pub repo: Option<String>,

    /// Branch to fetch from instead of the default branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    #[command(flatten)]
    pub index: IndexOptions,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct FetchOptions {
    #[command(flatten)]
    pub index: IndexOptions,

    /// Directory to resolve relative targets against.
    #[arg(short, long, value_name = "path")]
    pub output: Option<String>,

    /// Fetch every entry without prompting.
    #[arg(short, long, group = "selection")]
    pub all: bool,

    /// Fetch entries with given name without prompting.
    #[arg(short, long = "name", group = "selection", value_name = "name")]
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Show value of setting.
    #[command(override_usage = "agent-fetch config get <key>")]
    Get {
        #[arg(value_name = "key")]
        key: String,
    },

    /// Change value of setting.
    #[command(override_usage = "agent-fetch config set <key> <value>")]
    Set {
        #[arg(value_name = "key")]
        key: String,

        #[arg(value_name = "value")]
        value: String,
    },

    /// Remove setting.
    #[command(override_usage = "agent-fetch config unset <key>")]
    Unset {
        #[arg(value_name = "key")]
        key: String,
    },

    /// Show all settings.
    #[command(override_usage = "agent-fetch config list")]
    List,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

async fn run_list(opts: ListOptions, store: &ConfigStore) -> Result<()> {
    let repository = resolve_repository(&opts.index, store)?;
    let fetcher = Fetcher::new(HttpClient::new()?, FileWriter::default());
    let document = load_index(&opts.index, store, repository.as_ref(), &fetcher).await?;

    if document.is_empty() {
        warn!("index lists no entries");
        return Ok(());
    }

    for entry in &document {
        println!("{entry}");
        if let Some(repository) = &repository {
            println!("    {}", repository.raw_content_url(entry.source()));
        }
    }

    Ok(())
}

async fn run_fetch(opts: FetchOptions, store: &ConfigStore) -> Result<()> {
    let repository = resolve_repository(&opts.index, store)?.ok_or_else(|| {
        anyhow!(
            "no repository to fetch from, pass --repo or run `agent-fetch config set {} <url>`",
            keys::REPO_URL
        )
    })?;

    let output = match opts.output.as_deref().or(store.get(keys::OUTPUT_DIR)) {
        Some(path) => expand_path(path)?,
        None => PathBuf::new(),
    };

    let client = HttpClient::new()?;
    let fetcher = Fetcher::new(client, FileWriter::new(output));
    let document = load_index(&opts.index, store, Some(&repository), &fetcher).await?;

    let selected = if opts.all {
        SelectAll.select(&document)?
    } else if !opts.names.is_empty() {
        NameSelector::new(opts.names).select(&document)?
    } else {
        PromptSelector::default().select(&document)?
    };

    if selected.is_empty() {
        warn!("nothing selected to fetch");
        return Ok(());
    }

    info!("fetch {} entries from {repository}", selected.len());
    let bar = ProgressBar::new(selected.len() as u64);
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<40}  [{wide_bar:.yellow/blue}] {pos}/{len}",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);

    let report = fetcher
        .with_progress(bar)
        .fetch_entries(&repository, &selected)
        .await;
    summarize(&report)
}

fn run_config(command: ConfigCommand, mut store: ConfigStore) -> Result<()> {
    match command {
        ConfigCommand::Get { key } => match store.get(&key) {
            Some(value) => println!("{value}"),
            None => bail!("{key:?} is not set"),
        },
        ConfigCommand::Set { key, value } => {
            if !keys::ALL.contains(&key.as_str()) {
                warn!("{key:?} is not a known setting, storing it anyway");
            }

            // INVARIANT: Reject repository URLs that could never be fetched from.
            if key == keys::REPO_URL {
                RepositoryRef::parse(&value)?;
            }

            store.set(key, value)?;
            info!("configuration saved to {:?}", store.path().display());
        }
        ConfigCommand::Unset { key } => store.delete(key)?,
        ConfigCommand::List => {
            for (key, value) in store.all() {
                println!("{key} = {value}");
            }
        }
    }

    Ok(())
}

fn resolve_repository(opts: &IndexOptions, store: &ConfigStore) -> Result<Option<RepositoryRef>> {
    let Some(url) = opts.repo.as_deref().or(store.get(keys::REPO_URL)) else {
        return Ok(None);
    };

    let repository = parse_repository_url(url, opts.branch.as_deref())?;
    Ok(Some(match store.get(keys::BRANCH) {
        Some(branch) => repository.with_fallback_branch(branch),
        None => repository,
    }))
}

async fn load_index(
    opts: &IndexOptions,
    store: &ConfigStore,
    repository: Option<&RepositoryRef>,
    fetcher: &Fetcher,
) -> Result<IndexDocument> {
    if let Some(remote) = &opts.remote_index {
        let repository = repository
            .ok_or_else(|| anyhow!("remote index {remote:?} needs a repository, pass --repo"))?;
        return Ok(fetcher.fetch_index(repository, remote).await?);
    }

    let path = opts
        .index
        .as_deref()
        .or(store.get(keys::INDEX))
        .unwrap_or(DEFAULT_INDEX);
    Ok(IndexDocument::from_path(expand_path(path)?)?)
}

fn summarize(report: &FetchReport) -> Result<()> {
    for outcome in report.failures() {
        if let Err(err) = &outcome.result {
            error!("{}: {}", outcome.entry.name(), error_chain(err));
        }
    }

    info!("{} succeeded, {} failed", report.succeeded(), report.failed());
    if !report.is_success() {
        bail!(
            "{} of {} entries failed to fetch",
            report.failed(),
            report.outcomes().len()
        );
    }

    Ok(())
}

fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(cause.to_string().as_str());
        source = cause.source();
    }

    message
}
