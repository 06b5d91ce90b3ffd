//! Command-line surface: a headless stand-in for the user panel that
//! drives the same store and applier operations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pagehush_annotation_store::{AnnotationStore, MemoryAnnotationStore};
use pagehush_core_types::PageUrl;
use visibility_applier::RetryOutcome;

use crate::config::AppCfg;
use crate::runtime::AppRuntime;

#[derive(Parser)]
#[command(
    name = "pagehush",
    version,
    about = "Pick page elements and keep them hidden across reloads"
)]
pub struct Cli {
    /// Annotation store file
    #[arg(long, global = true, default_value = "pagehush.json")]
    pub store: PathBuf,

    /// Optional JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture the first element matching a selector and hide it
    Pick {
        /// HTML file standing in for the loaded page
        #[arg(long)]
        page: PathBuf,
        /// Exact page URL the annotation is bound to
        #[arg(long)]
        url: String,
        /// CSS selector of the element to pick
        #[arg(long)]
        target: String,
    },
    /// List stored annotations for a page, newest first
    List {
        #[arg(long)]
        url: String,
        /// Emit raw JSON records
        #[arg(long)]
        json: bool,
    },
    /// Toggle a stored annotation on the live page and in the store
    Toggle {
        #[arg(long)]
        page: PathBuf,
        #[arg(long)]
        url: String,
        /// CSS locator of the stored annotation
        #[arg(long)]
        locator: String,
        /// Restore visibility instead of hiding
        #[arg(long)]
        show: bool,
    },
    /// Restore the element's visibility, then delete the annotation
    Remove {
        #[arg(long)]
        page: PathBuf,
        #[arg(long)]
        url: String,
        #[arg(long)]
        locator: String,
    },
    /// Re-apply stored hides to a freshly loaded page
    Restore {
        #[arg(long)]
        page: PathBuf,
        #[arg(long)]
        url: String,
    },
    /// Print every locator encoding for an element, without persisting
    Inspect {
        #[arg(long)]
        page: PathBuf,
        /// CSS selector of the element to inspect
        #[arg(long)]
        target: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = match &cli.config {
        Some(path) => AppCfg::load(path)?,
        None => AppCfg::default(),
    };
    let store = MemoryAnnotationStore::with_persistence(&cli.store)
        .with_context(|| format!("failed to open store {}", cli.store.display()))?;

    match cli.command {
        Command::Pick { page, url, target } => {
            let runtime = launch(&page, &url, store, &cfg).await?;
            let record = runtime.simulate_pick(&target).await?;
            println!(
                "picked <{}> as {} (record {})",
                record.element.tag_name, record.element.selectors.css, record.record_id
            );
            println!("{}", serde_json::to_string_pretty(&record)?);
            runtime.shutdown();
        }
        Command::List { url, json } => {
            let page_url = PageUrl::parse(url)?;
            let records = store.list_by_page(&page_url).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("no annotations for {page_url}");
            } else {
                for record in records {
                    println!(
                        "{}  {}  hidden={}  <{}>",
                        record.record_id,
                        record.element.selectors.css,
                        record.element.is_hidden,
                        record.element.tag_name
                    );
                }
            }
        }
        Command::Toggle {
            page,
            url,
            locator,
            show,
        } => {
            let runtime = launch(&page, &url, store, &cfg).await?;
            let panel = runtime.open_panel().await?;
            let found = panel.set_record_hidden(&locator, !show).await?;
            if found {
                println!(
                    "{} {}",
                    if show { "restored" } else { "hidden" },
                    locator
                );
            } else {
                println!("no stored annotation matches {locator}");
            }
            panel.close();
            runtime.shutdown();
        }
        Command::Remove { page, url, locator } => {
            let runtime = launch(&page, &url, store, &cfg).await?;
            let panel = runtime.open_panel().await?;
            let removed = panel.delete_record(&locator).await?;
            if removed {
                println!("removed {locator}");
            } else {
                println!("no stored annotation matches {locator}");
            }
            panel.close();
            runtime.shutdown();
        }
        Command::Restore { page, url } => {
            let runtime = launch(&page, &url, store, &cfg).await?;
            let outcomes = runtime.injected.await_restore().await;
            if outcomes.is_empty() {
                println!("nothing to re-hide for {}", runtime.page_url);
            }
            for (locator, outcome) in outcomes {
                match outcome {
                    Some(RetryOutcome::Applied { matched }) => {
                        println!("re-hid {locator} ({matched} matched)");
                    }
                    Some(RetryOutcome::Exhausted) => {
                        println!("gave up on {locator}: element never appeared");
                    }
                    None => println!("re-hide of {locator} was cancelled"),
                }
            }
            runtime.shutdown();
        }
        Command::Inspect { page, target } => {
            inspect(&page, &target)?;
        }
    }
    Ok(())
}

fn inspect(page: &std::path::Path, target: &str) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(page)
        .with_context(|| format!("failed to read page {}", page.display()))?;
    let dom = dom_adapter::PageDom::parse_document(&html);
    let node = dom
        .first_match(target)
        .with_context(|| format!("no element matches {target}"))?;
    let set = locator_synth::synthesize(&dom, node);
    println!("{}", serde_json::to_string_pretty(&set)?);
    Ok(())
}

async fn launch(
    page: &std::path::Path,
    url: &str,
    store: Arc<MemoryAnnotationStore>,
    cfg: &AppCfg,
) -> anyhow::Result<AppRuntime> {
    let html = std::fs::read_to_string(page)
        .with_context(|| format!("failed to read page {}", page.display()))?;
    let page_url = PageUrl::parse(url)?;
    AppRuntime::launch(&html, page_url, store, cfg).await
}
