// src/main.rs

//! flatwatch: rental-flat listing watcher CLI
//!
//! Scrapes a classifieds search target, deduplicates listings against
//! the store and announces new ones on the notification channel.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::MissedTickBehavior;

use flatwatch::error::Result;
use flatwatch::models::Config;
use flatwatch::normalize::Normalizer;
use flatwatch::pipeline::{Pipeline, run_cycle};
use flatwatch::publish::{BotApiChannel, Publisher};
use flatwatch::source::HtmlSource;
use flatwatch::storage::SqlListingStore;
use flatwatch::utils::log;

#[derive(Parser, Debug)]
#[command(
    name = "flatwatch",
    version,
    about = "Watches a classifieds site for new rental-flat listings"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scrape cycle and exit
    Scrape,
    /// Run scrape cycles on the configured interval
    Watch,
    /// Validate the configuration
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();
    if cli.quiet {
        config.logging.level = "warn".into();
    }

    // Initialize console logging
    log::init(&config.logging.level);

    match cli.command {
        Command::Validate => {
            config.validate()?;
            log::success("Configuration OK");
        }
        Command::Scrape => {
            config.validate()?;
            let app = App::build(&config).await?;
            app.run_once().await?;
        }
        Command::Watch => {
            config.validate()?;
            let app = App::build(&config).await?;
            app.watch().await;
        }
    }

    Ok(())
}

/// Wired application: every collaborator constructed once and injected.
struct App {
    config: Config,
    source: HtmlSource,
    pipeline: Pipeline,
    publisher: Publisher,
}

impl App {
    async fn build(config: &Config) -> Result<Self> {
        let store = SqlListingStore::connect(&config.storage.database_url).await?;
        store.init().await?;

        let channel = BotApiChannel::new(
            &config.notify.api_base,
            &config.notify.bot_token,
            config.scrape.timeout_secs,
        )?;
        let publisher = Publisher::new(Arc::new(channel), &config.notify);

        let pipeline = Pipeline::new(
            Normalizer::from_config(&config.identity),
            Arc::new(store),
            publisher.clone(),
            &config.scrape,
        );

        let source = HtmlSource::new(config)?;

        Ok(Self {
            config: config.clone(),
            source,
            pipeline,
            publisher,
        })
    }

    async fn run_once(&self) -> Result<()> {
        run_cycle(&self.config, &self.source, &self.pipeline, &self.publisher).await?;
        Ok(())
    }

    /// Run cycles on the configured interval, one in flight at a time.
    ///
    /// A failed cycle is reported and the loop keeps going; the next
    /// tick starts a fresh cycle.
    async fn watch(&self) {
        let period = Duration::from_secs(self.config.scrape.cycle_interval_secs);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info(&format!(
            "Watching every {}s: {}",
            period.as_secs(),
            self.config.scrape.search_url
        ));

        loop {
            interval.tick().await;
            if let Err(e) =
                run_cycle(&self.config, &self.source, &self.pipeline, &self.publisher).await
            {
                log::error(&format!("Cycle failed: {e}"));
                self.publisher
                    .debug(&format!("Zyklus fehlgeschlagen: {e}"))
                    .await;
            }
        }
    }
}
