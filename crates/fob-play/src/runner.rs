//! One test run: build, serve, launch, navigate, collect, tear down.
//!
//! Every resource goes into the run's [`ResourceLedger`] as soon as it
//! exists. Whatever stage fails, the ledger then holds exactly what has to
//! be released, and the run drains it before returning unless the
//! configuration asks for a persistent session.

use crate::build::{strategy_for, BuildStrategy, HARNESS_PATH};
use crate::collector::ResultCollector;
use crate::config::RunConfiguration;
use crate::error::Result;
use crate::ledger::{Release, ResourceLedger};
use crate::server::DevServer;
use async_trait::async_trait;
use fob_browser_test::{ConsoleRelay, ConsoleSink, HostConsole, TestBrowser};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a run that reached completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Number of failed tests
    pub failed: u64,
    /// Port the harness was served on
    pub port: u16,
}

impl RunOutcome {
    /// True when no test failed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed == 0
    }
}

/// Sequences a test run over its external resources.
pub struct RunOrchestrator {
    config: RunConfiguration,
    strategy: Box<dyn BuildStrategy>,
    sink: Arc<dyn ConsoleSink>,
    collector: ResultCollector,
    ledger: ResourceLedger,
}

impl RunOrchestrator {
    /// Creates an orchestrator using the configured bundler and the host console.
    #[must_use]
    pub fn new(config: RunConfiguration) -> Self {
        let strategy = strategy_for(&config.bundler, &config.cwd);
        Self::with_strategy(config, strategy)
    }

    /// Creates an orchestrator with an explicit build strategy.
    #[must_use]
    pub fn with_strategy(config: RunConfiguration, strategy: Box<dyn BuildStrategy>) -> Self {
        Self {
            config,
            strategy,
            sink: Arc::new(HostConsole::new()),
            collector: ResultCollector::default(),
            ledger: ResourceLedger::new(),
        }
    }

    /// Relays the page console into `sink` instead of the host console.
    #[must_use]
    pub fn with_console(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Resources still owned by this orchestrator.
    ///
    /// Empty after a run unless the session was kept open.
    #[must_use]
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Runs the suite once.
    ///
    /// Returns the failure count of a completed suite. Failing tests are
    /// not an error at this level.
    ///
    /// # Errors
    ///
    /// Returns the first build, bind, browser or page fault. Resources are
    /// released before the error is returned unless `keep_open` is set.
    pub async fn run(&self) -> Result<RunOutcome> {
        let outcome = self.execute().await;

        if self.config.keep_open {
            debug!("keeping {} resources open", self.ledger.len());
        } else {
            self.teardown().await;
        }

        outcome
    }

    /// Releases everything the run registered. Release failures are logged
    /// by the ledger and never change the run's outcome.
    pub async fn teardown(&self) {
        let report = self.ledger.drain_all().await;
        if !report.released.is_empty() {
            debug!("released {}", report.released.join(", "));
        }
    }

    async fn execute(&self) -> Result<RunOutcome> {
        let ledger = &self.ledger;

        info!("Bundling using {}...", self.strategy.name());
        let artifact = self
            .strategy
            .build(&self.config.test_files, &self.config.harness, ledger)
            .await?;
        info!("Done bundling.");

        let server = Arc::new(
            DevServer::new(artifact, &self.config.cwd)
                .start(self.config.preferred_port)
                .await?,
        );
        ledger.register("HTTP server", Arc::clone(&server));
        info!("HTTP server is listening on port {}", server.port());

        let browser = Arc::new(TestBrowser::launch(self.config.launch.clone()).await?);
        ledger.register("browser", Arc::clone(&browser));

        let page = Arc::new(browser.new_page(&self.config.context).await?);
        // The page's dialog suppressor lives as long as the page.
        let held = Arc::clone(&page);
        ledger.register_fn("page", move || async move {
            drop(held);
            Ok(())
        });

        let relay = Arc::new(ConsoleRelay::attach(&page, Arc::clone(&self.sink)).await?);
        ledger.register("console relay", relay);

        page.navigate(&server.url(HARNESS_PATH)).await?;
        let failed = self.collector.await_outcome(page.as_ref()).await?;

        Ok(RunOutcome {
            failed,
            port: server.port(),
        })
    }
}

#[async_trait]
impl Release for TestBrowser {
    async fn release(&self) -> anyhow::Result<()> {
        self.close().await?;
        Ok(())
    }
}

#[async_trait]
impl Release for ConsoleRelay {
    async fn release(&self) -> anyhow::Result<()> {
        self.detach();
        Ok(())
    }
}
