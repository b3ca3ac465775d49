//! `recfetch fetch` – export one record per identifier from the API.

use anyhow::{bail, Context, Result};
use recfetch_core::config::RecfetchConfig;
use recfetch_core::control::CancelToken;
use recfetch_core::fetch::FetchEngine;
use recfetch_core::output::OutputWriter;
use recfetch_core::rate_limit::RateLimiter;
use recfetch_core::request::{Credentials, RequestTemplate};
use recfetch_core::scheduler::{run_pool, OutcomeEvent, PoolSettings};
use recfetch_core::transport::CurlTransport;
use std::sync::Arc;
use std::time::Duration;

use super::{prepare, Prepared};
use crate::cli::FetchArgs;

/// Outcomes buffered between the pool and the output writer.
const OUTCOME_BUFFER: usize = 64;

/// Settings after applying CLI overrides on top of the config file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FetchSettings {
    pub url_template: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub rate_limit: f64,
    pub user_agent: String,
    pub credentials: Credentials,
}

impl FetchSettings {
    pub fn resolve(cfg: &RecfetchConfig, args: &FetchArgs) -> Result<Self> {
        let timeout_secs = args.timeout.unwrap_or(cfg.timeout_secs);
        if !(timeout_secs.is_finite() && timeout_secs > 0.0) {
            bail!("timeout must be a positive number of seconds, got {}", timeout_secs);
        }
        let concurrency = args.concurrency.unwrap_or(cfg.concurrency);
        if concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        let api_key_name = args.api_key_name.as_deref().unwrap_or(&cfg.api_key_name);

        Ok(Self {
            url_template: args
                .url_template
                .clone()
                .unwrap_or_else(|| cfg.url_template.clone()),
            concurrency,
            timeout: Duration::from_secs_f64(timeout_secs),
            rate_limit: args.rate_limit.unwrap_or(cfg.rate_limit),
            user_agent: args
                .user_agent
                .clone()
                .unwrap_or_else(|| cfg.user_agent.clone()),
            credentials: Credentials::resolve(
                args.auth_token.as_deref(),
                Some(api_key_name),
                args.api_key_value.as_deref(),
            ),
        })
    }

    pub fn template(&self) -> RequestTemplate {
        RequestTemplate::new(self.url_template.clone(), self.timeout)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept", "application/json")
            .credentials(&self.credentials)
    }
}

pub async fn run_fetch(cfg: &RecfetchConfig, args: FetchArgs) -> Result<()> {
    let settings = FetchSettings::resolve(cfg, &args)?;
    if settings.credentials == Credentials::None {
        tracing::warn!("no credentials given; requests are sent unauthenticated");
    }
    let Some(Prepared {
        pending,
        skipped,
        mut writer,
    }) = prepare(&args.input)?
    else {
        return Ok(());
    };

    let limiter = Arc::new(RateLimiter::new(settings.rate_limit)?);
    let engine = Arc::new(FetchEngine::new(Arc::new(CurlTransport::new()), limiter));
    tracing::info!(
        total = pending.len(),
        concurrency = settings.concurrency,
        rate_limit = settings.rate_limit,
        "starting fetch"
    );

    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::channel::<OutcomeEvent>(OUTCOME_BUFFER);
    let writer_handle = tokio::task::spawn_blocking(move || -> Result<OutputWriter> {
        while let Some(event) = outcome_rx.blocking_recv() {
            writer.write_outcome(&event.identifier, &event.outcome)?;
        }
        Ok(writer)
    });

    let cancel = CancelToken::new();
    let report = run_pool(
        engine,
        Arc::new(settings.template()),
        pending,
        PoolSettings {
            concurrency: settings.concurrency,
        },
        &cancel,
        Some(outcome_tx),
    )
    .await?;

    let writer = writer_handle
        .await
        .context("output writer task failed")??;
    let out_dir = writer.dir().to_path_buf();
    let files = writer.finish(&report.summary)?;

    let summary = &report.summary;
    println!(
        "Exported {} of {} identifiers to {} ({} succeeded, {} failed, {} skipped)",
        summary.total_processed,
        summary.total_processed + report.unfinished.len() + report.never_attempted.len(),
        out_dir.display(),
        summary.success_count(),
        summary.error_count,
        skipped
    );
    if let Some(path) = &files.error_summary {
        println!("Errors written to {}", path.display());
    }

    if let Some(abort) = &report.abort {
        let stopped: Vec<&str> = report
            .unfinished
            .iter()
            .chain(&report.never_attempted)
            .map(String::as_str)
            .collect();
        if !stopped.is_empty() {
            eprintln!("Not processed ({}): {}", stopped.len(), stopped.join(", "));
        }
        bail!(
            "run aborted on identifier {} (HTTP {}): {}",
            abort.identifier,
            abort.error.status_code,
            abort.error.message
        );
    }

    Ok(())
}
