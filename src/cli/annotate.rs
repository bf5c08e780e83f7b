use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use sentinel_annotator::{badge_of, AutoScorer};
use sentinel_core_types::{ElementStatus, PredictionResponse};
use sentinel_extractor::SiteExtractor;
use sentinel_scheduler::metrics::{self as scheduler_metrics, SchedulerMetricsSnapshot};
use sentinel_scheduler::SchedulerSnapshot;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;
use crate::fixture::PageFixture;

const EXCERPT_CHARS: usize = 48;

#[derive(Args, Clone, Debug)]
pub struct AnnotateArgs {
    /// YAML page fixture to load
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Site dialect (amazon, flipkart); detected from the fixture when omitted
    #[arg(long)]
    pub site: Option<SiteExtractor>,

    /// Pixels scrolled per step while walking down the page
    #[arg(long, default_value_t = 400.0)]
    pub scroll_step: f64,

    /// Override `pipeline.max_concurrent`
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Write the element-state registry to this JSON file
    #[arg(long, value_name = "FILE")]
    pub state_out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct ReviewRow {
    pub index: usize,
    pub status: ElementStatus,
    pub badge: Option<String>,
    pub response: Option<PredictionResponse>,
    pub excerpt: String,
}

#[derive(Debug, Serialize)]
pub struct AnnotateReport {
    pub site: SiteExtractor,
    pub reviews: Vec<ReviewRow>,
    pub scheduler: SchedulerSnapshot,
    pub metrics: SchedulerMetricsSnapshot,
}

pub async fn cmd_annotate(args: AnnotateArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let report = annotate(&args, ctx).await?;
    if !output.emit(&report)? {
        print_human(&report);
    }
    Ok(())
}

/// Loads the fixture, scores every review the scroll walk reveals and
/// returns what each one ended up showing.
pub async fn annotate(args: &AnnotateArgs, ctx: &CliContext) -> Result<AnnotateReport> {
    if !(args.scroll_step > 0.0) {
        bail!("--scroll-step must be positive");
    }
    let fixture = PageFixture::load(&args.page)
        .with_context(|| format!("loading {}", args.page.display()))?;
    let page = fixture.build(args.site)?;

    let mut options = ctx.config().pipeline.options();
    if let Some(max_concurrent) = args.max_concurrent {
        options.max_concurrent = max_concurrent;
    }
    let stack = ctx.scoring_stack()?;
    let scorer = AutoScorer::enable(
        page.document.clone(),
        page.site,
        Arc::clone(&stack.client),
        options,
    )?;
    info!(
        site = %page.site,
        reviews = page.reviews.len(),
        endpoint = %ctx.config().scoring.endpoint,
        "annotating fixture"
    );

    let bottom = page.document.content_height();
    let height = page.document.viewport().height;
    let mut y = 0.0;
    loop {
        page.document.scroll_to(0.0, y);
        let promoted = scorer.evaluate_visibility();
        debug!(y, promoted, "scrolled");
        scorer.wait_idle().await;
        if y + height >= bottom {
            break;
        }
        y += args.scroll_step;
    }
    scorer.wait_idle().await;

    if let Some(path) = &args.state_out {
        scorer
            .registry()
            .write_snapshot(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Wrote element state to {}", path.display());
    }

    let reviews = page
        .reviews
        .iter()
        .enumerate()
        .map(|(index, review)| {
            let state = scorer.registry().state(review.id()).unwrap_or_default();
            ReviewRow {
                index: index + 1,
                status: state.status,
                badge: state.slot.as_ref().and_then(badge_of).map(|(text, _)| text),
                response: state.response,
                excerpt: page
                    .site
                    .review_text(review)
                    .chars()
                    .take(EXCERPT_CHARS)
                    .collect(),
            }
        })
        .collect();
    let report = AnnotateReport {
        site: page.site,
        reviews,
        scheduler: scorer.snapshot(),
        metrics: scheduler_metrics::snapshot(),
    };

    scorer.shutdown().await;
    stack.background.shutdown().await;
    Ok(report)
}

fn print_human(report: &AnnotateReport) {
    println!("Site: {}", report.site);
    for row in &report.reviews {
        let badge = row.badge.as_deref().unwrap_or("-");
        let detail = match &row.response {
            Some(PredictionResponse::Error { error }) => format!(" ({error})"),
            _ => String::new(),
        };
        println!(
            "#{:<3} {:<10} {:<22} {}{}",
            row.index,
            row.status.as_str(),
            badge,
            row.excerpt,
            detail
        );
    }
    let m = &report.metrics;
    println!(
        "Scheduler: admitted={} dispatched={} completed={} failed={} skipped={} peak_in_flight={}/{}",
        m.admitted,
        m.dispatched,
        m.completed,
        m.failed,
        m.skipped,
        report.scheduler.peak_in_flight,
        report.scheduler.max_concurrent
    );
}
