use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use interaction_engine::Subscription;
use pagewire_cli::replay::{replay, ReplayOptions, ReplayReport};
use pagewire_cli::scenario::Scenario;
use pagewire_core_types::SinkMessage;
use tokio::fs;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Quiet time after the last step, e.g. `1s` or `250ms`
    #[arg(long, value_parser = humantime::parse_duration)]
    pub settle: Option<Duration>,

    /// Stop the engine at the end, flushing open hover and typing sessions
    #[arg(long)]
    pub stop: bool,

    /// Override the scenario subscription (preset or comma-separated categories)
    #[arg(long)]
    pub subscription: Option<String>,

    /// Also write the full report as JSON to this file
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<()> {
    let raw = fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("reading {}", args.scenario.display()))?;
    let scenario = Scenario::from_json(&raw)
        .with_context(|| format!("parsing {}", args.scenario.display()))?;

    let mut options = ReplayOptions::from_config(ctx.config());
    if let Some(settle) = args.settle {
        options.settle_ms = settle.as_millis() as i64;
    }
    options.stop_at_end |= args.stop;
    if let Some(spec) = &args.subscription {
        options.subscription =
            Some(Subscription::parse(spec).with_context(|| format!("--subscription {spec}"))?);
    }

    let report = replay(&scenario, ctx.config(), &options)
        .with_context(|| format!("replaying {}", args.scenario.display()))?;

    if let Some(path) = &args.save {
        let body = serde_json::to_string_pretty(&report)?;
        fs::write(path, body)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "replay report saved");
    }

    ctx.output().print(&report, || render_human(&report))
}

fn render_human(report: &ReplayReport) -> String {
    let mut out = String::new();
    let stats = &report.stats;
    let _ = writeln!(out, "Scenario: {} (run {})", report.scenario, report.run_id);
    let _ = writeln!(
        out,
        "Steps: {}  Elapsed: {}ms  Listeners: {}",
        report.steps, report.elapsed_ms, report.listeners
    );
    if !report.frameworks.is_empty() {
        let names: Vec<_> = report.frameworks.iter().map(|fw| fw.as_str()).collect();
        let _ = writeln!(out, "Frameworks: {}", names.join(", "));
    }

    let _ = writeln!(out, "\nMessages ({}):", report.messages.len());
    if report.messages.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for message in &report.messages {
        let _ = writeln!(out, "  {}", message_line(message));
    }

    let _ = writeln!(out, "\nBuffered: {}", report.buffer.len());
    let _ = writeln!(
        out,
        "Raw events: {}  Semantic events: {}  Noise reduction: {}%",
        stats.raw.total, stats.semantic.total, stats.noise_reduction
    );
    for (name, count) in &stats.raw.by_type {
        let _ = writeln!(out, "  raw {name:<12} {count}");
    }
    for (category, count) in &stats.semantic.by_category {
        let _ = writeln!(out, "  semantic {:<12} {count}", category.as_str());
    }
    let _ = writeln!(out, "By preset:");
    for (preset, projection) in &stats.by_preset {
        let _ = writeln!(
            out,
            "  {preset:<12} {:>4} events  {:>3}% reduction",
            projection.semantic, projection.noise_reduction
        );
    }
    let _ = writeln!(
        out,
        "Mutations: {} records, {} batches, {} ignored",
        stats.mutations.records, stats.mutations.batches, stats.mutations.ignored
    );
    out
}

fn message_line(message: &SinkMessage) -> String {
    match message {
        SinkMessage::Semantic(event) => {
            let target = event
                .target
                .as_ref()
                .map(|t| t.selector.as_str())
                .unwrap_or("-");
            let payload = serde_json::to_string(&event.payload).unwrap_or_default();
            format!(
                "[{:>8}] {:<20} {:<24} {}",
                event.timestamp,
                event.kind.as_str(),
                target,
                payload
            )
        }
        SinkMessage::Mutations(batch) => {
            let summary = &batch.summary;
            let notable: Vec<_> = batch.notable.iter().map(|n| n.selector.as_str()).collect();
            format!(
                "[{:>8}] {:<20} +{} -{} attr:{} text:{} notable: {}",
                batch.timestamp,
                "mutations",
                summary.added,
                summary.removed,
                summary.attribute_changes,
                summary.text_changes,
                if notable.is_empty() {
                    "-".to_string()
                } else {
                    notable.join(", ")
                }
            )
        }
        SinkMessage::Error(notice) => {
            format!("[{:>8}] {:<20} {}: {}", "", "error", notice.code, notice.message)
        }
    }
}
