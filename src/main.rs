use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

mod config;
mod heuristics;
mod pack;
mod store;
mod telemetry;

use config::{Command, Config};
use pack::{build_stores, compute_observation_masking, MASKING_WINDOW_SECS};
use store::archive::pack_to_tar_gz;
use store::{query, verify_pack, verify_stores, PackCache, PackContents, PackMetadata, PackPaths};
use telemetry::generator::generate_demo_matches;
use telemetry::{load_match_dir, load_match_file, InputSchema};

const PACK_NOTES: &str = "Frozen pack. Offline. Deterministic.";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    match &config.command {
        Command::Build { source, no_archive } => build(&config, source, !no_archive).await,
        Command::Generate { base, frames } => generate(&config, base, *frames),
        Command::Verify { out_json } => verify(&config, out_json.as_deref()),
        command => run_query(&config, command).await,
    }
}

async fn build(config: &Config, source: &str, write_archive: bool) -> Result<()> {
    let raw = load_match_dir(&config.matches_dir)
        .with_context(|| format!("loading matches from {:?}", config.matches_dir))?;
    if raw.is_empty() {
        anyhow::bail!(
            "no *.json match files in {:?}. Run `rift-pack generate` first.",
            config.matches_dir
        );
    }
    info!("Building pack from {} matches in {:?}", raw.len(), config.matches_dir);

    let stores = build_stores(raw.clone(), config.context_window_secs).await?;
    let report = verify_stores(&stores, config.expected_matches);
    let masking = compute_observation_masking(
        &stores.events_by_match,
        &stores.moments_by_match,
        MASKING_WINDOW_SECS,
    );
    let metadata = PackMetadata {
        version: store::STORE_VERSION,
        source: source.to_string(),
        match_count: stores.events_by_match.len(),
        notes: PACK_NOTES.to_string(),
    };

    let paths = PackPaths::new(&config.pack_root);
    let benchmarks = store::write_pack(
        &paths,
        &PackContents {
            raw_matches: &raw,
            stores: &stores,
            metadata: &metadata,
            observation_masking: &masking,
            integrity_ok: report.integrity_ok,
        },
    )?;

    if !report.integrity_ok {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!(
            "integrity check failed with {} broken references; archive not written",
            report.broken_refs
        );
    }

    if write_archive {
        pack_to_tar_gz(&config.pack_root, &config.archive)?;
    }

    println!(
        "Wrote pack {:?}: {} matches, {} events, {} moments, {} patterns, masking -{}%",
        config.pack_root,
        metadata.match_count,
        report.total_events,
        report.total_moments,
        report.total_patterns,
        masking.reduction_pct
    );
    println!("determinism sha256: {}", benchmarks.determinism_sha256_combined);
    if write_archive {
        println!("archive: {:?}", config.archive);
    }
    Ok(())
}

fn generate(config: &Config, base_path: &Path, frames: usize) -> Result<()> {
    let base = load_match_file(base_path)?;
    match InputSchema::detect(&base) {
        Some(InputSchema::SeriesSnapshot | InputSchema::NestedSeriesSnapshot) => {}
        _ => anyhow::bail!(
            "{:?} is not a series snapshot (expected data.seriesState.games)",
            base_path
        ),
    }

    let docs = generate_demo_matches(&base, frames);
    for (match_id, doc) in &docs {
        let path = config.matches_dir.join(format!("{match_id}.json"));
        store::write_json(&path, doc)?;
    }
    info!(
        "Generated {} matches x {} frames into {:?}",
        docs.len(),
        frames,
        config.matches_dir
    );
    Ok(())
}

fn verify(config: &Config, out_json: Option<&Path>) -> Result<()> {
    let report = verify_pack(&config.pack_root, config.expected_matches);
    if let Some(path) = out_json {
        store::write_json(path, &report)?;
        info!("Integrity report written to {:?}", path);
    }
    print_json(&report)?;

    if !report.integrity_ok {
        anyhow::bail!("integrity check failed with {} broken references", report.broken_refs);
    }
    Ok(())
}

async fn run_query(config: &Config, command: &Command) -> Result<()> {
    let cache = PackCache::new(&config.pack_root);
    let pack = match cache.load().await {
        Ok(pack) => pack,
        Err(e) => {
            error!("Cannot read pack: {}", e.fix());
            return Err(e.into());
        }
    };

    match command {
        Command::Summary => print_json(&query::summary(&pack)),
        Command::Matches => print_json(&query::list_matches(&pack)),
        Command::Teams => print_json(&query::list_teams(&pack)),
        Command::Moments { match_id } => print_json(&query::moments(&pack, match_id)?),
        Command::Panel { evidence_id } => print_json(&query::panel(&pack, evidence_id)?),
        Command::Scout { team_id } => print_json(&query::scout_team(&pack, team_id)),
        Command::Masking => print_json(&query::observation_masking(&pack)),
        other => anyhow::bail!("{other:?} is not a query command"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
