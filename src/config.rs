use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pack::DEFAULT_CONTEXT_WINDOW_SECS;

/// Deterministic esports telemetry pack builder
#[derive(Parser, Debug, Clone)]
#[command(name = "rift-pack", version, about)]
pub struct Config {
    /// Directory holding one JSON document per match
    #[arg(long, env = "MATCHES_DIR", default_value = "data/demo_matches", global = true)]
    pub matches_dir: PathBuf,

    /// Output pack directory
    #[arg(long, env = "PACK_ROOT", default_value = "artifacts/demo_pack", global = true)]
    pub pack_root: PathBuf,

    /// Output archive path
    #[arg(
        long,
        env = "PACK_ARCHIVE",
        default_value = "artifacts/demo_pack.tar.gz",
        global = true
    )]
    pub archive: PathBuf,

    /// Number of matches the pack must contain (integrity check)
    #[arg(long, env = "EXPECTED_MATCHES", global = true)]
    pub expected_matches: Option<usize>,

    /// Half-width of an evidence panel's context window, in seconds
    #[arg(
        long,
        env = "CONTEXT_WINDOW_SECS",
        default_value_t = DEFAULT_CONTEXT_WINDOW_SECS,
        global = true
    )]
    pub context_window_secs: i64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build the pack from the match directory, verify it and archive it
    Build {
        /// Dataset label stored in metadata.json (synthetic, real or custom)
        #[arg(long, default_value = "synthetic")]
        source: String,

        /// Skip writing the tar.gz archive
        #[arg(long, default_value = "false")]
        no_archive: bool,
    },

    /// Write the six synthetic demo matches derived from one base snapshot
    Generate {
        /// Snapshot document with `data.seriesState.games[0]`
        #[arg(long)]
        base: PathBuf,

        /// Frames per match (10 s apart)
        #[arg(long, default_value = "360")]
        frames: usize,
    },

    /// Check every reference in an existing pack
    Verify {
        /// Also write the report as JSON to this path
        #[arg(long)]
        out_json: Option<PathBuf>,
    },

    /// Pack overview: counts, dataset metadata, determinism hashes
    Summary,

    /// List match ids in the pack
    Matches,

    /// List team ids in the pack
    Teams,

    /// Show the moments of one match
    Moments {
        #[arg(long)]
        match_id: String,
    },

    /// Show the evidence panel of one event
    Panel {
        #[arg(long)]
        evidence_id: String,
    },

    /// Show the patterns of one team
    Scout {
        #[arg(long)]
        team_id: String,
    },

    /// Show the observation masking report
    Masking,
}

pub const DATASET_SOURCES: [&str; 3] = ["synthetic", "real", "custom"];

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.context_window_secs < 0 {
            anyhow::bail!("context_window_secs must not be negative");
        }
        if self.expected_matches == Some(0) {
            anyhow::bail!("expected_matches must be at least 1");
        }
        match &self.command {
            Command::Build { source, .. } if !DATASET_SOURCES.contains(&source.as_str()) => {
                anyhow::bail!(
                    "source must be one of {}, got {:?}",
                    DATASET_SOURCES.join(", "),
                    source
                );
            }
            Command::Generate { frames, .. } if *frames == 0 => {
                anyhow::bail!("frames must be at least 1");
            }
            _ => {}
        }
        Ok(())
    }
}
