//! On-disk pack: frozen JSON stores plus metadata, written with sorted keys so
//! identical inputs give identical bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::pack::determinism::canonical_json_pretty;
use crate::pack::models::{Event, EvidencePanel, Moment, PackStores, TeamPattern};
use crate::pack::ObservationMasking;

pub mod archive;
pub mod cache;
pub mod integrity;
pub mod query;

pub use cache::PackCache;
pub use integrity::{verify_pack, verify_stores};

pub const STORE_VERSION: u32 = 1;
pub const REBUILD_HINT: &str = "rebuild the pack with `rift-pack build`";

#[derive(Debug, Error)]
pub enum PackError {
    #[error("missing required pack file {path:?}")]
    Missing { path: PathBuf },

    #[error("pack JSON is corrupted: {path:?} ({source})")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PackError {
    /// Remediation shown next to the error.
    pub fn fix(&self) -> &'static str {
        match self {
            PackError::Missing { .. } | PackError::Corrupted { .. } => REBUILD_HINT,
            PackError::Io { .. } | PackError::Serialize { .. } => {
                "check that the pack directory is readable and writable"
            }
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        PackError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Well-known locations inside a pack directory.
#[derive(Debug, Clone)]
pub struct PackPaths {
    pub root: PathBuf,
}

impl PackPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        PackPaths { root: root.into() }
    }

    pub fn matches_dir(&self) -> PathBuf {
        self.root.join("matches")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn events_store(&self) -> PathBuf {
        self.processed_dir().join("events_store.json")
    }

    pub fn moments_store(&self) -> PathBuf {
        self.processed_dir().join("moments_store.json")
    }

    pub fn patterns_store(&self) -> PathBuf {
        self.processed_dir().join("patterns_store.json")
    }

    pub fn evidence_refs(&self) -> PathBuf {
        self.processed_dir().join("evidence_refs.json")
    }

    pub fn observation_masking(&self) -> PathBuf {
        self.processed_dir().join("observation_masking.json")
    }

    pub fn benchmarks(&self) -> PathBuf {
        self.processed_dir().join("benchmarks.json")
    }

    pub fn metadata(&self) -> PathBuf {
        self.root.join("metadata.json")
    }

    /// The four stores, in the order their hashes are reported.
    pub fn store_files(&self) -> [PathBuf; 4] {
        [
            self.events_store(),
            self.moments_store(),
            self.patterns_store(),
            self.evidence_refs(),
        ]
    }
}

// ── Wire shapes ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MatchesStoreRef<'a, T> {
    version: u32,
    matches: &'a BTreeMap<String, Vec<T>>,
}

#[derive(Deserialize)]
struct MatchesStore<T> {
    #[allow(dead_code)]
    version: u32,
    #[serde(default = "BTreeMap::new")]
    matches: BTreeMap<String, Vec<T>>,
}

#[derive(Serialize, Deserialize)]
struct PatternsStore {
    version: u32,
    #[serde(default)]
    patterns: Vec<TeamPattern>,
}

#[derive(Serialize)]
struct EvidenceRefsRef<'a> {
    version: u32,
    panels: &'a BTreeMap<String, EvidencePanel>,
}

#[derive(Deserialize)]
struct EvidenceRefs {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    panels: BTreeMap<String, EvidencePanel>,
}

/// `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackMetadata {
    pub version: u32,
    /// "synthetic", "real" or "custom"
    pub source: String,
    pub match_count: usize,
    pub notes: String,
}

/// `processed/benchmarks.json`. Wall-clock numbers are pinned to zero so the
/// archive stays reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub version: u32,
    pub integrity_ok: bool,
    pub pack_build_ms: u64,
    pub determinism_sha256: BTreeMap<String, String>,
    pub determinism_sha256_combined: String,
}

/// A pack as read back from disk.
#[derive(Debug, Clone)]
pub struct LoadedPack {
    pub root: PathBuf,
    pub stores: PackStores,
    pub metadata: Option<PackMetadata>,
    pub observation_masking: Option<ObservationMasking>,
    pub benchmarks: Option<Benchmarks>,
}

// ── Writing ───────────────────────────────────────────────────────────────────

pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<(), PackError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PackError::io(parent, e))?;
    }
    let text = canonical_json_pretty(data).map_err(|source| PackError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| PackError::io(path, e))
}

/// Write the four stores under `processed/`.
pub fn write_stores(paths: &PackPaths, stores: &PackStores) -> Result<(), PackError> {
    write_json(
        &paths.events_store(),
        &MatchesStoreRef {
            version: STORE_VERSION,
            matches: &stores.events_by_match,
        },
    )?;
    write_json(
        &paths.moments_store(),
        &MatchesStoreRef {
            version: STORE_VERSION,
            matches: &stores.moments_by_match,
        },
    )?;
    write_json(
        &paths.patterns_store(),
        &PatternsStore {
            version: STORE_VERSION,
            patterns: stores.patterns.clone(),
        },
    )?;
    write_json(
        &paths.evidence_refs(),
        &EvidenceRefsRef {
            version: STORE_VERSION,
            panels: &stores.panels,
        },
    )?;
    debug!("Wrote stores under {:?}", paths.processed_dir());
    Ok(())
}

/// Copy of each raw input, re-serialised canonically, under `matches/`.
pub fn write_raw_matches(paths: &PackPaths, raw: &[(String, Value)]) -> Result<(), PackError> {
    for (match_id, doc) in raw {
        write_json(&paths.matches_dir().join(format!("{match_id}.json")), doc)?;
    }
    Ok(())
}

pub fn sha256_file(path: &Path) -> Result<String, PackError> {
    let bytes = fs::read(path).map_err(|e| PackError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Content hashes of the written stores; two builds from the same input must
/// report the same values.
pub fn compute_benchmarks(paths: &PackPaths, integrity_ok: bool) -> Result<Benchmarks, PackError> {
    let mut hashes = BTreeMap::new();
    for file in paths.store_files() {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        hashes.insert(name, sha256_file(&file)?);
    }
    let joined = hashes
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("|");
    let combined = format!("{:x}", Sha256::digest(joined.as_bytes()));

    Ok(Benchmarks {
        version: STORE_VERSION,
        integrity_ok,
        pack_build_ms: 0,
        determinism_sha256: hashes,
        determinism_sha256_combined: combined,
    })
}

/// Everything `build` writes, except the archive.
pub struct PackContents<'a> {
    pub raw_matches: &'a [(String, Value)],
    pub stores: &'a PackStores,
    pub metadata: &'a PackMetadata,
    pub observation_masking: &'a ObservationMasking,
    pub integrity_ok: bool,
}

/// Recreate the pack directory from scratch.
pub fn write_pack(paths: &PackPaths, contents: &PackContents<'_>) -> Result<Benchmarks, PackError> {
    if paths.root.exists() {
        fs::remove_dir_all(&paths.root).map_err(|e| PackError::io(&paths.root, e))?;
    }
    fs::create_dir_all(paths.matches_dir()).map_err(|e| PackError::io(&paths.root, e))?;

    write_raw_matches(paths, contents.raw_matches)?;
    write_stores(paths, contents.stores)?;
    write_json(&paths.metadata(), contents.metadata)?;
    write_json(&paths.observation_masking(), contents.observation_masking)?;

    let benchmarks = compute_benchmarks(paths, contents.integrity_ok)?;
    write_json(&paths.benchmarks(), &benchmarks)?;

    info!(
        "Pack written to {:?} (combined sha256 {})",
        paths.root, benchmarks.determinism_sha256_combined
    );
    Ok(benchmarks)
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn read_required<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PackError> {
    match read_optional(path)? {
        Some(v) => Ok(v),
        None => Err(PackError::Missing {
            path: path.to_path_buf(),
        }),
    }
}

/// `Ok(None)` if the file is absent; corruption is still an error.
fn read_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, PackError> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PackError::io(path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| PackError::Corrupted {
            path: path.to_path_buf(),
            source,
        })
}

/// Read the four stores of a pack.
pub fn load_stores(paths: &PackPaths) -> Result<PackStores, PackError> {
    let events: MatchesStore<Event> = read_required(&paths.events_store())?;
    let moments: MatchesStore<Moment> = read_required(&paths.moments_store())?;
    let patterns: PatternsStore = read_required(&paths.patterns_store())?;
    let evidence: EvidenceRefs = read_required(&paths.evidence_refs())?;

    Ok(PackStores {
        events_by_match: events.matches,
        moments_by_match: moments.matches,
        patterns: patterns.patterns,
        panels: evidence.panels,
    })
}

/// Read a full pack: required stores plus optional metadata files.
pub fn load_pack(root: &Path) -> Result<LoadedPack, PackError> {
    let paths = PackPaths::new(root);
    let stores = load_stores(&paths)?;
    Ok(LoadedPack {
        root: root.to_path_buf(),
        stores,
        metadata: read_optional(&paths.metadata())?,
        observation_masking: read_optional(&paths.observation_masking())?,
        benchmarks: read_optional(&paths.benchmarks())?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pack::{build_stores, compute_observation_masking, DEFAULT_CONTEXT_WINDOW_SECS, MASKING_WINDOW_SECS};
    use crate::telemetry::generator::generate_demo_matches;
    use crate::telemetry::generator::tests::base_snapshot;
    use tempfile::TempDir;

    pub(crate) async fn demo_pack(dir: &Path) -> (PackStores, Vec<(String, Value)>) {
        let raw = generate_demo_matches(&base_snapshot(), 40);
        let stores = build_stores(raw.clone(), DEFAULT_CONTEXT_WINDOW_SECS)
            .await
            .unwrap();
        let masking = compute_observation_masking(
            &stores.events_by_match,
            &stores.moments_by_match,
            MASKING_WINDOW_SECS,
        );
        let metadata = PackMetadata {
            version: STORE_VERSION,
            source: "synthetic".into(),
            match_count: stores.events_by_match.len(),
            notes: "test pack".into(),
        };
        write_pack(
            &PackPaths::new(dir),
            &PackContents {
                raw_matches: &raw,
                stores: &stores,
                metadata: &metadata,
                observation_masking: &masking,
                integrity_ok: true,
            },
        )
        .unwrap();
        (stores, raw)
    }

    #[tokio::test]
    async fn test_round_trip_preserves_stores() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("pack");
        let (stores, _) = demo_pack(&root).await;

        let loaded = load_pack(&root).unwrap();
        assert_eq!(loaded.stores, stores);
        assert_eq!(loaded.metadata.unwrap().match_count, 6);
        assert!(loaded.observation_masking.is_some());
        assert!(loaded.benchmarks.unwrap().integrity_ok);
        assert!(PackPaths::new(&root).matches_dir().join("TL-C9-G2.json").exists());
    }

    #[tokio::test]
    async fn test_two_builds_are_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let (a, b) = (tmp.path().join("a"), tmp.path().join("b"));
        demo_pack(&a).await;
        demo_pack(&b).await;

        let (pa, pb) = (PackPaths::new(&a), PackPaths::new(&b));
        for (fa, fb) in pa.store_files().iter().zip(pb.store_files().iter()) {
            assert_eq!(fs::read(fa).unwrap(), fs::read(fb).unwrap());
        }
        assert_eq!(fs::read(pa.benchmarks()).unwrap(), fs::read(pb.benchmarks()).unwrap());
    }

    #[tokio::test]
    async fn test_store_keys_are_sorted() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("pack");
        demo_pack(&root).await;
        let text = fs::read_to_string(PackPaths::new(&root).events_store()).unwrap();
        let first = text.find("\"C9-100-G1\"").unwrap();
        let last = text.find("\"TL-C9-G3\"").unwrap();
        assert!(first < last);
        assert!(text.find("\"matches\"").unwrap() < text.find("\"version\"").unwrap());
    }

    #[test]
    fn test_missing_store_is_reported() {
        let tmp = TempDir::new().unwrap();
        let err = load_pack(tmp.path()).unwrap_err();
        assert!(matches!(err, PackError::Missing { .. }));
        assert!(err.fix().contains("rift-pack build"));
    }

    #[tokio::test]
    async fn test_corrupted_store_is_not_silently_empty() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("pack");
        demo_pack(&root).await;
        let paths = PackPaths::new(&root);
        fs::write(paths.moments_store(), "{ not json").unwrap();

        let err = load_pack(&root).unwrap_err();
        assert!(matches!(err, PackError::Corrupted { .. }));
        assert_eq!(err.fix(), REBUILD_HINT);
    }

    #[tokio::test]
    async fn test_corrupted_optional_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("pack");
        demo_pack(&root).await;
        let paths = PackPaths::new(&root);
        fs::write(paths.metadata(), "[").unwrap();
        assert!(matches!(load_pack(&root), Err(PackError::Corrupted { .. })));

        fs::remove_file(paths.metadata()).unwrap();
        assert!(load_pack(&root).unwrap().metadata.is_none());
    }
}
