pub mod determinism;
pub mod events;
pub mod metrics;
pub mod models;
pub mod moments;
pub mod panels;
pub mod pipeline;
pub mod team_patterns;

pub use metrics::{compute_observation_masking, ObservationMasking, MASKING_WINDOW_SECS};
pub use panels::DEFAULT_CONTEXT_WINDOW_SECS;
pub use pipeline::build_stores;
pub use team_patterns::{team_ids, DEMO_SAMPLE_SIZE};
