pub mod patterns;
pub mod spatial;

pub use patterns::{detect_patterns, PatternLabel, DEFAULT_VISION_SCORE};
pub use spatial::detect_teamfight;
