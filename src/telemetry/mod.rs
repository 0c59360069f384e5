pub mod generator;
pub mod models;
pub mod parser;

pub use models::{Frame, MatchFrames, PlayerPosition, Point};
pub use parser::{load_match_dir, load_match_file, parse_match, InputError, InputSchema};
