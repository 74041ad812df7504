// Model import

pub mod mps;

pub use mps::{parse_mps, read_mps_file};
