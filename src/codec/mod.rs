pub mod h264;

// Re-export common types and functions
pub use h264::annexb::{split_access_units, NalUnitIter, START_CODE};
pub use h264::types::{NalUnit, NalUnitType};
