//! # H.264/AVC Bitstream Helpers
//!
//! Just enough Annex-B handling to feed a decoder engine: splitting an
//! elementary stream into start-code prefixed access units, walking the NAL
//! units inside one region, and classifying NAL headers.
//!
//! ## Example: Splitting a Stream
//!
//! ```rust
//! use nalflow::codec::h264::{split_access_units, NalUnit, NalUnitIter, NalUnitType};
//!
//! let stream = [0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x00, 0x00, 0x01, 0x65, 0x88];
//! let units = split_access_units(&stream);
//! assert_eq!(units.len(), 2);
//!
//! for unit in &units {
//!     for payload in NalUnitIter::new(unit.clone()) {
//!         if let Some(nal) = NalUnit::parse(payload) {
//!             match nal.unit_type() {
//!                 NalUnitType::CodedSliceIDR => println!("Found IDR slice"),
//!                 NalUnitType::SPS => println!("Found SPS"),
//!                 other => println!("Found {:?}", other),
//!             }
//!         }
//!     }
//! }
//! ```

/// Annex-B start code scanning and access unit splitting
pub mod annexb;
/// NAL unit header types
pub mod types;

#[doc(inline)]
pub use annexb::*;
#[doc(inline)]
pub use types::*;
