//! gray-tags
//!
//! Tag codec for inbound monitoring events.
//!
//! Events carry a flat sequence of free-form tags. Tags containing `=` are
//! keyed (`key=value`, split on the first `=`); everything else is a plain
//! tag. Parsing is total: a tag that does not look keyed is simply plain.
//!
//! Serialization emits keyed tags first (map order), then plain tags in their
//! input relative order, dropping anything the [`ReservedTags`] rule marks
//! as reserved.
//!
//! Deterministic, pure logic. No IO.

mod codec;
mod types;

pub use codec::{parse, serialize};
pub use types::*;
