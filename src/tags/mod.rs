//! Tag model: operator commands, their time windows and line matching

mod entry;
mod filter;
mod tag_type;

pub use entry::{TagEntry, TimeWindow, TIME_FORMAT};
pub use filter::{
    byte_matches, frame_kind, frame_type, highlight_payload, origin, origin_code, Origin, INVERSE,
    INVERSE_RESET,
};
pub use tag_type::TagType;
