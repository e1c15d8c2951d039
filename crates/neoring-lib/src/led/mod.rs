//! LED ring state: colors, set-color payloads, and the lock-guarded shared ring.

mod color;
mod payload;
mod shared;

pub use color::{Rgb, format_color, parse_color};
pub use payload::{SetColorCommand, StatusPayload};
pub use shared::SharedRing;
