/// Task title parsing
///
/// Duration annotations (`[1h]`, `[2h30m]`, `[15 minutos]`) and the title
/// normalization that makes them invisible to event matching.
pub mod duration;
pub mod title;

pub use duration::{extract_duration, DurationAnnotation};
pub use title::{normalize_title, titles_equivalent};
