mod walk;
mod window;

pub use walk::{companions_of, locate, locate_with, FileMatcher, Located};
pub use window::{FreshnessPolicy, TimeWindow};
