mod sort;
mod update;

pub use sort::sort;
pub use update::{run, update};

/// Display format of the `downloaded` field, e.g. `January 05, 2026`.
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// Today's date in [`DATE_FORMAT`].
pub fn today() -> String {
    chrono::Local::now().format(DATE_FORMAT).to_string()
}
