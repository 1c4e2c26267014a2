//! Progress reporting used by the pyramid builder: per-cell during tile
//! generation, per-order during aggregation.
//!
//! # Overview
//!
//! By default this provides a no-op drain. With the `cli` feature (and
//! outside of tests) it swaps in a lightweight terminal progress bar with no
//! external dependencies.
//!
//! # Examples
//!
//! ```rust
//! use hips_core::progress::*;
//!
//! let mut progress = get_progress_bar("Building order 3", 100);
//! progress.set_position(50);
//! progress.inc(10);
//! progress.finish();
//! ```

#[cfg(all(not(feature = "test"), feature = "cli"))]
mod progress_bar;
mod progress_drain;
mod traits;

pub use traits::ProgressTrait;

/// Creates a progress bar, or a no-op drain outside of CLI/non-test builds.
#[must_use]
pub fn get_progress_bar(message: &str, max_value: u64) -> Box<dyn ProgressTrait> {
	#[cfg(all(not(feature = "test"), feature = "cli"))]
	let mut progress = progress_bar::ProgressBar::new();
	#[cfg(any(feature = "test", not(feature = "cli")))]
	let mut progress = progress_drain::ProgressDrain::new();
	progress.init(message, max_value);
	Box::new(progress)
}
