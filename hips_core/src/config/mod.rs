//! Runtime configuration shared by the builder, reader and export engine:
//! parallelism, the default HTTP timeout for remote roots, and cooperative
//! cancellation.

mod cancellation;
pub use cancellation::*;

use std::time::Duration;

/// Default timeout applied to remote-root HTTP requests when the caller does
/// not override it.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(25);

pub struct Config {
	/// Number of worker threads the pyramid builder's `rayon` pool should use.
	/// Defaults to the number of logical CPUs.
	pub parallelism: usize,
	/// Timeout for a single remote-root HTTP request.
	pub http_timeout: Duration,
	pub cancellation: CancellationHandle,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			parallelism: num_cpus::get(),
			http_timeout: DEFAULT_HTTP_TIMEOUT,
			cancellation: CancellationHandle::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_parallelism_is_positive() {
		assert!(Config::default().parallelism > 0);
	}
}
