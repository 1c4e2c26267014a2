//! Cooperative cancellation handed down through builder, reader and export
//! call trees. Checked between cells, between tiles, and at every
//! suspension point, per the concurrency model.

use anyhow::{Result, bail};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cloneable, cheaply shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationHandle(Arc<AtomicBool>);

impl CancellationHandle {
	#[must_use]
	pub fn new() -> Self {
		Self(Arc::new(AtomicBool::new(false)))
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	/// Returns an error if cancellation has been requested; call at every
	/// suspension point named by the concurrency model (between cells,
	/// between tiles, before awaiting I/O).
	pub fn check(&self) -> Result<()> {
		if self.is_cancelled() {
			bail!("operation cancelled");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_uncancelled() {
		let handle = CancellationHandle::new();
		assert!(!handle.is_cancelled());
		assert!(handle.check().is_ok());
	}

	#[test]
	fn cancel_propagates_through_clones() {
		let handle = CancellationHandle::new();
		let clone = handle.clone();
		clone.cancel();
		assert!(handle.is_cancelled());
		assert!(handle.check().is_err());
	}
}
