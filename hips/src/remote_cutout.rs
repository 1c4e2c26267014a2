//! The remote cutout service collaborator: an optional HTTP
//! backend for the export engine's `backend = remote`/`auto` modes. A
//! primary and fallback endpoint pair are each tried in turn, matching the
//! `RemoteStorage` idiom in `hips_container` (a single blocking `reqwest`
//! client, no async HTTP stack for a call this small).

use anyhow::{Context, Result, ensure};
use std::time::Duration;

use hips_core::{DEFAULT_HTTP_TIMEOUT, Frame};

use crate::export::CutoutParams;

/// Fetches rectilinear cutouts from a remote HiPS cutout service, with an
/// optional fallback endpoint if the primary fails.
pub struct RemoteCutoutService {
	primary: String,
	fallback: Option<String>,
	client: reqwest::blocking::Client,
}

impl RemoteCutoutService {
	pub fn new(primary: impl Into<String>, fallback: Option<String>) -> Result<Self> {
		Self::with_timeout(primary, fallback, DEFAULT_HTTP_TIMEOUT)
	}

	pub fn with_timeout(primary: impl Into<String>, fallback: Option<String>, timeout: Duration) -> Result<Self> {
		let client = reqwest::blocking::Client::builder()
			.timeout(timeout)
			.build()
			.context("building HTTP client")?;
		Ok(Self {
			primary: primary.into(),
			fallback,
			client,
		})
	}

	/// Fetches a cutout for `hips_id`, trying the primary endpoint and
	/// falling back to the secondary one (if configured) on failure. The
	/// response body is the floatImage container bytes.
	pub fn fetch_cutout(&self, hips_id: &str, params: &CutoutParams, frame: Frame) -> Result<Vec<u8>> {
		match self.try_endpoint(&self.primary, hips_id, params, frame) {
			Ok(bytes) => Ok(bytes),
			Err(primary_err) => match &self.fallback {
				Some(fallback) => self
					.try_endpoint(fallback, hips_id, params, frame)
					.with_context(|| format!("primary cutout endpoint failed ({primary_err}); fallback also failed")),
				None => Err(primary_err),
			},
		}
	}

	fn try_endpoint(&self, base: &str, hips_id: &str, params: &CutoutParams, frame: Frame) -> Result<Vec<u8>> {
		let url = format!(
			"{}?hips={}&width={}&height={}&format=fits&projection={}&fov={}&ra={}&dec={}&coordsys={}&rotation_angle={}",
			base.trim_end_matches('/'),
			hips_id,
			params.width,
			params.height,
			params.projection,
			params.fov,
			params.ra,
			params.dec,
			frame.as_fits_letter(),
			params.rotation_angle,
		);
		log::trace!("GET {url}");
		let response = self.client.get(&url).send().with_context(|| format!("GET {url}"))?;
		ensure!(response.status().is_success(), "GET {url} returned {}", response.status());
		Ok(response.bytes().with_context(|| format!("reading body of {url}"))?.to_vec())
	}
}
