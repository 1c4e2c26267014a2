//! HTTP-backed `StorageTarget` for `HipsSource::RemoteRoot`, implemented
//! minimally: `readBinary`/`readText` as blocking GETs against
//! `baseUrl/<path>` with the default timeout, `exists` as a GET with
//! the body discarded, `writeBinary`/`writeText` unsupported.

use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use std::time::Duration;

use hips_core::DEFAULT_HTTP_TIMEOUT;

use super::{StorageTarget, normalize_path};

/// A read-only `StorageTarget` fetching paths relative to `base_url` over
/// HTTP. `reqwest::blocking` is used deliberately: a small synchronous call
/// beats standing up an async HTTP stack for one request at a time, from
/// within the `async fn` trait methods.
pub struct RemoteStorage {
	base_url: String,
	client: reqwest::blocking::Client,
}

impl RemoteStorage {
	pub fn new(base_url: impl Into<String>) -> Result<Self> {
		Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
	}

	pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
		let client = reqwest::blocking::Client::builder()
			.timeout(timeout)
			.build()
			.context("building HTTP client")?;
		Ok(Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, normalize_path(path))
	}
}

#[async_trait]
impl StorageTarget for RemoteStorage {
	async fn write_binary(&self, _path: &str, _bytes: Vec<u8>) -> Result<()> {
		bail!("remote storage target does not support writes");
	}

	async fn write_text(&self, _path: &str, _text: &str) -> Result<()> {
		bail!("remote storage target does not support writes");
	}

	async fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
		let url = self.url(path);
		log::trace!("GET {url}");
		let response = self.client.get(&url).send().with_context(|| format!("GET {url}"))?;
		ensure!(response.status().is_success(), "GET {url} returned {}", response.status());
		Ok(response.bytes().with_context(|| format!("reading body of {url}"))?.to_vec())
	}

	async fn read_text(&self, path: &str) -> Result<String> {
		let bytes = self.read_binary(path).await?;
		String::from_utf8(bytes).with_context(|| format!("{path} is not valid UTF-8"))
	}

	async fn exists(&self, path: &str) -> Result<bool> {
		let url = self.url(path);
		match self.client.get(&url).send() {
			Ok(response) => Ok(response.status().is_success()),
			Err(_) => Ok(false),
		}
	}
}
