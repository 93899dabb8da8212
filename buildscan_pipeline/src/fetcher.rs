//! Downloads tile imagery over HTTP with bounded retries for transient failures.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use buildscan_core::Tile;
use image::RgbImage;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("buildscan/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait TileFetcher: Send + Sync {
	async fn fetch(&self, tile: Tile) -> Result<RgbImage>;
}

/// Fetches tiles from an XYZ URL template (containing `{z}`, `{x}`, `{y}`), retrying
/// transient failures with exponential backoff.
pub struct HttpTileFetcher {
	client: Client,
	url_template: String,
	max_retries: u32,
}

impl HttpTileFetcher {
	pub fn new(url_template: impl Into<String>) -> Result<HttpTileFetcher> {
		let client = Client::builder().tcp_keepalive(Duration::from_secs(60)).build()?;
		Ok(HttpTileFetcher { client, url_template: url_template.into(), max_retries: 3 })
	}

	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	fn url_for(&self, tile: Tile) -> String {
		self.url_template
			.replace("{z}", &tile.z.to_string())
			.replace("{x}", &tile.x.to_string())
			.replace("{y}", &tile.y.to_string())
	}
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
	async fn fetch(&self, tile: Tile) -> Result<RgbImage> {
		let url = self.url_for(tile);
		let mut attempt = 0;
		loop {
			let result = self.try_fetch_once(&url).await;
			match result {
				Ok(image) => return Ok(image),
				Err(e) if attempt < self.max_retries && is_retryable(&e) => {
					attempt += 1;
					let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
					log::warn!("tile {tile:?} fetch failed ({e:#}), retrying in {backoff:?} (attempt {attempt})");
					tokio::time::sleep(backoff).await;
				}
				Err(e) => return Err(e.context(format!("fetching tile {tile:?} from {url}"))),
			}
		}
	}
}

impl HttpTileFetcher {
	async fn try_fetch_once(&self, url: &str) -> Result<RgbImage> {
		let response = self
			.client
			.get(url)
			.header("User-Agent", USER_AGENT)
			.send()
			.await
			.map_err(|e| FetchError::Transient(e.into()))?;

		let status = response.status();
		if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
			return Err(FetchError::Transient(anyhow!("upstream returned {status}")).into());
		}
		if !status.is_success() {
			return Err(FetchError::Permanent(anyhow!("upstream returned {status}")).into());
		}

		let bytes = response.bytes().await.map_err(|e| FetchError::Transient(e.into()))?;
		let dynamic = image::load_from_memory(&bytes).map_err(|e| FetchError::Permanent(e.into()))?;
		Ok(dynamic.to_rgb8())
	}
}

#[derive(Debug)]
enum FetchError {
	Transient(anyhow::Error),
	Permanent(anyhow::Error),
}

impl std::fmt::Display for FetchError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FetchError::Transient(e) | FetchError::Permanent(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for FetchError {}

fn is_retryable(err: &anyhow::Error) -> bool {
	matches!(err.downcast_ref::<FetchError>(), Some(FetchError::Transient(_)))
}
