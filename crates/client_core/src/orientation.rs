use std::{collections::HashMap, io::Cursor};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::ImageReader;
use reqwest::Client;
use shared::domain::{MediaId, MediaItem};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
    /// The probe failed; treated like a landscape item.
    Unknown,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn is_portrait(self) -> bool {
        self == Orientation::Portrait
    }
}

/// Reports the intrinsic pixel size of an image by URL.
#[async_trait]
pub trait DimensionProbe: Send + Sync {
    async fn dimensions(&self, url: &str) -> Result<(u32, u32)>;
}

pub struct MissingDimensionProbe;

#[async_trait]
impl DimensionProbe for MissingDimensionProbe {
    async fn dimensions(&self, url: &str) -> Result<(u32, u32)> {
        Err(anyhow!("no dimension probe configured for {url}"))
    }
}

/// Downloads the image and decodes only its header.
#[derive(Clone)]
pub struct HttpDimensionProbe {
    http: Client,
    base_url: Url,
}

impl HttpDimensionProbe {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

#[async_trait]
impl DimensionProbe for HttpDimensionProbe {
    async fn dimensions(&self, url: &str) -> Result<(u32, u32)> {
        let target = self
            .base_url
            .join(url)
            .with_context(|| format!("invalid media url '{url}'"))?;
        let bytes = self
            .http
            .get(target.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let dimensions = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .context("failed to sniff image format")?
            .into_dimensions()
            .with_context(|| format!("failed to read image header from {target}"))?;
        Ok(dimensions)
    }
}

/// Probes one item. Videos are never classified.
pub async fn classify(probe: &dyn DimensionProbe, item: &MediaItem) -> Option<Orientation> {
    if item.is_video() {
        return None;
    }
    match probe.dimensions(&item.url).await {
        Ok((width, height)) => {
            let orientation = Orientation::from_dimensions(width, height);
            debug!(media_id = item.id.0, width, height, ?orientation, "classified media");
            Some(orientation)
        }
        Err(error) => {
            warn!(media_id = item.id.0, url = %item.url, %error, "orientation probe failed");
            Some(Orientation::Unknown)
        }
    }
}

/// Classifications for the current list, keyed by display index and media id.
#[derive(Debug, Default, Clone)]
pub struct OrientationCache {
    entries: HashMap<(usize, MediaId), Orientation>,
}

impl OrientationCache {
    pub fn get(&self, index: usize, id: MediaId) -> Option<Orientation> {
        self.entries.get(&(index, id)).copied()
    }

    pub fn contains(&self, index: usize, id: MediaId) -> bool {
        self.entries.contains_key(&(index, id))
    }

    /// First classification wins; later results for the same key are ignored.
    pub fn record(&mut self, index: usize, id: MediaId, orientation: Orientation) -> bool {
        if self.contains(index, id) {
            return false;
        }
        self.entries.insert((index, id), orientation);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/orientation_tests.rs"]
mod tests;
