use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DiffError;

/// Default network timeout for `http(s)` references.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where an image comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ImageRef {
    /// `http://` or `https://`.
    Url(String),
    /// `data:<mime>;base64,<payload>`.
    Data(String),
    /// Local file, given as a plain path or a `file://` URL.
    Path(PathBuf),
}

impl ImageRef {
    pub fn parse(s: &str) -> Self {
        let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(s.to_string())
        } else if lower.starts_with("data:") {
            Self::Data(s.to_string())
        } else if let Some(path) = s.strip_prefix("file://") {
            Self::Path(PathBuf::from(path))
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl FromStr for ImageRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ImageRef> for String {
    fn from(r: ImageRef) -> Self {
        match r {
            ImageRef::Url(s) | ImageRef::Data(s) => s,
            ImageRef::Path(p) => p.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(u) => f.write_str(u),
            // Payloads can be megabytes; keep logs readable.
            Self::Data(d) if d.len() > 64 => {
                let head: String = d.chars().take(48).collect();
                write!(f, "{head}...")
            }
            Self::Data(d) => f.write_str(d),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Fetches image bytes and decodes them to RGBA. Cheap to share; holds
/// a pooled HTTP client and no image cache.
#[derive(Clone)]
pub struct Loader {
    client: reqwest::Client,
}

impl Loader {
    /// `timeout` bounds each network fetch end to end.
    pub fn new(timeout: Duration) -> Result<Self, DiffError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiffError::load("http client", e))?;
        Ok(Self { client })
    }

    pub async fn load(&self, reference: &ImageRef) -> Result<RgbaImage, DiffError> {
        let t0 = Instant::now();
        let bytes = self.fetch(reference).await?;
        debug!(
            reference = %reference,
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "fetched"
        );

        let t1 = Instant::now();
        let image = tokio::task::spawn_blocking(move || decode(&bytes))
            .await
            .map_err(|e| DiffError::Task(e.to_string()))?
            .map_err(|e| DiffError::load(reference, e))?;
        debug!(
            reference = %reference,
            width = image.width(),
            height = image.height(),
            elapsed_ms = t1.elapsed().as_millis() as u64,
            "decoded"
        );
        Ok(image)
    }

    async fn fetch(&self, reference: &ImageRef) -> Result<Vec<u8>, DiffError> {
        match reference {
            ImageRef::Url(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| DiffError::load(reference, e))?;
                let body = response.bytes().await.map_err(|e| DiffError::load(reference, e))?;
                Ok(body.to_vec())
            }
            ImageRef::Data(data) => {
                decode_data_url(data).map_err(|e| DiffError::load(reference, e))
            }
            ImageRef::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| DiffError::load(reference, e)),
        }
    }
}

/// Decode PNG/JPEG/WebP (anything the `image` crate sniffs) into RGBA.
/// Formats without alpha come out fully opaque.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, image::ImageError> {
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Payload bytes of a base64 `data:` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    let rest = url
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("data:"))
        .map(|_| &url[5..])
        .ok_or_else(|| "not a data URL".to_string())?;
    let (meta, payload) = rest.split_once(',').ok_or("data URL has no payload separator")?;
    if !meta.ends_with(";base64") {
        return Err(format!("unsupported data URL encoding '{meta}' (expected base64)"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("invalid base64 payload: {e}"))
}
