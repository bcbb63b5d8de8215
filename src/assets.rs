//! Best-effort acquisition of branding images (logo and letterhead).
//!
//! Fetching never fails from the caller's point of view: every [`AssetSource`] returns an
//! [`Asset`], which is either the image bytes or an explicit [`Asset::Unavailable`] marker with
//! the reason. The renderer draws what is available and leaves out the rest.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;

/// Default time limit for a remote fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const DRIVE_FILE_MARKER: &str = "/file/d/";
const DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc?export=download&id=";

/// Result of trying to obtain an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Asset {
    /// Raw (still encoded) image bytes.
    Available(Vec<u8>),
    /// The image could not be obtained.
    Unavailable { reason: String },
}

impl Asset {
    /// Marker for an asset that was never configured.
    pub fn not_configured() -> Self {
        Self::Unavailable {
            reason: "not configured".to_owned(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns the image bytes when available.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Available(bytes) => Some(bytes),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

/// The optional images placed on every payslip of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrandingAssets {
    pub logo: Asset,
    pub letterhead: Asset,
}

impl BrandingAssets {
    /// No logo and no letterhead.
    pub fn none() -> Self {
        Self {
            logo: Asset::not_configured(),
            letterhead: Asset::not_configured(),
        }
    }

    pub fn with_logo(mut self, logo: Asset) -> Self {
        self.logo = logo;
        self
    }

    pub fn with_letterhead(mut self, letterhead: Asset) -> Self {
        self.letterhead = letterhead;
        self
    }
}

impl Default for BrandingAssets {
    fn default() -> Self {
        Self::none()
    }
}

/// Capability to turn a location (URL, path, ...) into image bytes.
pub trait AssetSource {
    /// Fetches the asset at `location`. Failures are reported through [`Asset::Unavailable`].
    fn fetch(&self, location: &str) -> Asset;
}

impl<T: AssetSource + ?Sized> AssetSource for Box<T> {
    fn fetch(&self, location: &str) -> Asset {
        (**self).fetch(location)
    }
}

/// Rewrites a Google Drive sharing link (`.../file/d/<id>/view`) to its direct download URL.
///
/// Other URLs are returned unchanged.
pub fn direct_download_url(url: &str) -> String {
    url.split_once(DRIVE_FILE_MARKER)
        .and_then(|(_, rest)| rest.split('/').next())
        .filter(|id| !id.is_empty() && url.contains("drive.google.com"))
        .map(|id| format!("{}{}", DRIVE_DOWNLOAD_URL, id))
        .unwrap_or_else(|| url.to_owned())
}

/// Fetches images over HTTP(S) with a bounded timeout.
pub struct HttpAssetSource {
    timeout: Duration,
}

impl HttpAssetSource {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn try_fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|err| format!("failed to build HTTP client: {err}"))?;

        let response = client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| format!("request failed: {err}"))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        if !content_type.starts_with("image") {
            return Err(format!("unexpected content type '{content_type}'"));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| format!("failed to read body: {err}"))
    }
}

impl Default for HttpAssetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetSource for HttpAssetSource {
    fn fetch(&self, location: &str) -> Asset {
        let url = direct_download_url(location);
        debug!("fetching asset from {url}");
        match self.try_fetch(&url) {
            Ok(bytes) => Asset::Available(bytes),
            Err(reason) => {
                warn!("asset at {location} unavailable: {reason}");
                Asset::Unavailable { reason }
            }
        }
    }
}

/// Reads images from the local filesystem.
#[derive(Clone, Debug, Default)]
pub struct FileAssetSource;

impl AssetSource for FileAssetSource {
    fn fetch(&self, location: &str) -> Asset {
        let path = PathBuf::from(location);
        match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => {
                warn!("asset file {} is empty", path.display());
                Asset::unavailable(format!("{} is empty", path.display()))
            }
            Ok(bytes) => Asset::Available(bytes),
            Err(err) => {
                warn!("asset file {} unavailable: {err}", path.display());
                Asset::unavailable(format!("failed to read {}: {err}", path.display()))
            }
        }
    }
}

/// Dispatches `http://` and `https://` locations to HTTP and everything else to the filesystem.
pub struct LocationAssetSource {
    http: HttpAssetSource,
    file: FileAssetSource,
}

impl LocationAssetSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: HttpAssetSource::new().with_timeout(timeout),
            file: FileAssetSource,
        }
    }
}

impl AssetSource for LocationAssetSource {
    fn fetch(&self, location: &str) -> Asset {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            self.http.fetch(trimmed)
        } else {
            self.file.fetch(trimmed)
        }
    }
}

/// Tries each location in order and returns the first available asset.
///
/// With no locations the result is [`Asset::not_configured`]. When every attempt fails, the
/// reasons are joined into the final `Unavailable` marker.
pub fn first_available<S>(source: &S, locations: &[String]) -> Asset
where
    S: AssetSource + ?Sized,
{
    let mut reasons = Vec::new();
    for location in locations.iter().filter(|location| !location.trim().is_empty()) {
        match source.fetch(location) {
            Asset::Available(bytes) => return Asset::Available(bytes),
            Asset::Unavailable { reason } => reasons.push(format!("{location}: {reason}")),
        }
    }

    if reasons.is_empty() {
        Asset::not_configured()
    } else {
        Asset::Unavailable {
            reason: reasons.join("; "),
        }
    }
}
