//! Image URL filter
//!
//! Decides whether an extracted URL is worth keeping: absolute http(s),
//! a raster extension in the path or query, and nothing from the
//! low-value block list (logos, icons, ad and tracking hosts).
//!
//! Block terms are plain substrings of the whole URL, host included.
//! Advertising is matched per word instead (`ad`, `ads`, `advert*`,
//! `adimage*`), since a bare `ad` substring hits `uploads` and `headshot`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Raster formats the pipeline keeps
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Substrings that mark decoration rather than a portrait
pub const BLOCK_TERMS: &[&str] = &[
    "logo", "icon", "banner", "button", "sprite", "spacer", "pixel",
];

/// Whole URL words that mark advertising (`/ad/`, `ads.example.com`)
pub const BLOCK_TOKENS: &[&str] = &["ad", "ads"];

/// Word prefixes that mark advertising (`advertisement`, `adimages`)
pub const BLOCK_TOKEN_PREFIXES: &[&str] = &[
    "advert", "adimage", "adserv", "adclick", "adbanner", "adsystem",
];

/// Hosts that serve tracking beacons, search-engine chrome or ads
pub const BLOCKED_HOSTS: &[&str] = &[
    "doubleclick.net",
    "googlesyndication.com",
    "googleadservices.com",
    "google-analytics.com",
    "googletagmanager.com",
    "gstatic.com",
    "google.",
    "scorecardresearch.com",
    "facebook.com",
    "bat.bing.com",
];

static EXTENSION_IN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|gif|webp)(?:[/?&#=]|$)").expect("valid regex")
});
static EXTENSION_IN_QUERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|&)(?:format|fm|ext|type)=(jpe?g|png|gif|webp)(?:&|$)").expect("valid regex")
});
static TOKEN_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Why a URL was turned down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotHttp,
    NoImageExtension,
    Blocked(&'static str),
    WrongHost,
    Placeholder(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotHttp => f.write_str("not an absolute http(s) URL"),
            Rejection::NoImageExtension => f.write_str("no raster image extension"),
            Rejection::Blocked(term) => write!(f, "matches block term '{}'", term),
            Rejection::WrongHost => f.write_str("unexpected host"),
            Rejection::Placeholder(marker) => write!(f, "placeholder marker '{}'", marker),
        }
    }
}

/// Filter applied to every URL a rule extracts
///
/// The block list always applies. Platform adapters narrow it further
/// with a required host and placeholder markers.
#[derive(Debug, Clone, Copy)]
pub struct ImageFilter {
    required_host: Option<&'static str>,
    placeholder_markers: &'static [&'static str],
    require_extension: bool,
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::strict()
    }
}

impl ImageFilter {
    /// Block list plus a mandatory raster extension
    pub const fn strict() -> Self {
        Self {
            required_host: None,
            placeholder_markers: &[],
            require_extension: true,
        }
    }

    /// Restrict to hosts ending in `host` (e.g. `twimg.com`)
    pub const fn on_host(mut self, host: &'static str) -> Self {
        self.required_host = Some(host);
        self
    }

    /// Reject URLs containing any of `markers` (default avatars)
    pub const fn rejecting(mut self, markers: &'static [&'static str]) -> Self {
        self.placeholder_markers = markers;
        self
    }

    /// Skip the extension requirement; content type is confirmed later
    pub const fn extension_optional(mut self) -> Self {
        self.require_extension = false;
        self
    }

    /// Check `url`, reporting the first reason to reject it
    pub fn check(&self, url: &str) -> Result<(), Rejection> {
        let parsed = Url::parse(url).map_err(|_| Rejection::NotHttp)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Rejection::NotHttp);
        }
        let host = parsed.host_str().ok_or(Rejection::NotHttp)?.to_ascii_lowercase();

        if let Some(required) = self.required_host
            && host != required
            && !host.ends_with(&format!(".{}", required))
        {
            return Err(Rejection::WrongHost);
        }

        if let Some(blocked) = BLOCKED_HOSTS.iter().copied().find(|h| host.contains(h)) {
            return Err(Rejection::Blocked(blocked));
        }

        let lower = url.to_ascii_lowercase();

        if let Some(marker) = self
            .placeholder_markers
            .iter()
            .copied()
            .find(|m| lower.contains(m))
        {
            return Err(Rejection::Placeholder(marker));
        }

        if let Some(term) = BLOCK_TERMS.iter().copied().find(|t| lower.contains(t)) {
            return Err(Rejection::Blocked(term));
        }

        if let Some(token) = TOKEN_SPLIT.split(&lower).find_map(advertising_token) {
            return Err(Rejection::Blocked(token));
        }

        if self.require_extension && image_extension(url).is_none() {
            return Err(Rejection::NoImageExtension);
        }

        Ok(())
    }

    pub fn accepts(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }
}

fn advertising_token(word: &str) -> Option<&'static str> {
    BLOCK_TOKENS
        .iter()
        .copied()
        .find(|t| *t == word)
        .or_else(|| BLOCK_TOKEN_PREFIXES.iter().copied().find(|p| word.starts_with(p)))
}

/// Absolute http(s), raster extension, not block-listed
///
/// # Example
/// ```
/// use portrait_core::parser::is_well_formed_image_url;
/// assert!(is_well_formed_image_url("https://cdn.example.com/people/jane.jpg"));
/// assert!(!is_well_formed_image_url("https://cdn.example.com/site-logo.png"));
/// assert!(!is_well_formed_image_url("https://cdn.example.com/people/jane"));
/// ```
pub fn is_well_formed_image_url(url: &str) -> bool {
    ImageFilter::strict().accepts(url)
}

/// Normalized extension (`jpeg` → `jpg`) found in the URL path or query
pub fn image_extension(url: &str) -> Option<&'static str> {
    let parsed = Url::parse(url).ok()?;

    let from_path = EXTENSION_IN_PATH
        .captures(parsed.path())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());
    let from_query = || {
        let query = parsed.query()?;
        EXTENSION_IN_QUERY
            .captures(query)
            .or_else(|| EXTENSION_IN_PATH.captures(query))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
    };

    match from_path.or_else(from_query)?.as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        _ => None,
    }
}
