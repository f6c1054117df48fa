//! Remote font fetching, the session font cache, and inlining into SVG.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::{Captures, Regex};

use crate::perf;
use crate::state::HandFont;

/// Per-request timeout for font downloads during export.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout when warming the cache before a render.
pub const PRELOAD_TIMEOUT: Duration = Duration::from_secs(3);
/// How long a failed download is remembered before it is tried again.
pub const FAILURE_RETRY_AFTER: Duration = Duration::from_secs(60);
/// Largest font file accepted.
pub const MAX_FONT_BYTES: u64 = 8 * 1024 * 1024;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(<style\b[^>]*>)(.*?)(</style>)").unwrap());
static REMOTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?(https?://[^'")\s]+)['"]?\s*\)"#).unwrap()
});

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request for {url} failed: {message}")]
    Http { url: String, message: String },
    #[error("unsupported font url: {0}")]
    Unsupported(String),
}

/// Source of font bytes.
pub trait FontFetcher: Send + Sync {
    /// Download the file at `url`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the file cannot be retrieved.
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher over HTTPS with `ureq`; each fetch gets an agent with its own
/// timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFontFetcher;

impl FontFetcher for HttpFontFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(FetchError::Unsupported(url.to_string()));
        }
        let http = |err: ureq::Error| FetchError::Http {
            url: url.to_string(),
            message: err.to_string(),
        };
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        let mut response = agent
            .get(url)
            .header("User-Agent", concat!("mermaidpad/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(http)?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_FONT_BYTES)
            .read_to_vec()
            .map_err(http)
    }
}

/// A downloaded font file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFile {
    pub url: String,
    pub mime: &'static str,
    pub bytes: Arc<[u8]>,
}

impl FontFile {
    pub fn new(url: &str, bytes: Vec<u8>) -> Self {
        Self {
            url: url.to_string(),
            mime: mime_for(url),
            bytes: bytes.into(),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// CSS `format()` hint matching the mime type.
    pub const fn css_format(&self) -> &'static str {
        match self.mime.as_bytes() {
            b"font/woff2" => "woff2",
            b"font/woff" => "woff",
            _ => "truetype",
        }
    }

    /// Whether the raster font database can load this file directly.
    pub fn is_sfnt(&self) -> bool {
        matches!(self.bytes.get(..4), Some(b"\0\x01\0\0" | b"OTTO" | b"true"))
    }
}

/// Mime type guessed from the file extension, ignoring query and fragment.
pub fn mime_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".woff2") {
        "font/woff2"
    } else if lower.ends_with(".woff") {
        "font/woff"
    } else if lower.ends_with(".ttf") {
        "font/ttf"
    } else {
        "font/truetype"
    }
}

enum Entry {
    Ready(Arc<FontFile>),
    Failed(Instant),
    Fetching,
}

/// Font files fetched during this session, keyed by URL.
///
/// Successful downloads are kept for the whole session. A failed download is
/// remembered for [`FAILURE_RETRY_AFTER`], so an unreachable host costs one
/// timeout rather than one per render. The lock is never held while fetching.
pub struct FontCache {
    fetcher: Box<dyn FontFetcher>,
    entries: Mutex<HashMap<String, Entry>>,
    settled: Condvar,
}

impl FontCache {
    pub fn new(fetcher: impl FontFetcher + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            entries: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
        }
    }

    pub fn http() -> Self {
        Self::new(HttpFontFetcher)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached file for `url`, fetching it on first use.
    ///
    /// Waits for a download of the same URL already in flight.
    pub fn get(&self, url: &str) -> Option<Arc<FontFile>> {
        self.lookup(url, FETCH_TIMEOUT, true)
    }

    /// Cached file for `url` without fetching.
    pub fn cached(&self, url: &str) -> Option<Arc<FontFile>> {
        match self.lock().get(url) {
            Some(Entry::Ready(file)) => Some(Arc::clone(file)),
            _ => None,
        }
    }

    /// Warm the cache for a hand-drawn preset. Returns `true` if it is cached.
    ///
    /// Uses [`PRELOAD_TIMEOUT`] and does not wait for a download already in
    /// flight.
    pub fn preload(&self, font: HandFont) -> bool {
        font.download_url()
            .is_some_and(|url| self.lookup(url, PRELOAD_TIMEOUT, false).is_some())
    }

    fn lookup(&self, url: &str, timeout: Duration, wait: bool) -> Option<Arc<FontFile>> {
        let mut entries = self.lock();
        loop {
            let in_flight = match entries.get(url) {
                Some(Entry::Ready(file)) => return Some(Arc::clone(file)),
                Some(Entry::Failed(at)) if at.elapsed() < FAILURE_RETRY_AFTER => return None,
                Some(Entry::Fetching) => true,
                Some(Entry::Failed(_)) | None => false,
            };
            if !in_flight {
                break;
            }
            if !wait {
                return None;
            }
            entries = self
                .settled
                .wait(entries)
                .unwrap_or_else(PoisonError::into_inner);
        }
        entries.insert(url.to_string(), Entry::Fetching);
        drop(entries);

        let fetched = {
            let _scope = perf::scope("fonts.fetch");
            self.fetcher.fetch(url, timeout)
        };
        let (entry, file) = match fetched {
            Ok(bytes) => {
                tracing::debug!(url, bytes = bytes.len(), "font cached");
                perf::log_event("fonts.fetch", format!("ok {url} {} bytes", bytes.len()));
                let file = Arc::new(FontFile::new(url, bytes));
                (Entry::Ready(Arc::clone(&file)), Some(file))
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "font fetch failed");
                perf::log_event("fonts.fetch", format!("failed {url}: {err}"));
                (Entry::Failed(Instant::now()), None)
            }
        };
        self.lock().insert(url.to_string(), entry);
        self.settled.notify_all();
        file
    }

    /// Every successfully downloaded file.
    pub fn files(&self) -> Vec<Arc<FontFile>> {
        self.lock()
            .values()
            .filter_map(|entry| match entry {
                Entry::Ready(file) => Some(Arc::clone(file)),
                _ => None,
            })
            .collect()
    }

    /// Number of successfully downloaded files.
    pub fn len(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for FontCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontCache")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

/// The `@font-face` rule for a hand-drawn preset, if its file can be had.
pub fn hand_font_face(font: HandFont, cache: &FontCache) -> Option<String> {
    let file = cache.get(font.download_url()?)?;
    Some(format!(
        "@font-face {{ font-family: '{}'; src: url('{}') format('{}'); font-display: swap; }}",
        font.family(),
        file.data_uri(),
        file.css_format()
    ))
}

/// Rewrite remote `url(...)` references inside `<style>` blocks to data URIs.
///
/// References that cannot be fetched are removed. With `hand_font`, an
/// `@font-face` rule for the preset is injected at the top of the document.
pub fn inline_fonts(svg: &str, cache: &FontCache, hand_font: Option<HandFont>) -> String {
    let rewritten = STYLE_BLOCK.replace_all(svg, |caps: &Captures<'_>| {
        let body = REMOTE_URL.replace_all(&caps[2], |url: &Captures<'_>| {
            cache
                .get(&url[1])
                .map(|file| format!("url('{}')", file.data_uri()))
                .unwrap_or_default()
        });
        format!("{}{body}{}", &caps[1], &caps[3])
    });

    let Some(rule) = hand_font.and_then(|font| hand_font_face(font, cache)) else {
        return rewritten.into_owned();
    };
    insert_after_root_open(&rewritten, &format!("<style>{rule}</style>"))
}

/// Insert `fragment` as the first child of the root `<svg>` element.
pub(crate) fn insert_after_root_open(svg: &str, fragment: &str) -> String {
    let Some(start) = svg.find("<svg") else {
        return svg.to_string();
    };
    let Some(end) = svg[start..].find('>').map(|i| start + i) else {
        return svg.to_string();
    };
    // Self-closing root: expand it so the fragment has somewhere to go.
    if svg[..end].ends_with('/') {
        return format!("{}>{fragment}</svg>{}", &svg[..end - 1], &svg[end + 1..]);
    }
    format!("{}{fragment}{}", &svg[..=end], &svg[end + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl FontFetcher for CountingFetcher {
        fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Http {
                    url: url.to_string(),
                    message: "offline".into(),
                });
            }
            Ok(b"wOF2fake".to_vec())
        }
    }

    fn cache(fail: bool) -> (FontCache, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CountingFetcher {
            calls: Arc::clone(&calls),
            fail,
        };
        (FontCache::new(fetcher), calls)
    }

    #[test]
    fn test_mime_by_extension() {
        assert_eq!(mime_for("https://x/a.woff2"), "font/woff2");
        assert_eq!(mime_for("https://x/a.WOFF?v=2"), "font/woff");
        assert_eq!(mime_for("https://x/a.ttf#frag"), "font/ttf");
        assert_eq!(mime_for("https://x/a.otf"), "font/truetype");
    }

    #[test]
    fn test_successful_fetch_happens_once() {
        let (cache, calls) = cache(false);
        assert!(cache.get("https://x/a.woff2").is_some());
        assert!(cache.get("https://x/a.woff2").is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_are_remembered() {
        let (cache, calls) = cache(true);
        assert!(cache.get("https://x/a.woff2").is_none());
        assert!(cache.get("https://x/a.woff2").is_none());
        assert!(!cache.preload(HandFont::Virgil));
        assert!(!cache.preload(HandFont::Virgil));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        assert!(cache.files().is_empty());
    }

    struct SlowFailingFetcher {
        calls: Arc<AtomicUsize>,
        timeouts: Arc<Mutex<Vec<Duration>>>,
    }

    impl FontFetcher for SlowFailingFetcher {
        fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.timeouts.lock().unwrap().push(timeout);
            std::thread::sleep(Duration::from_millis(200));
            Err(FetchError::Http {
                url: url.to_string(),
                message: "timed out".into(),
            })
        }
    }

    #[test]
    fn test_unreachable_host_costs_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let timeouts = Arc::new(Mutex::new(Vec::new()));
        let cache = FontCache::new(SlowFailingFetcher {
            calls: Arc::clone(&calls),
            timeouts: Arc::clone(&timeouts),
        });

        assert!(!cache.preload(HandFont::Virgil));
        let started = Instant::now();
        for _ in 0..3 {
            assert!(!cache.preload(HandFont::Virgil));
        }
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(timeouts.lock().unwrap().as_slice(), &[PRELOAD_TIMEOUT]);
    }

    #[test]
    fn test_lock_is_free_during_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(FontCache::new(SlowFailingFetcher {
            calls: Arc::clone(&calls),
            timeouts: Arc::new(Mutex::new(Vec::new())),
        }));
        let worker = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get("https://x/slow.woff2"))
        };
        while calls.load(Ordering::SeqCst) == 0 {
            std::thread::yield_now();
        }

        let started = Instant::now();
        assert!(cache.cached("https://x/slow.woff2").is_none());
        assert!(cache.is_empty());
        // A preload for the same URL does not queue behind the download.
        assert!(cache.lookup("https://x/slow.woff2", PRELOAD_TIMEOUT, false).is_none());
        assert!(started.elapsed() < Duration::from_millis(100));

        assert!(worker.join().unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preload_only_for_downloadable_presets() {
        let (cache, calls) = cache(false);
        assert!(cache.preload(HandFont::Virgil));
        assert!(!cache.preload(HandFont::Kalam));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_inline_rewrites_style_urls() {
        let (cache, _) = cache(false);
        let svg = r#"<svg><style>@font-face{src:url("https://x/a.woff2")}</style><g/></svg>"#;
        let out = inline_fonts(svg, &cache, None);
        assert!(out.contains("url('data:font/woff2;base64,"));
        assert!(!out.contains("https://x/a.woff2"));
    }

    #[test]
    fn test_inline_drops_unreachable_urls() {
        let (cache, _) = cache(true);
        let svg = "<svg><style>@import url(https://x/f.css);</style></svg>";
        assert_eq!(
            inline_fonts(svg, &cache, Some(HandFont::Virgil)),
            "<svg><style>@import ;</style></svg>"
        );
    }

    #[test]
    fn test_hand_font_rule_injected_first() {
        let (cache, _) = cache(false);
        let out = inline_fonts(r#"<svg id="d"><g/></svg>"#, &cache, Some(HandFont::Virgil));
        assert!(out.starts_with(r#"<svg id="d"><style>@font-face { font-family: 'Virgil';"#));
        assert!(out.contains("format('woff2')"));
        assert!(out.ends_with("<g/></svg>"));
    }

    #[test]
    fn test_insert_into_self_closing_root() {
        assert_eq!(
            insert_after_root_open("<svg width=\"1\"/>", "<style/>"),
            "<svg width=\"1\"><style/></svg>"
        );
    }

    #[test]
    fn test_sfnt_detection() {
        let ttf = FontFile::new("https://x/a.ttf", vec![0, 1, 0, 0, 9]);
        let woff2 = FontFile::new("https://x/a.woff2", b"wOF2....".to_vec());
        assert!(ttf.is_sfnt());
        assert!(!woff2.is_sfnt());
    }
}
