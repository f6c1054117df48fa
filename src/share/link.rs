//! Share links, embed snippets and the startup source precedence.

use url::Url;

use super::codec::{self, CodecError};
use crate::samples::DEFAULT_SOURCE;

/// Hosted editor page that understands share tokens.
pub const DEFAULT_BASE_URL: &str = "https://caoergou.github.io/mermaid-pic/";

/// Query parameter carrying a source at startup.
pub const CODE_PARAM: &str = "code";

const EMBED_PAGE: &str = "embed.html";

/// Parse the configured base URL, falling back to [`DEFAULT_BASE_URL`].
///
/// # Errors
///
/// Returns an error if `base` is not an absolute URL.
pub fn base_url(base: Option<&str>) -> Result<Url, url::ParseError> {
    Url::parse(base.unwrap_or(DEFAULT_BASE_URL))
}

/// Link that opens `source` in the editor; the token travels in the fragment.
///
/// Any `code` query parameter is dropped, since it would win over the
/// fragment when the link is opened.
pub fn share_url(base: &Url, source: &str) -> Url {
    let mut url = base.clone();
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != CODE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.set_fragment(Some(&codec::encode(source)));
    url
}

/// Link with the source as uncompressed base64 in `?code=`.
pub fn query_url(base: &Url, source: &str) -> Url {
    let mut url = base.clone();
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair(CODE_PARAM, &codec::encode_plain(source));
    url
}

/// URL of the read-only embed page for `source`, next to the editor page.
///
/// # Errors
///
/// Returns an error if `base` cannot be a base URL (e.g. `data:`).
pub fn embed_url(base: &Url, source: &str) -> Result<Url, url::ParseError> {
    let mut url = base.join(EMBED_PAGE)?;
    url.set_query(None);
    url.set_fragment(Some(&codec::encode(source)));
    Ok(url)
}

/// HTML snippet embedding the diagram with an iframe.
pub fn embed_snippet(embed_url: &Url) -> String {
    format!(
        "<iframe src=\"{embed_url}\" width=\"100%\" height=\"600\" frameborder=\"0\" \
         style=\"border: none;\" title=\"Mermaid Diagram\"></iframe>"
    )
}

/// Instructions for an AI assistant on how to produce links to this editor,
/// ending with a link to `source`.
pub fn ai_prompt(base: &Url, source: &str) -> String {
    let mut template = base.clone();
    template.set_query(None);
    template.set_fragment(None);
    let link = query_url(base, source);
    [
        "You can use Mermaid Editor to render diagrams.".to_string(),
        "When the user needs a diagram, generate Mermaid code and construct a shareable link:"
            .to_string(),
        format!("  {template}?code={{base64(mermaid_code)}}"),
        String::new(),
        "Example (JavaScript): btoa(unescape(encodeURIComponent(code)))".to_string(),
        "Example (Python): base64.b64encode(code.encode()).decode()".to_string(),
        String::new(),
        "Supported diagram types:".to_string(),
        "  graph, flowchart, sequenceDiagram, classDiagram,".to_string(),
        "  stateDiagram-v2, erDiagram, gantt, pie, mindmap".to_string(),
        String::new(),
        format!("Current diagram link: {link}"),
    ]
    .join("\n")
}

/// Where the startup source came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Query,
    Fragment,
    Persisted,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialSource {
    pub text: String,
    pub origin: SourceOrigin,
}

impl InitialSource {
    /// Pick the startup source: `?code=` beats the fragment, which beats the
    /// persisted source, which beats the built-in default. Candidates that do
    /// not decode, or decode to nothing, are skipped.
    pub fn resolve(url: Option<&Url>, persisted: Option<&str>) -> Self {
        if let Some(url) = url {
            if let Some(text) = query_source(url) {
                return Self {
                    text,
                    origin: SourceOrigin::Query,
                };
            }
            if let Some(text) = fragment_source(url) {
                return Self {
                    text,
                    origin: SourceOrigin::Fragment,
                };
            }
        }
        if let Some(text) = persisted.filter(|text| !text.is_empty()) {
            return Self {
                text: text.to_string(),
                origin: SourceOrigin::Persisted,
            };
        }
        Self {
            text: DEFAULT_SOURCE.to_string(),
            origin: SourceOrigin::Default,
        }
    }
}

fn query_source(url: &Url) -> Option<String> {
    let (_, token) = url.query_pairs().find(|(key, _)| key == CODE_PARAM)?;
    decode_candidate(&token, "query")
}

fn fragment_source(url: &Url) -> Option<String> {
    decode_candidate(url.fragment()?, "fragment")
}

fn decode_candidate(token: &str, place: &str) -> Option<String> {
    match codec::decode(token) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(place, error = %err, "ignoring undecodable share token");
            None
        }
    }
}

/// Extract the diagram source from a pasted link or a bare token.
///
/// # Errors
///
/// Returns [`CodecError`] if the input carries no decodable source.
pub fn source_from_link(input: &str) -> Result<String, CodecError> {
    let input = input.trim();
    if let Ok(url) = Url::parse(input)
        && matches!(url.scheme(), "http" | "https" | "file")
    {
        if let Some(text) = query_source(&url) {
            return Ok(text);
        }
        return codec::decode(url.fragment().unwrap_or_default());
    }
    codec::decode(input.trim_start_matches('#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/pad/index.html").unwrap()
    }

    #[test]
    fn test_share_url_round_trips_through_resolve() {
        let url = share_url(&base(), "graph TD\nA-->B");
        let initial = InitialSource::resolve(Some(&url), None);
        assert_eq!(initial.origin, SourceOrigin::Fragment);
        assert_eq!(initial.text, "graph TD\nA-->B");
    }

    #[test]
    fn test_share_url_drops_stale_code_param() {
        let base = Url::parse("https://example.com/pad/?lang=zh&code=Zm9v").unwrap();
        let url = share_url(&base, "pie");
        assert_eq!(url.query(), Some("lang=zh"));
        assert_eq!(InitialSource::resolve(Some(&url), None).text, "pie");
    }

    #[test]
    fn test_query_wins_over_fragment() {
        let mut url = query_url(&base(), "from query");
        url.set_fragment(Some(&codec::encode("from fragment")));
        let initial = InitialSource::resolve(Some(&url), Some("persisted"));
        assert_eq!(initial.origin, SourceOrigin::Query);
        assert_eq!(initial.text, "from query");
    }

    #[test]
    fn test_undecodable_candidates_fall_through() {
        let url = Url::parse("https://example.com/?code=!!!#@@@").unwrap();
        let initial = InitialSource::resolve(Some(&url), Some("saved"));
        assert_eq!(initial.origin, SourceOrigin::Persisted);
        assert_eq!(initial.text, "saved");
    }

    #[test]
    fn test_default_when_nothing_else() {
        let initial = InitialSource::resolve(None, Some(""));
        assert_eq!(initial.origin, SourceOrigin::Default);
        assert_eq!(initial.text, DEFAULT_SOURCE);
    }

    #[test]
    fn test_embed_url_sits_next_to_page() {
        let url = embed_url(&base(), "graph LR\nA-->B").unwrap();
        assert_eq!(url.path(), "/pad/embed.html");
        assert_eq!(
            codec::decode(url.fragment().unwrap()).unwrap(),
            "graph LR\nA-->B"
        );
    }

    #[test]
    fn test_embed_snippet_shape() {
        let url = embed_url(&base(), "pie").unwrap();
        let snippet = embed_snippet(&url);
        assert!(snippet.starts_with("<iframe src=\"https://example.com/pad/embed.html#"));
        assert!(snippet.contains("width=\"100%\" height=\"600\""));
        assert!(snippet.ends_with("title=\"Mermaid Diagram\"></iframe>"));
    }

    #[test]
    fn test_ai_prompt_link_decodes() {
        let prompt = ai_prompt(&base(), "graph TD\nA-->B");
        let link = prompt
            .lines()
            .last()
            .and_then(|line| line.strip_prefix("Current diagram link: "))
            .unwrap();
        assert_eq!(source_from_link(link).unwrap(), "graph TD\nA-->B");
        assert!(prompt.contains("https://example.com/pad/index.html?code={base64(mermaid_code)}"));
    }

    #[test]
    fn test_source_from_bare_token() {
        let token = codec::encode("gantt\ntitle x");
        assert_eq!(source_from_link(&format!("#{token}")).unwrap(), "gantt\ntitle x");
        assert!(source_from_link("https://example.com/").is_err());
    }
}
