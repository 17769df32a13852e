//! Web page fetching and main-content extraction

use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};

/// Elements removed before looking for the main content
const BOILERPLATE_SELECTOR: &str = "nav, header, footer, aside, .sidebar, .menu, .navigation, \
     .advertisement, .ads, .ad, script, style, noscript, .footer, .header, .nav, #nav, #header, \
     #footer, #sidebar, .social, .share, .comments, .related, .recommended";

/// Candidates for the main content, in order of preference
const MAIN_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=main]",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".content",
    "#content",
    "#mw-content-text",
    ".mw-parser-output",
];

/// A candidate must carry more text than this to be chosen
const MIN_MAIN_TEXT_CHARS: usize = 200;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; Escruta/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Content extracted from a web page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebContent {
    pub title: String,
    /// Whitespace-normalized text of the main element
    pub text: String,
    /// Inner HTML of the main element
    pub html: String,
}

/// Downloads pages and reduces them to their main content
#[derive(Debug, Clone)]
pub struct WebFetcher {
    client: reqwest::Client,
}

impl WebFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<WebContent> {
        tracing::debug!(url = %url, "Fetching web page");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Ingestion(format!(
                "Failed to fetch content from URL: {} (HTTP {})",
                url,
                status.as_u16()
            )));
        }

        let body = response.text().await?;
        Ok(parse_page(url, &body))
    }
}

/// Extract title and main content from a downloaded page
pub fn parse_page(url: &str, body: &str) -> WebContent {
    let mut document = Html::parse_document(body);
    let title = page_title(&document, url);

    strip_boilerplate(&mut document);

    let (text, html) = match main_element(&document) {
        Some(main) => (normalized_text(main), main.inner_html()),
        None => (String::new(), String::new()),
    };

    WebContent { title, text, html }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!(selector = css, "Invalid CSS selector: {}", e);
            None
        }
    }
}

/// `<title>`, then `og:title`, then a name derived from the URL
fn page_title(document: &Html, url: &str) -> String {
    let from_title = selector("title")
        .and_then(|s| document.select(&s).next().map(normalized_text))
        .filter(|t| !t.is_empty());

    let from_og = || {
        selector("meta[property=\"og:title\"]")
            .and_then(|s| document.select(&s).next())
            .and_then(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|t| !t.is_empty())
    };

    from_title
        .or_else(from_og)
        .unwrap_or_else(|| default_title(url))
}

/// Title used when a page does not name itself
pub fn default_title(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .map(|host| {
            let domain = host.strip_prefix("www.").unwrap_or(&host);
            format!("Content from {}", domain)
        })
        .unwrap_or_else(|| "Untitled Web Content".to_string())
}

fn strip_boilerplate(document: &mut Html) {
    let Some(boilerplate) = selector(BOILERPLATE_SELECTOR) else {
        return;
    };

    let ids: Vec<_> = document.select(&boilerplate).map(|e| e.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn main_element(document: &Html) -> Option<ElementRef<'_>> {
    for css in MAIN_SELECTORS {
        let Some(candidate) = selector(css) else {
            continue;
        };
        if let Some(element) = document.select(&candidate).next() {
            if normalized_text(element).chars().count() > MIN_MAIN_TEXT_CHARS {
                return Some(element);
            }
        }
    }

    selector("body").and_then(|body| document.select(&body).next())
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn long_text(word: &str) -> String {
        std::iter::repeat(word).take(60).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_prefers_article_with_enough_text() {
        let body = format!(
            "<html><head><title> My  Page </title></head><body>\
             <nav>Home About</nav><div class=\"content\">short</div>\
             <article><p>{}</p></article><footer>Copyright</footer></body></html>",
            long_text("ferris")
        );

        let page = parse_page("https://example.com/post", &body);
        assert_eq!(page.title, "My Page");
        assert!(page.text.starts_with("ferris ferris"));
        assert!(page.html.starts_with("<p>"));
        assert!(!page.text.contains("Home"));
    }

    #[test]
    fn test_short_candidates_fall_back_to_body() {
        let body = "<html><body><article>tiny</article><p>rest of page</p>\
                    <script>var x = 1;</script></body></html>";

        let page = parse_page("https://example.com", body);
        assert_eq!(page.text, "tiny rest of page");
    }

    #[test]
    fn test_og_title_fallback() {
        let body = r#"<html><head><meta property="og:title" content="Open Graph"></head>
                      <body><p>x</p></body></html>"#;
        assert_eq!(parse_page("https://example.com", body).title, "Open Graph");
    }

    #[test]
    fn test_default_titles() {
        assert_eq!(
            default_title("https://www.rust-lang.org/learn"),
            "Content from rust-lang.org"
        );
        assert_eq!(default_title("not a url"), "Untitled Web Content");

        let page = parse_page("https://docs.rs/", "<html><body><p>x</p></body></html>");
        assert_eq!(page.title, "Content from docs.rs");
    }
}
