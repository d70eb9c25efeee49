//! Extraction rule engine
//!
//! A [`RuleSet`] is an ordered list of [`ExtractionRule`]s plus an
//! [`ImageFilter`]. Rules are tried in priority order; every URL a rule
//! yields is decoded, resolved against the page URL, optionally rewritten
//! and then filtered. Profile adapters take the first survivor, search
//! adapters collect survivors up to their quota.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::debug;

use crate::parser::filter::ImageFilter;
use crate::url::resolve_url;

static RAW_IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>\\()]+?\.(?:jpe?g|png|gif|webp)(?:\?[^\s"'<>\\()]*)?"#)
        .expect("valid regex")
});

/// One way of pulling image URLs out of a page
#[derive(Debug, Clone)]
pub enum ExtractionRule {
    /// `<meta property|name="key" content="...">`, e.g. `og:image`
    MetaTag { key: &'static str },

    /// CSS selector; the first non-empty attribute in `attrs` wins
    Selector {
        css: &'static str,
        attrs: &'static [&'static str],
    },

    /// `image` fields in `<script type="application/ld+json">` blocks
    JsonLd,

    /// JSON object stored in an attribute, e.g. Bing's `a.iusc[m]`
    JsonAttribute {
        css: &'static str,
        attr: &'static str,
        field: &'static str,
        title_field: Option<&'static str>,
    },

    /// `"key":"<url>"` pairs anywhere in the raw page text
    JsonKey { key: &'static str },

    /// Any absolute image URL in the raw page text (inline scripts)
    RawUrls,
}

impl ExtractionRule {
    /// Name recorded as the candidate's discovery method
    pub fn method(&self) -> &'static str {
        match self {
            ExtractionRule::MetaTag { key } => *key,
            ExtractionRule::Selector { css, .. } => *css,
            ExtractionRule::JsonLd => "json-ld",
            ExtractionRule::JsonAttribute { field, .. } => *field,
            ExtractionRule::JsonKey { key } => *key,
            ExtractionRule::RawUrls => "raw-scan",
        }
    }

    /// Raw `(url, title)` pairs in document order, before filtering
    fn apply(&self, document: &Html, raw: &str) -> Vec<(String, Option<String>)> {
        match self {
            ExtractionRule::MetaTag { key } => {
                let css = format!(r#"meta[property="{0}"], meta[name="{0}"]"#, key);
                select_attr(document, &css, &["content"])
            }
            ExtractionRule::Selector { css, attrs } => select_attr(document, css, attrs),
            ExtractionRule::JsonLd => extract_json_ld(document),
            ExtractionRule::JsonAttribute {
                css,
                attr,
                field,
                title_field,
            } => extract_json_attribute(document, css, attr, field, *title_field),
            ExtractionRule::JsonKey { key } => extract_json_key(raw, key),
            ExtractionRule::RawUrls => {
                let text = unescape_script_text(raw);
                RAW_IMAGE_URL
                    .find_iter(&text)
                    .map(|m| (m.as_str().to_string(), None))
                    .collect()
            }
        }
    }
}

/// A URL that survived the rule set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub url: String,
    pub method: &'static str,
    pub title: Option<String>,
}

/// Ordered extraction rules sharing one filter
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ExtractionRule>,
    filter: ImageFilter,
    rewrite: Option<fn(&str) -> String>,
}

impl RuleSet {
    pub fn new(rules: Vec<ExtractionRule>, filter: ImageFilter) -> Self {
        Self {
            rules,
            filter,
            rewrite: None,
        }
    }

    /// Transform each URL before filtering (e.g. thumbnail → full size)
    pub fn with_rewrite(mut self, rewrite: fn(&str) -> String) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// First well-formed URL, trying rules in priority order
    pub fn first_match(&self, html: &str, page_url: &str) -> Option<Extracted> {
        self.collect(html, page_url, 1).into_iter().next()
    }

    /// Up to `limit` distinct well-formed URLs in rule-then-document order
    pub fn collect(&self, html: &str, page_url: &str, limit: usize) -> Vec<Extracted> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for rule in &self.rules {
            for (raw_url, title) in rule.apply(&document, html) {
                if out.len() >= limit {
                    return out;
                }

                let Some(url) = self.normalize(&raw_url, page_url) else {
                    continue;
                };

                if let Err(reason) = self.filter.check(&url) {
                    debug!(url = %url, rule = rule.method(), %reason, "rejected");
                    continue;
                }

                if seen.insert(url.clone()) {
                    out.push(Extracted {
                        url,
                        method: rule.method(),
                        title,
                    });
                }
            }
        }

        out
    }

    fn normalize(&self, raw_url: &str, page_url: &str) -> Option<String> {
        let decoded = decode_html_entities(&unescape_script_text(raw_url));
        let resolved = resolve_url(page_url, &decoded)?;
        Some(match self.rewrite {
            Some(rewrite) => rewrite(&resolved),
            None => resolved,
        })
    }
}

fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            debug!(css, error = ?e, "invalid selector");
            None
        }
    }
}

fn select_attr(document: &Html, css: &str, attrs: &[&str]) -> Vec<(String, Option<String>)> {
    let Some(selector) = parse_selector(css) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|el| {
            let url = attrs
                .iter()
                .filter_map(|a| el.value().attr(a))
                .map(str::trim)
                .find(|v| !v.is_empty())?;
            Some((url.to_string(), element_title(&el)))
        })
        .collect()
}

fn element_title(el: &ElementRef) -> Option<String> {
    el.value()
        .attr("alt")
        .or_else(|| el.value().attr("title"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_json_ld(document: &Html) -> Vec<(String, Option<String>)> {
    let Some(selector) = parse_selector(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for script in document.select(&selector) {
        let text: String = script.text().collect();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => collect_json_ld_images(&value, &mut out),
            Err(e) => debug!(error = %e, "skipping malformed JSON-LD block"),
        }
    }
    out
}

fn collect_json_ld_images(value: &Value, out: &mut Vec<(String, Option<String>)>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_json_ld_images(v, out)),
        Value::Object(map) => {
            let title = map.get("name").and_then(Value::as_str).map(str::to_string);
            if let Some(image) = map.get("image") {
                match image {
                    Value::String(url) => out.push((url.clone(), title.clone())),
                    Value::Array(images) => {
                        for img in images {
                            match img {
                                Value::String(url) => out.push((url.clone(), title.clone())),
                                other => collect_json_ld_images(other, out),
                            }
                        }
                    }
                    Value::Object(obj) => {
                        if let Some(url) = obj
                            .get("url")
                            .or_else(|| obj.get("contentUrl"))
                            .and_then(Value::as_str)
                        {
                            out.push((url.to_string(), title.clone()));
                        }
                    }
                    _ => {}
                }
            }
            for (key, nested) in map {
                if key != "image" && (nested.is_object() || nested.is_array()) {
                    collect_json_ld_images(nested, out);
                }
            }
        }
        _ => {}
    }
}

fn extract_json_attribute(
    document: &Html,
    css: &str,
    attr: &str,
    field: &str,
    title_field: Option<&str>,
) -> Vec<(String, Option<String>)> {
    let Some(selector) = parse_selector(css) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|el| {
            let payload = el.value().attr(attr)?;
            let value: Value = serde_json::from_str(payload).ok()?;
            let url = value.get(field)?.as_str()?.to_string();
            let title = title_field
                .and_then(|t| value.get(t))
                .and_then(Value::as_str)
                .map(str::to_string);
            Some((url, title))
        })
        .collect()
}

fn extract_json_key(raw: &str, key: &str) -> Vec<(String, Option<String>)> {
    let pattern = format!(r#""{}"\s*:\s*"([^"]+)""#, regex::escape(key));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    re.captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| (m.as_str().to_string(), None))
        .collect()
}

/// Undo the escaping search engines apply to URLs inside inline scripts
fn unescape_script_text(text: &str) -> String {
    text.replace("\\/", "/")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u003d", "=")
        .replace("\\u003D", "=")
        .replace("\\u0026", "&")
}

/// Decode the HTML entities that show up inside raw URLs
pub fn decode_html_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&#38;", "&")
        .replace("&quot;", "\"")
        .replace("&#x2F;", "/")
        .replace("&#47;", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://janedoe.dev/about/";

    fn profile_rules() -> RuleSet {
        RuleSet::new(
            vec![
                ExtractionRule::MetaTag { key: "og:image" },
                ExtractionRule::Selector {
                    css: "img.avatar",
                    attrs: &["data-src", "src"],
                },
                ExtractionRule::JsonLd,
            ],
            ImageFilter::strict(),
        )
    }

    #[test]
    fn test_meta_tag_wins_over_later_rules() {
        let html = r#"
        <html><head>
            <meta property="og:image" content="https://cdn.janedoe.dev/og.jpg">
        </head><body>
            <img class="avatar" src="/img/me.png">
        </body></html>
        "#;

        let found = profile_rules().first_match(html, PAGE).unwrap();
        assert_eq!(found.url, "https://cdn.janedoe.dev/og.jpg");
        assert_eq!(found.method, "og:image");
    }

    #[test]
    fn test_meta_tag_by_name_attribute() {
        let html = r#"<meta name="og:image" content="https://cdn.janedoe.dev/og.jpg">"#;
        let found = profile_rules().first_match(html, PAGE).unwrap();
        assert_eq!(found.url, "https://cdn.janedoe.dev/og.jpg");
    }

    #[test]
    fn test_falls_through_to_selector_when_meta_rejected() {
        let html = r#"
        <html><head>
            <meta property="og:image" content="https://cdn.janedoe.dev/site-logo.png">
        </head><body>
            <img class="avatar" data-src="../img/me.png" alt="Jane Doe">
        </body></html>
        "#;

        let found = profile_rules().first_match(html, PAGE).unwrap();
        assert_eq!(found.url, "https://janedoe.dev/img/me.png");
        assert_eq!(found.method, "img.avatar");
        assert_eq!(found.title.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_json_ld_image_forms() {
        let html = r#"
        <script type="application/ld+json">
        {"@context":"https://schema.org","@graph":[
            {"@type":"Person","name":"Jane Doe","image":{"@type":"ImageObject","url":"https://cdn.janedoe.dev/ld.jpg"}},
            {"@type":"WebPage","image":["https://cdn.janedoe.dev/ld2.png"]}
        ]}
        </script>
        "#;

        let all = profile_rules().collect(html, PAGE, 10);
        let urls: Vec<&str> = all.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://cdn.janedoe.dev/ld.jpg", "https://cdn.janedoe.dev/ld2.png"]
        );
        assert_eq!(all[0].title.as_deref(), Some("Jane Doe"));
        assert_eq!(all[0].method, "json-ld");
    }

    #[test]
    fn test_malformed_json_ld_is_skipped() {
        let html = r#"<script type="application/ld+json">{ not json </script>"#;
        assert!(profile_rules().first_match(html, PAGE).is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let html = "<html><body><p>nothing here</p></body></html>";
        assert!(profile_rules().first_match(html, PAGE).is_none());
    }

    #[test]
    fn test_raw_urls_unescape_scripts() {
        let html = r#"
        <script>var d = ["https:\/\/images.example.org\/people\/jane.jpg?w=600&h=600",
                         "https://images.example.org/ui/button.png"];</script>
        "#;
        let rules = RuleSet::new(vec![ExtractionRule::RawUrls], ImageFilter::strict());
        let found = rules.collect(html, "https://search.example/", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].url,
            "https://images.example.org/people/jane.jpg?w=600&h=600"
        );
    }

    #[test]
    fn test_json_key_extraction() {
        let html = r#"<script>x={"ou":"https://photos.example.org/jane.jpg","ow":800}</script>"#;
        let rules = RuleSet::new(vec![ExtractionRule::JsonKey { key: "ou" }], ImageFilter::strict());
        let found = rules.first_match(html, "https://search.example/").unwrap();
        assert_eq!(found.url, "https://photos.example.org/jane.jpg");
        assert_eq!(found.method, "ou");
    }

    #[test]
    fn test_json_attribute_extraction() {
        let html = r#"
        <a class="iusc" m='{"murl":"https://photos.example.org/jane.png","t":"Jane Doe portrait"}'></a>
        <a class="iusc" m='not json'></a>
        "#;
        let rules = RuleSet::new(
            vec![ExtractionRule::JsonAttribute {
                css: "a.iusc",
                attr: "m",
                field: "murl",
                title_field: Some("t"),
            }],
            ImageFilter::strict(),
        );
        let found = rules.collect(html, "https://search.example/", 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title.as_deref(), Some("Jane Doe portrait"));
    }

    #[test]
    fn test_collect_respects_limit_and_dedups() {
        let html = r#"
        <img src="https://e.org/a.jpg"><img src="https://e.org/a.jpg">
        <img src="https://e.org/b.jpg"><img src="https://e.org/c.jpg">
        "#;
        let rules = RuleSet::new(
            vec![ExtractionRule::Selector {
                css: "img",
                attrs: &["src"],
            }],
            ImageFilter::strict(),
        );
        let found = rules.collect(html, "https://e.org/", 2);
        let urls: Vec<&str> = found.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["https://e.org/a.jpg", "https://e.org/b.jpg"]);
    }

    #[test]
    fn test_rewrite_applies_before_filter() {
        fn upsize(url: &str) -> String {
            url.replace("_normal", "_400x400")
        }
        let html = r#"<img src="https://pbs.twimg.com/profile_images/1/jane_normal.jpg">"#;
        let rules = RuleSet::new(
            vec![ExtractionRule::Selector {
                css: "img",
                attrs: &["src"],
            }],
            ImageFilter::strict().on_host("twimg.com"),
        )
        .with_rewrite(upsize);
        let found = rules.first_match(html, "https://x.com/jane").unwrap();
        assert_eq!(found.url, "https://pbs.twimg.com/profile_images/1/jane_400x400.jpg");
    }

    #[test]
    fn test_decode_html_entities() {
        let url = "https://example.com?a=1&amp;b=2&amp;c=3";
        assert_eq!(decode_html_entities(url), "https://example.com?a=1&b=2&c=3");
    }
}
