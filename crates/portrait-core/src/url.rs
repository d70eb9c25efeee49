//! URL helper functions
//!
//! Builds profile and search URLs for each source and normalizes the
//! identifiers users type in (handles, full profile links, bare hosts).

use url::Url;

/// Default base URLs for each upstream
pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const LINKEDIN_BASE: &str = "https://www.linkedin.com";
pub const X_BASE: &str = "https://x.com";
pub const TWITTER_BASE: &str = "https://twitter.com";
pub const GOOGLE_BASE: &str = "https://www.google.com";
pub const DUCKDUCKGO_BASE: &str = "https://duckduckgo.com";
pub const BING_BASE: &str = "https://www.bing.com";

/// Reduces a handle, `@handle` or profile URL to the bare username
///
/// # Example
/// ```
/// use portrait_core::url::normalize_handle;
/// assert_eq!(normalize_handle("@janedoe"), "janedoe");
/// assert_eq!(normalize_handle("https://github.com/janedoe/"), "janedoe");
/// assert_eq!(normalize_handle("https://x.com/janedoe?lang=en"), "janedoe");
/// ```
pub fn normalize_handle(identifier: &str) -> String {
    let without_query = identifier
        .trim()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_start_matches('@')
        .to_string()
}

/// Builds the GitHub REST endpoint for a user
///
/// # Example
/// ```
/// use portrait_core::url::build_github_user_url;
/// let url = build_github_user_url("https://api.github.com", "@janedoe");
/// assert_eq!(url, "https://api.github.com/users/janedoe");
/// ```
pub fn build_github_user_url(api_base: &str, identifier: &str) -> String {
    format!(
        "{}/users/{}",
        api_base.trim_end_matches('/'),
        urlencoding::encode(&normalize_handle(identifier))
    )
}

/// Builds a Twitter/X profile URL on the given host
pub fn build_twitter_profile_url(base: &str, identifier: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(&normalize_handle(identifier))
    )
}

/// Expands a LinkedIn slug to a profile URL; full URLs pass through
///
/// # Example
/// ```
/// use portrait_core::url::build_linkedin_profile_url;
/// assert_eq!(
///     build_linkedin_profile_url("https://www.linkedin.com", "jane-doe"),
///     "https://www.linkedin.com/in/jane-doe"
/// );
/// ```
pub fn build_linkedin_profile_url(base: &str, identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        return identifier.to_string();
    }
    format!(
        "{}/in/{}",
        base.trim_end_matches('/'),
        urlencoding::encode(&normalize_handle(identifier))
    )
}

/// Adds `https://` to bare hosts such as `janedoe.dev`
pub fn build_website_url(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.starts_with("http://") || identifier.starts_with("https://") {
        identifier.to_string()
    } else {
        format!("https://{}", identifier)
    }
}

/// Builds a Google Images results URL
///
/// # Example
/// ```
/// use portrait_core::url::build_google_images_url;
/// let url = build_google_images_url("https://www.google.com", "jane doe headshot");
/// assert_eq!(url, "https://www.google.com/search?q=jane%20doe%20headshot&tbm=isch&safe=off");
/// ```
pub fn build_google_images_url(base: &str, query: &str) -> String {
    format!(
        "{}/search?q={}&tbm=isch&safe=off",
        base.trim_end_matches('/'),
        urlencoding::encode(query)
    )
}

/// Builds a plain Google web search URL (used for `site:` searches)
pub fn build_google_web_url(base: &str, query: &str) -> String {
    format!(
        "{}/search?q={}",
        base.trim_end_matches('/'),
        urlencoding::encode(query)
    )
}

/// Builds a DuckDuckGo HTML endpoint URL in image mode
pub fn build_duckduckgo_url(base: &str, query: &str) -> String {
    format!(
        "{}/html/?q={}&iax=images&ia=images",
        base.trim_end_matches('/'),
        urlencoding::encode(query)
    )
}

/// Builds a Bing Images results URL
pub fn build_bing_images_url(base: &str, query: &str) -> String {
    format!(
        "{}/images/search?q={}",
        base.trim_end_matches('/'),
        urlencoding::encode(query)
    )
}

/// Resolves a possibly relative reference against the page it was found on
///
/// Returns `None` for anything that is not http(s) after resolution
/// (e.g. `data:` URIs or `javascript:` links).
///
/// # Example
/// ```
/// use portrait_core::url::resolve_url;
/// assert_eq!(
///     resolve_url("https://janedoe.dev/about/", "../img/me.jpg"),
///     Some("https://janedoe.dev/img/me.jpg".to_string())
/// );
/// assert_eq!(resolve_url("https://janedoe.dev/", "data:image/png;base64,AAAA"), None);
/// ```
pub fn resolve_url(page_url: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let resolved = match Url::parse(reference) {
        Ok(absolute) => absolute,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url).ok()?.join(reference).ok()?,
        Err(_) => return None,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Unwraps Google's `/url?q=<target>&...` redirect links
pub fn unwrap_redirect_link(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("/url?")
        && let Some(target) = rest
            .split('&')
            .find_map(|pair| pair.strip_prefix("q="))
        && let Ok(decoded) = urlencoding::decode(target)
    {
        return decoded.into_owned();
    }
    href.to_string()
}

/// Extracts the host of an absolute URL
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle_variants() {
        assert_eq!(normalize_handle("janedoe"), "janedoe");
        assert_eq!(normalize_handle("@janedoe"), "janedoe");
        assert_eq!(normalize_handle("https://twitter.com/janedoe"), "janedoe");
        assert_eq!(normalize_handle("github.com/janedoe/"), "janedoe");
        assert_eq!(normalize_handle("  @janedoe  "), "janedoe");
    }

    #[test]
    fn test_build_github_user_url_trailing_slash() {
        let url = build_github_user_url("http://127.0.0.1:9000/", "janedoe");
        assert_eq!(url, "http://127.0.0.1:9000/users/janedoe");
    }

    #[test]
    fn test_build_twitter_profile_url() {
        assert_eq!(
            build_twitter_profile_url(X_BASE, "@janedoe"),
            "https://x.com/janedoe"
        );
    }

    #[test]
    fn test_build_linkedin_profile_url_passthrough() {
        let url = build_linkedin_profile_url(LINKEDIN_BASE, "https://linkedin.com/in/jane");
        assert_eq!(url, "https://linkedin.com/in/jane");
    }

    #[test]
    fn test_build_website_url() {
        assert_eq!(build_website_url("janedoe.dev"), "https://janedoe.dev");
        assert_eq!(build_website_url("http://janedoe.dev"), "http://janedoe.dev");
    }

    #[test]
    fn test_build_search_urls_encode_query() {
        assert_eq!(
            build_duckduckgo_url(DUCKDUCKGO_BASE, "\"Jane Doe\" headshot"),
            "https://duckduckgo.com/html/?q=%22Jane%20Doe%22%20headshot&iax=images&ia=images"
        );
        assert_eq!(
            build_bing_images_url(BING_BASE, "Jane Doe profile"),
            "https://www.bing.com/images/search?q=Jane%20Doe%20profile"
        );
        assert_eq!(
            build_google_web_url(GOOGLE_BASE, "site:medium.com Jane Doe"),
            "https://www.google.com/search?q=site%3Amedium.com%20Jane%20Doe"
        );
    }

    #[test]
    fn test_resolve_url_absolute_and_relative() {
        assert_eq!(
            resolve_url("https://janedoe.dev/", "https://cdn.example.com/a.png"),
            Some("https://cdn.example.com/a.png".to_string())
        );
        assert_eq!(
            resolve_url("https://janedoe.dev/team/", "/img/a.png"),
            Some("https://janedoe.dev/img/a.png".to_string())
        );
        assert_eq!(
            resolve_url("https://janedoe.dev/", "//cdn.example.com/a.png"),
            Some("https://cdn.example.com/a.png".to_string())
        );
        assert_eq!(resolve_url("https://janedoe.dev/", "javascript:void(0)"), None);
        assert_eq!(resolve_url("https://janedoe.dev/", ""), None);
    }

    #[test]
    fn test_unwrap_redirect_link() {
        assert_eq!(
            unwrap_redirect_link("/url?q=https://medium.com/%40jane/post&sa=U"),
            "https://medium.com/@jane/post"
        );
        assert_eq!(
            unwrap_redirect_link("https://medium.com/@jane"),
            "https://medium.com/@jane"
        );
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://PBS.twimg.com/profile_images/1/a.jpg"),
            Some("pbs.twimg.com".to_string())
        );
        assert_eq!(host_of("not a url"), None);
    }
}
