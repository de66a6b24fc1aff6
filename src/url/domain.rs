use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use blog_harvester::url::extract_host;
///
/// let url = Url::parse("https://Blog.Example.com/2024/03").unwrap();
/// assert_eq!(extract_host(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if both URLs share scheme, host and port
///
/// Link discovery only follows same-origin links, so a blog's outbound links
/// to other sites never enter the frontier.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
