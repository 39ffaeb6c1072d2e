//! Query string helpers for the PCE API

/// Append URL-encoded filters to `url`
pub fn with_query(url: &str, filters: &[(&str, &str)]) -> String {
    if filters.is_empty() {
        return url.to_string();
    }
    let query = filters
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", url, query)
}

/// Extract the numeric org id from an org href such as `/orgs/3`
pub fn org_id_from_href(href: &str) -> Option<u64> {
    href.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}
