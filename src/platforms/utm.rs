//! UTM content extraction
//!
//! Spend rows are joined to backend leads on `utm_content`, so every
//! connector has to derive that value from what the platform reports.

use url::Url;

/// Extract `utm_content` (or, failing that, `content`) from an ad's
/// destination URL. Blank values are ignored; returns an empty string when
/// neither parameter carries a value.
pub fn extract_utm_content_from_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    let pairs = query_pairs(url);

    ["utm_content", "content"]
        .iter()
        .find_map(|key| {
            pairs
                .iter()
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.clone())
        })
        .unwrap_or_default()
}

/// UTM content derived from a campaign name
///
/// Campaign names are used verbatim; naming conventions that encode the
/// content variant differently should be handled here.
pub fn extract_utm_content(campaign_name: &str) -> String {
    campaign_name.to_string()
}

/// Decoded query pairs of an absolute or scheme-less URL
fn query_pairs(url: &str) -> Vec<(String, String)> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
    }

    // Scheme-less or otherwise unparsable destination, e.g. "example.com/?utm_content=a"
    let without_fragment = url.split('#').next().unwrap_or_default();
    let query = match without_fragment.split_once('?') {
        Some((_, q)) => q,
        None => return Vec::new(),
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(k), decode_component(v))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
