use std::collections::BTreeMap;

use url::Url;

use crate::observer::constants::UTM_PREFIX;

/// Collects the `utm_*` query parameters of `url` into a flat map.
///
/// Values are percent-decoded and the last occurrence of a repeated key wins. URLs that cannot be
/// parsed yield an empty map.
pub fn parse_utm_params(url: &str) -> BTreeMap<String, String> {
    let Ok(parsed) = Url::parse(url) else {
        return BTreeMap::new();
    };
    parsed
        .query_pairs()
        .filter(|(key, _)| key.starts_with(UTM_PREFIX))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_only_utm_parameters() {
        let params = parse_utm_params(
            "https://mysite.com/?utm_source=facebook&utm_medium=cpc&ref=home&utm_campaign=summer_sale",
        );
        assert_eq!(params.len(), 3);
        assert_eq!(params.get("utm_source").map(String::as_str), Some("facebook"));
        assert_eq!(params.get("utm_medium").map(String::as_str), Some("cpc"));
        assert_eq!(
            params.get("utm_campaign").map(String::as_str),
            Some("summer_sale")
        );
        assert!(!params.contains_key("ref"));
    }

    #[test]
    fn decodes_values_and_keeps_last_duplicate() {
        let params =
            parse_utm_params("https://mysite.com/?utm_term=jewelry%20sale&utm_term=ring+discount");
        assert_eq!(
            params.get("utm_term").map(String::as_str),
            Some("ring discount")
        );
    }

    #[test]
    fn invalid_or_queryless_urls_yield_empty_map() {
        assert!(parse_utm_params("not a url").is_empty());
        assert!(parse_utm_params("https://mysite.com/page").is_empty());
    }
}
