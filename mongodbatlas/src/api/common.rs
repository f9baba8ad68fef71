//! Common types and utilities for the Atlas Administration API

use serde::Deserialize;

/// Items requested per page when walking a paginated collection
pub const MAX_ITEMS_PER_PAGE: u32 = 500;

/// Error body returned by the Atlas API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<u16>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<serde_json::Value>>,
}

/// One page of a collection endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

impl<T> Default for Paginated<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            total_count: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// `pageNum` / `itemsPerPage` selection for a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_num: u32,
    pub items_per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_num: 1,
            items_per_page: MAX_ITEMS_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page_num: u32, items_per_page: u32) -> Self {
        Self {
            page_num: page_num.max(1),
            items_per_page: items_per_page.clamp(1, MAX_ITEMS_PER_PAGE),
        }
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add("includeCount", true)
            .add("itemsPerPage", self.items_per_page)
            .add("pageNum", self.page_num)
    }
}

/// Path segments are user supplied (cluster and user names), so escape them
pub fn escape(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_string_skips_missing_values() {
        let params = ApiQueryParams::new()
            .add("foo", "bar baz")
            .add("num", 3)
            .add_optional("opt", Some("value"))
            .add_optional("none", None::<String>);

        assert_eq!(params.to_query_string(), "?foo=bar%20baz&num=3&opt=value");
        assert_eq!(ApiQueryParams::new().to_query_string(), "");
    }

    #[test]
    fn page_request_clamps_values() {
        let page = PageRequest::new(0, 10_000);
        assert_eq!(page.page_num, 1);
        assert_eq!(page.items_per_page, MAX_ITEMS_PER_PAGE);
        assert_eq!(
            PageRequest::new(2, 100).to_query_params().to_query_string(),
            "?includeCount=true&itemsPerPage=100&pageNum=2"
        );
    }

    #[test]
    fn paginated_tolerates_missing_fields() {
        let page: Paginated<String> = serde_json::from_str("{}").unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total_count, None);

        let page: Paginated<String> =
            serde_json::from_str(r#"{"results":["a","b"],"totalCount":7}"#).unwrap();
        assert_eq!(page.results, vec!["a", "b"]);
        assert_eq!(page.total_count, Some(7));
    }

    #[test]
    fn escapes_path_segments() {
        assert_eq!(escape("user@example.com"), "user%40example.com");
        assert_eq!(escape("CN=app,OU=x"), "CN%3Dapp%2COU%3Dx");
    }
}
