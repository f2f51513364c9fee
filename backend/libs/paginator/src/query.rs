//! Request query parameters

use actix_web::{web, HttpRequest};
use std::collections::HashMap;

/// Read access to a request's query parameters.
pub trait QuerySource {
    fn query_value(&self, name: &str) -> Option<String>;
}

impl QuerySource for HashMap<String, String> {
    fn query_value(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<Q: QuerySource + ?Sized> QuerySource for &Q {
    fn query_value(&self, name: &str) -> Option<String> {
        (**self).query_value(name)
    }
}

/// Parses the query string on every lookup; prefer [`QueryParams::from_request`]
/// when reading several parameters.
impl QuerySource for HttpRequest {
    fn query_value(&self, name: &str) -> Option<String> {
        QueryParams::from_query_string(self.query_string()).query_value(name)
    }
}

/// Decoded query parameters of one request.
#[derive(Clone, Debug, Default)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    /// Malformed query strings decode to no parameters at all.
    pub fn from_query_string(query: &str) -> Self {
        web::Query::<HashMap<String, String>>::from_query(query)
            .map(|q| Self(q.into_inner()))
            .unwrap_or_default()
    }

    pub fn from_request(req: &HttpRequest) -> Self {
        Self::from_query_string(req.query_string())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl QuerySource for QueryParams {
    fn query_value(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn parses_and_decodes_query_string() {
        let params = QueryParams::from_query_string("page=2&sort=created_at&q=hello%20world");
        assert_eq!(params.query_value("page").as_deref(), Some("2"));
        assert_eq!(params.query_value("sort").as_deref(), Some("created_at"));
        assert_eq!(params.query_value("q").as_deref(), Some("hello world"));
        assert_eq!(params.query_value("order"), None);
    }

    #[test]
    fn reads_from_http_request() {
        let req = TestRequest::with_uri("/v1/topics?page=3&per_page=20").to_http_request();
        assert_eq!(req.query_value("page").as_deref(), Some("3"));
        assert_eq!(
            QueryParams::from_request(&req).query_value("per_page").as_deref(),
            Some("20")
        );
    }

    #[test]
    fn collects_from_pairs() {
        let params: QueryParams = [("page", "1")].into_iter().collect();
        assert_eq!(params.query_value("page").as_deref(), Some("1"));

        let map: HashMap<String, String> = HashMap::new();
        assert_eq!((&map).query_value("page"), None);
    }
}
