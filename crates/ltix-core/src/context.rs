//! Explicit request context.
//!
//! Protocol handlers never read ambient request state; the HTTP layer builds
//! a [`RequestContext`] and passes it in.

use std::collections::BTreeMap;

/// Method, headers and parameters of one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Upper-cased HTTP method.
    pub method: String,
    /// Absolute request URL as the platform publishes it.
    pub url: String,
    /// Header map keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl RequestContext {
    #[must_use]
    pub fn new(method: impl AsRef<str>, url: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            url: url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Adds parameters parsed from a URL query string.
    #[must_use]
    pub fn with_query_string(mut self, query: &str) -> Self {
        self.query.extend(parse_pairs(query.as_bytes()));
        self
    }

    /// Adds parameters parsed from an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.form.extend(parse_pairs(body));
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_post(&self) -> bool {
        self.method == "POST"
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Media type of the body, without parameters, lower-cased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }

    /// Named parameter, form body first, then query string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        last_value(&self.form, name).or_else(|| last_value(&self.query, name))
    }

    /// Named parameter, empty when absent.
    #[must_use]
    pub fn param_or_empty(&self, name: &str) -> &str {
        self.param(name).unwrap_or_default()
    }

    /// All parameters, form values overriding query values.
    #[must_use]
    pub fn merged_params(&self) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = self.query.iter().cloned().collect();
        params.extend(self.form.iter().cloned());
        params
    }
}

fn last_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input).into_owned().collect()
}
