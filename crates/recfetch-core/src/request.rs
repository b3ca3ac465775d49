//! Per-identifier request construction.
//!
//! The CLI resolves credentials and static headers once into a
//! [`RequestTemplate`]; the pool builds one immutable [`FetchRequest`] per
//! identifier from it.

use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Placeholder replaced by the (percent-encoded) identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("identifier is empty")]
    EmptyIdentifier,
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// How requests authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>` header.
    Bearer(String),
    /// API key sent as a query parameter.
    ApiKey { name: String, value: String },
    None,
}

impl Credentials {
    /// Pick the auth scheme from CLI inputs.
    ///
    /// A key value starting with `pat-` is a private-app token and is sent as
    /// a bearer token even when passed as an API key.
    pub fn resolve(
        auth_token: Option<&str>,
        api_key_name: Option<&str>,
        api_key_value: Option<&str>,
    ) -> Self {
        fn non_empty(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        let token = non_empty(auth_token);
        let key_name = non_empty(api_key_name);
        let key_value = non_empty(api_key_value);

        match (token, key_name, key_value) {
            (_, _, Some(v)) if v.starts_with("pat-") => Credentials::Bearer(v.to_string()),
            (Some(t), _, _) => Credentials::Bearer(t.to_string()),
            (None, Some(name), Some(value)) => Credentials::ApiKey {
                name: name.to_string(),
                value: value.to_string(),
            },
            _ => Credentials::None,
        }
    }
}

/// Everything needed to fetch one identifier. Immutable once built.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    identifier: String,
    url: Url,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    timeout: Duration,
}

impl FetchRequest {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Resolved URL, query parameters included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// URL template plus the resolved header and query maps shared by every identifier.
#[derive(Debug, Clone)]
pub struct RequestTemplate {
    url_template: String,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    timeout: Duration,
}

impl RequestTemplate {
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url_template: url_template.into(),
            headers: BTreeMap::new(),
            params: BTreeMap::new(),
            timeout,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn credentials(self, credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Bearer(token) => self.header("Authorization", format!("Bearer {}", token)),
            Credentials::ApiKey { name, value } => self.param(name.clone(), value.clone()),
            Credentials::None => self,
        }
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// Build the request for `identifier`.
    pub fn build(&self, identifier: &str) -> Result<FetchRequest, RequestError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(RequestError::EmptyIdentifier);
        }
        let raw = self
            .url_template
            .replace(ID_PLACEHOLDER, &urlencoding::encode(identifier));
        let url = if self.params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, &self.params)
        }
        .map_err(|source| RequestError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;

        Ok(FetchRequest {
            identifier: identifier.to_string(),
            url,
            headers: self.headers.clone(),
            params: self.params.clone(),
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://api.example.com/engagements/v1/engagements/{id}";

    #[test]
    fn substitutes_identifier() {
        let t = RequestTemplate::new(TEMPLATE, Duration::from_secs(15));
        let r = t.build(" 12345 ").unwrap();
        assert_eq!(r.identifier(), "12345");
        assert_eq!(
            r.url().as_str(),
            "https://api.example.com/engagements/v1/engagements/12345"
        );
        assert_eq!(r.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn identifier_is_percent_encoded() {
        let t = RequestTemplate::new(TEMPLATE, Duration::from_secs(1));
        let r = t.build("a/b c").unwrap();
        assert!(r.url().path().ends_with("/a%2Fb%20c"));
    }

    #[test]
    fn api_key_goes_to_query() {
        let creds = Credentials::resolve(None, Some("hapikey"), Some("secret"));
        assert_eq!(
            creds,
            Credentials::ApiKey {
                name: "hapikey".into(),
                value: "secret".into()
            }
        );
        let t = RequestTemplate::new(TEMPLATE, Duration::from_secs(1)).credentials(&creds);
        let r = t.build("7").unwrap();
        assert_eq!(r.url().query(), Some("hapikey=secret"));
        assert_eq!(r.params().get("hapikey").map(String::as_str), Some("secret"));
        assert!(r.headers().get("Authorization").is_none());
    }

    #[test]
    fn private_app_key_becomes_bearer() {
        let creds = Credentials::resolve(Some("other"), Some("hapikey"), Some("pat-na1-xyz"));
        assert_eq!(creds, Credentials::Bearer("pat-na1-xyz".into()));
        let t = RequestTemplate::new(TEMPLATE, Duration::from_secs(1)).credentials(&creds);
        let r = t.build("7").unwrap();
        assert_eq!(
            r.headers().get("Authorization").map(String::as_str),
            Some("Bearer pat-na1-xyz")
        );
        assert_eq!(r.url().query(), None);
    }

    #[test]
    fn auth_token_wins_over_plain_api_key() {
        let creds = Credentials::resolve(Some("tok"), Some("hapikey"), Some("plain"));
        assert_eq!(creds, Credentials::Bearer("tok".into()));
        assert_eq!(Credentials::resolve(None, Some("hapikey"), None), Credentials::None);
        assert_eq!(Credentials::resolve(Some("  "), None, None), Credentials::None);
    }

    #[test]
    fn credential_inputs_are_trimmed() {
        assert_eq!(
            Credentials::resolve(Some(" tok "), None, None),
            Credentials::Bearer("tok".into())
        );
        assert_eq!(
            Credentials::resolve(None, Some(" key "), Some(" v ")),
            Credentials::ApiKey {
                name: "key".into(),
                value: "v".into()
            }
        );
        assert_eq!(
            Credentials::resolve(Some("tok"), Some("hapikey"), Some("  pat-1 ")),
            Credentials::Bearer("pat-1".into())
        );
        assert_eq!(Credentials::resolve(None, Some(""), Some("v")), Credentials::None);
    }

    #[test]
    fn rejects_empty_identifier_and_bad_template() {
        let t = RequestTemplate::new(TEMPLATE, Duration::from_secs(1));
        assert!(matches!(t.build("  "), Err(RequestError::EmptyIdentifier)));
        let bad = RequestTemplate::new("not a url/{id}", Duration::from_secs(1));
        assert!(matches!(bad.build("1"), Err(RequestError::InvalidUrl { .. })));
    }
}
