use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet};
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use sha1::Sha1;
use std::borrow::Cow;
use url::{Position, Url};
use uuid::Uuid;

use crate::error::Error;

type HmacSha1 = Hmac<Sha1>;

// https://tools.ietf.org/html/rfc5849#section-3.6
// * ALPHA, DIGIT, '-', '.', '_', '~' MUST NOT be encoded.
// * All other characters MUST be encoded.
// * The two hexadecimal characters used to represent encoded
//   characters MUST be uppercase.
const TARGETS_FOR_PARAMS: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD_HMAC_SHA1: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

const OAUTH_HEADER: &str = "OAuth";
const OAUTH_PARAM_KEY_CONSUMER_KEY: &str = "oauth_consumer_key";
const OAUTH_PARAM_KEY_NONCE: &str = "oauth_nonce";
const OAUTH_PARAM_KEY_SIGNATURE: &str = "oauth_signature";
const OAUTH_PARAM_KEY_SIGNATURE_METHOD: &str = "oauth_signature_method";
const OAUTH_PARAM_KEY_TIMESTAMP: &str = "oauth_timestamp";
const OAUTH_PARAM_KEY_TOKEN: &str = "oauth_token";
const OAUTH_PARAM_KEY_VERSION: &str = "oauth_version";

/// OAuth signing identity derived from an application's API key pair,
/// bound to the site the requests are made against.
#[derive(Clone)]
pub struct Consumer {
    key: String,
    secret: String,
    site: Url,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<String>, site: Url) -> Self {
        Consumer {
            key: key.into(),
            secret: secret.into(),
            site,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn site(&self) -> &Url {
        &self.site
    }
}

/// Per-user signing credential. Signs and sends the mutating requests
/// on behalf of the user the token was issued for.
pub struct AccessToken {
    consumer: Consumer,
    token: String,
    secret: String,
    http: reqwest::blocking::Client,
}

impl AccessToken {
    pub fn new(consumer: Consumer, token: impl Into<String>, secret: impl Into<String>) -> Self {
        AccessToken {
            consumer,
            token: token.into(),
            secret: secret.into(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// POST a form-encoded body to a path under the consumer's site.
    pub fn post(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::blocking::Response, Error> {
        self.send(Method::POST, path, form)
    }

    /// PUT a form-encoded body to a path under the consumer's site.
    pub fn put(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::blocking::Response, Error> {
        self.send(Method::PUT, path, form)
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::blocking::Response, Error> {
        let url = self.consumer.site().join(path)?;
        let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let authorization = RequestSigner::new(&self.consumer)
            .token(&self.token, &self.secret)
            .authorization(method.as_str(), &url, &pairs);
        debug!("{} {}", method, url.path());
        let response = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, authorization)
            .form(form)
            .send()?
            .error_for_status()?;
        Ok(response)
    }
}

/// One request signature in the making.
///
/// Nonce and timestamp default to a fresh v4 UUID and the current time;
/// both can be pinned for deterministic output.
pub struct RequestSigner<'a> {
    consumer: &'a Consumer,
    token: Option<(&'a str, &'a str)>,
    oauth_nonce: Option<String>,
    oauth_timestamp: Option<i64>,
    oauth_version: Option<String>,
}

impl<'a> RequestSigner<'a> {
    pub fn new(consumer: &'a Consumer) -> Self {
        RequestSigner {
            consumer,
            token: None,
            oauth_nonce: None,
            oauth_timestamp: None,
            oauth_version: Some(OAUTH_VERSION.into()),
        }
    }

    /// Bind a token/secret pair; the token joins the signed parameters
    /// and the secret joins the signing key.
    pub fn token(mut self, token: &'a str, secret: &'a str) -> Self {
        self.token = Some((token, secret));
        self
    }

    pub fn oauth_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.oauth_nonce = Some(nonce.into());
        self
    }

    pub fn oauth_timestamp(mut self, timestamp: i64) -> Self {
        self.oauth_timestamp = Some(timestamp);
        self
    }

    pub fn oauth_version(mut self, version: Option<&str>) -> Self {
        self.oauth_version = version.map(|v| v.into());
        self
    }

    /// Generate the base64 HMAC-SHA1 signature for a request.
    ///
    /// # Parameters
    /// - http_method: HTTP method, ex)"GET", "POST", ...
    /// - url: full request URL; its query joins the signed parameters.
    /// - request_params: form parameters, raw (not yet encoded).
    pub fn signature(&self, http_method: &str, url: &Url, request_params: &[(&str, &str)]) -> String {
        let nonce = self.resolve_nonce();
        let timestamp = self.resolve_timestamp();
        self.compute(http_method, url, request_params, &nonce, timestamp)
    }

    /// Render the `Authorization: OAuth ...` header for a request,
    /// signature included.
    pub fn authorization(
        &self,
        http_method: &str,
        url: &Url,
        request_params: &[(&str, &str)],
    ) -> String {
        let nonce = self.resolve_nonce();
        let timestamp = self.resolve_timestamp();
        let signature = self.compute(http_method, url, request_params, &nonce, timestamp);

        // header fields, already in alphabetical order
        let mut fields: Vec<(&str, String)> = vec![
            (OAUTH_PARAM_KEY_CONSUMER_KEY, percent_encode_str(&self.consumer.key)),
            (OAUTH_PARAM_KEY_NONCE, percent_encode_str(&nonce)),
            (OAUTH_PARAM_KEY_SIGNATURE, percent_encode_str(&signature)),
            (OAUTH_PARAM_KEY_SIGNATURE_METHOD, SIGNATURE_METHOD_HMAC_SHA1.to_string()),
            (OAUTH_PARAM_KEY_TIMESTAMP, format!("{}", timestamp)),
        ];
        if let Some((token, _)) = self.token {
            fields.push((OAUTH_PARAM_KEY_TOKEN, percent_encode_str(token)));
        }
        if let Some(version) = &self.oauth_version {
            fields.push((OAUTH_PARAM_KEY_VERSION, percent_encode_str(version)));
        }

        let rendered = fields
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect::<Vec<String>>()
            .join(", ");
        format!("{} {}", OAUTH_HEADER, rendered)
    }

    fn resolve_nonce(&self) -> String {
        self.oauth_nonce
            .clone()
            .unwrap_or_else(|| format!("{}", Uuid::new_v4()))
    }

    fn resolve_timestamp(&self) -> i64 {
        self.oauth_timestamp
            .unwrap_or_else(|| Utc::now().timestamp())
    }

    fn compute(
        &self,
        http_method: &str,
        url: &Url,
        request_params: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        // build authorization basic parameters
        let mut params: Vec<(Cow<str>, Cow<str>)> = vec![
            (
                Cow::from(OAUTH_PARAM_KEY_CONSUMER_KEY),
                percent_encode_cow(self.consumer.key.as_str()),
            ),
            (
                Cow::from(OAUTH_PARAM_KEY_SIGNATURE_METHOD),
                Cow::from(SIGNATURE_METHOD_HMAC_SHA1),
            ),
            (
                Cow::from(OAUTH_PARAM_KEY_TIMESTAMP),
                Cow::from(format!("{}", timestamp)),
            ),
            (Cow::from(OAUTH_PARAM_KEY_NONCE), percent_encode_cow(nonce)),
        ];
        if let Some(version) = &self.oauth_version {
            params.push((
                Cow::from(OAUTH_PARAM_KEY_VERSION),
                percent_encode_cow(version.as_str()),
            ));
        }
        if let Some((token, _)) = self.token {
            params.push((Cow::from(OAUTH_PARAM_KEY_TOKEN), percent_encode_cow(token)));
        }

        // join with the URL query and the request parameters, then
        // alphabetic sort by encoded key
        params.extend(raw_query_params(url));
        params.extend(
            request_params
                .iter()
                .map(|(k, v)| (percent_encode_cow(*k), percent_encode_cow(*v))),
        );
        params.sort();

        let param_str = params
            .iter()
            .filter(|(k, _)| k != "realm") // "realm" is a special parameter
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<String>>()
            .join("&");

        // create the string to sign
        // (get/post parameters end up encoded twice.)
        let http_method = http_method.to_ascii_uppercase();
        let base_str = format!(
            "{}&{}&{}",
            percent_encode(&http_method),
            percent_encode(&url[..Position::AfterPath]),
            percent_encode(&param_str)
        );

        // create the signing key
        let token_secret = self.token.map(|(_, s)| s).unwrap_or("");
        let sign_key = format!(
            "{}&{}",
            percent_encode(&self.consumer.secret),
            percent_encode(token_secret)
        );

        // generate the signature
        // NOTE: HMAC-SHA1 accepts keys of any size, so `new_varkey` never fails.
        let mut mac = HmacSha1::new_varkey(sign_key.as_bytes()).unwrap();
        mac.input(base_str.as_bytes());
        let hash = mac.result().code();
        base64::encode(&hash)
    }
}

/// Split a URL's raw query into pairs, kept in their on-the-wire
/// encoding. Fragments without a value are dropped.
fn raw_query_params(url: &Url) -> Vec<(Cow<str>, Cow<str>)> {
    let query = match url.query() {
        Some(query) => query,
        None => return Vec::new(),
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut halves = pair.splitn(2, '=');
            match (halves.next(), halves.next()) {
                (Some(k), Some(v)) => Some((Cow::from(k), Cow::from(v))),
                _ => None,
            }
        })
        .collect()
}

fn percent_encode_str(input: &str) -> String {
    percent_encode(input).to_string()
}

fn percent_encode_cow<'a>(input: &'a str) -> Cow<'a, str> {
    Cow::from(percent_encode(input))
}

fn percent_encode<'a>(input: &'a str) -> percent_encoding::PercentEncode<'a> {
    utf8_percent_encode(input, TARGETS_FOR_PARAMS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Url {
        Url::parse("https://api.twitter.com").unwrap()
    }

    #[test]
    fn signs_the_twitter_documentation_example() {
        // https://developer.twitter.com/ja/docs/basics/authentication/guides/creating-a-signature
        let consumer = Consumer::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            site(),
        );
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json").unwrap();
        let signature = RequestSigner::new(&consumer)
            .token(
                "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
                "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
            )
            .oauth_nonce("kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg")
            .oauth_timestamp(1_318_622_958)
            .signature(
                "post",
                &url,
                &[
                    ("include_entities", "true"),
                    ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
                ],
            );
        assert_eq!(signature, "hCtSmYh+iHYCEqBWrE7C7hYmtUk=");
    }

    #[test]
    fn signs_the_rfc5849_example() {
        // https://tools.ietf.org/html/rfc5849
        let consumer = Consumer::new(
            "dpf43f3p2l4k3l03",
            "kd94hf93k423kf44",
            Url::parse("https://photos.example.net").unwrap(),
        );
        let url = Url::parse("https://photos.example.net/initiate").unwrap();
        let signature = RequestSigner::new(&consumer)
            .oauth_nonce("wIjqoS")
            .oauth_timestamp(137_131_200)
            .oauth_version(None)
            .signature(
                "post",
                &url,
                &[
                    ("realm", "photos"),
                    ("oauth_callback", "http://printer.example.com/ready"),
                ],
            );
        assert_eq!(signature, "74KNZJeDHnMBp0EMJ9ZHt/XKycU=");
    }

    #[test]
    fn query_parameters_join_the_signed_set() {
        let consumer = Consumer::new("ck", "cs", site());
        let plain = Url::parse("https://api.twitter.com/a").unwrap();
        let with_query = Url::parse("https://api.twitter.com/a?page=2").unwrap();
        let signer = |url: &Url| {
            RequestSigner::new(&consumer)
                .oauth_nonce("n")
                .oauth_timestamp(1)
                .signature("get", url, &[])
        };
        assert_ne!(signer(&plain), signer(&with_query));
    }

    #[test]
    fn authorization_header_carries_the_oauth_fields() {
        let consumer = Consumer::new("ck", "cs", site());
        let url = Url::parse("https://api.twitter.com/a").unwrap();
        let header = RequestSigner::new(&consumer)
            .token("tk", "ts")
            .oauth_nonce("n")
            .oauth_timestamp(42)
            .authorization("post", &url, &[("status", "hi")]);
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_nonce=\"n\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_timestamp=\"42\""));
        assert!(header.contains("oauth_token=\"tk\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        assert!(header.contains("oauth_signature=\""));
        // form parameters belong in the body, not the header
        assert!(!header.contains("status=\"hi\""));
    }

    #[test]
    fn raw_query_params_keeps_wire_encoding() {
        let url = Url::parse("http://example.com/p?a=b%20c&empty&x=1").unwrap();
        let params = raw_query_params(&url);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0], (Cow::from("a"), Cow::from("b%20c")));
        assert_eq!(params[1], (Cow::from("x"), Cow::from("1")));
    }
}
