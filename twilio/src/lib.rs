mod call;
mod message;
pub mod twiml;
mod webhook;

pub use call::{Call, CallStatus, Recording, RecordingState, RecordingStatus};
use headers::HeaderMapExt;
use hyper::body::{Body, Bytes};
use hyper::Response;
pub use message::{MediaAttachment, Message};
use reqwest::{Client as ReqwestClient, Method, StatusCode};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::time::Duration;
pub use webhook::compute_signature;

#[derive(Clone)]
pub struct Client {
    account_id: String,
    auth_token: String,
    validate_signatures: bool,
    client: ReqwestClient,
}

#[derive(Debug)]
pub enum TwilioError {
    ReqwestError(reqwest::Error),
    HTTPError(StatusCode),
    ParsingError,
    AuthError,
    BadRequest,
    MissingCredentials,
}

impl Display for TwilioError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            TwilioError::ReqwestError(ref e) => e.fmt(f),
            TwilioError::HTTPError(ref s) => write!(f, "Invalid HTTP status code: {}", s),
            TwilioError::ParsingError => f.write_str("Parsing error"),
            TwilioError::AuthError => f.write_str("Missing or invalid `X-Twilio-Signature` header in request"),
            TwilioError::BadRequest => f.write_str("Bad request"),
            TwilioError::MissingCredentials => f.write_str("Twilio account SID or auth token is not configured"),
        }
    }
}

impl Error for TwilioError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            TwilioError::ReqwestError(ref e) => Some(e),
            _ => None,
        }
    }
}

pub trait FromMap {
    fn from_map(m: BTreeMap<String, String>) -> Result<Box<Self>, TwilioError>;
}

impl Client {
    pub fn new(account_id: &str, auth_token: &str) -> Client {
        Client {
            account_id: account_id.to_string(),
            auth_token: auth_token.to_string(),
            validate_signatures: false,
            client: ReqwestClient::new(),
        }
    }

    /// Reject webhook requests whose `X-Twilio-Signature` does not match the
    /// auth token. Off by default, since proxies in front of the service may
    /// rewrite the host the signature was computed for.
    pub fn with_signature_validation(mut self, enabled: bool) -> Client {
        self.validate_signatures = enabled;
        self
    }

    /// Whether both the account SID and the auth token are present.
    pub fn has_credentials(&self) -> bool {
        !self.account_id.is_empty() && !self.auth_token.is_empty()
    }

    async fn send_request<T>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, TwilioError>
    where
        T: serde::de::DeserializeOwned,
    {
        if !self.has_credentials() {
            return Err(TwilioError::MissingCredentials);
        }

        let url = &format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/{}.json",
            self.account_id, endpoint
        );

        let response = self
            .client
            .request(method, url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(TwilioError::ReqwestError)?;

        match response.status() {
            StatusCode::CREATED | StatusCode::OK => {}
            other => {
                let content = response.text().await.unwrap_or_default();
                log::warn!("Twilio responded with {other} on {endpoint}: {content}");

                return Err(TwilioError::HTTPError(other));
            }
        };

        response
            .json::<T>()
            .await
            .map_err(|_| TwilioError::ParsingError)
    }

    /// Download a media resource (recording or message attachment) with the
    /// account's basic auth credentials. A `404` is reported as
    /// `HTTPError(NOT_FOUND)` so callers can tell "not yet available" apart
    /// from other failures.
    pub async fn download_media(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, TwilioError> {
        if !self.has_credentials() {
            return Err(TwilioError::MissingCredentials);
        }

        let response = self
            .client
            .get(url)
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .timeout(timeout)
            .send()
            .await
            .map_err(TwilioError::ReqwestError)?;

        if !response.status().is_success() {
            return Err(TwilioError::HTTPError(response.status()));
        }

        response
            .bytes()
            .await
            .map_err(TwilioError::ReqwestError)
            .map(|b| b.to_vec())
    }

    pub async fn respond_to_webhook_async<B, T: FromMap, F, Fut>(
        &self,
        req: hyper::Request<B>,
        fallback: twiml::Twiml,
        logic: F,
    ) -> Response<String>
    where
        B: Body<Data = Bytes>,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = twiml::Twiml>,
    {
        let twiml = match self.parse_request::<B, T>(req).await {
            Ok(obj) => logic(*obj).await,
            Err(e) => {
                log::warn!("Rejected webhook request: {e}");
                fallback
            }
        };

        let mut res = Response::new(twiml.as_twiml());
        res.headers_mut().typed_insert(headers::ContentType::xml());
        res
    }
}

/// Twilio sends absent optional parameters as empty strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
