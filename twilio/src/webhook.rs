use crate::{Client, FromMap, TwilioError};
use base64::prelude::*;
use headers::{HeaderMapExt, Host};
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use hyper::{
    body::{Body, Bytes},
    Method, Request,
};
use sha1::Sha1;
use std::collections::BTreeMap;

fn get_args(path_and_query: &str) -> BTreeMap<String, String> {
    match path_and_query.split_once('?') {
        Some((_, query)) => args_from_urlencoded(query.as_bytes()),
        None => BTreeMap::new(),
    }
}

fn args_from_urlencoded(enc: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(enc).into_owned().collect()
}

/// Compute the `X-Twilio-Signature` value for a request: the full URL with
/// every POST parameter appended as `{key}{value}` in key order, signed with
/// HMAC-SHA1 using the auth token and base64 encoded.
pub fn compute_signature(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> String {
    let mut payload = url.to_string();
    for (key, value) in params {
        payload.push_str(key);
        payload.push_str(value);
    }

    // HMAC accepts keys of any length
    let mut hasher = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(hasher) => hasher,
        Err(_) => return String::new(),
    };
    hasher.update(payload.as_bytes());

    BASE64_STANDARD.encode(hasher.finalize().into_bytes())
}

impl Client {
    pub async fn parse_request<B, T: FromMap>(&self, req: Request<B>) -> Result<Box<T>, TwilioError>
    where
        B: Body<Data = Bytes>,
    {
        let signature = req
            .headers()
            .get("X-Twilio-Signature")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|_| TwilioError::BadRequest)?
            .to_bytes();

        let (args, signed_params) = match parts.method {
            Method::GET => {
                let path = parts
                    .uri
                    .path_and_query()
                    .map(|p| p.as_str())
                    .unwrap_or("");
                (get_args(path), BTreeMap::new())
            }
            Method::POST => {
                let postargs = args_from_urlencoded(&body);
                (postargs.clone(), postargs)
            }
            _ => return Err(TwilioError::BadRequest),
        };

        if self.validate_signatures {
            let expected = signature.ok_or(TwilioError::AuthError)?;

            let host = match parts.headers.typed_get::<Host>() {
                None => return Err(TwilioError::BadRequest),
                Some(h) => h.hostname().to_string(),
            };
            let request_path = match parts.uri.path_and_query().map(|p| p.as_str()) {
                None | Some("*") => return Err(TwilioError::BadRequest),
                Some(path) => path,
            };

            let effective_uri = format!("https://{}{}", host, request_path);
            if compute_signature(&self.auth_token, &effective_uri, &signed_params) != expected {
                return Err(TwilioError::AuthError);
            }
        }

        T::from_map(args)
    }
}
