//! Interpretation of raw store responses

use hyper::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result, StoreError};
use crate::executor::RawResponse;
use crate::types::KeyResponse;

/// Turn a raw response into a [`KeyResponse`], or into the typed error the store reported
pub fn key_response(raw: RawResponse) -> Result<KeyResponse> {
    let raw = check_status(raw)?;
    let response: KeyResponse = serde_json::from_slice(&raw.body)?;
    Ok(response.with_headers(&raw.headers))
}

/// Decode the JSON body of a successful response
pub fn json<T: DeserializeOwned>(raw: RawResponse) -> Result<T> {
    let raw = check_status(raw)?;
    Ok(serde_json::from_slice(&raw.body)?)
}

/// Pass successful responses through; map everything else to an [`Error`].
///
/// A body in the store's error format wins over the status code, so a 404 carrying
/// error code 100 becomes [`Error::KeyNotFound`] and a 412 carrying 101 becomes
/// [`Error::TestFailed`].
pub fn check_status(raw: RawResponse) -> Result<RawResponse> {
    if raw.status.is_success() {
        return Ok(raw);
    }
    if let Ok(err) = serde_json::from_slice::<StoreError>(&raw.body) {
        return Err(Error::from_store(err));
    }
    match raw.status {
        StatusCode::UNAUTHORIZED => Err(Error::Unauthorized),
        status => Err(Error::ServerError {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&raw.body).trim().to_string(),
        }),
    }
}
