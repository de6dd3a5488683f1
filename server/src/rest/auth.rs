// server/src/rest/auth.rs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use models::errors::{ClinicError, ClinicResult};
use models::medical::Caller;

use crate::state::AppState;

const BASIC_PREFIX: &str = "Basic ";

/// Splits an `Authorization: Basic ...` header into username and password.
pub fn parse_basic(header: &str) -> ClinicResult<(String, String)> {
    let encoded = header
        .trim()
        .strip_prefix(BASIC_PREFIX)
        .ok_or_else(|| ClinicError::Unauthenticated("expected Basic credentials".to_string()))?;
    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ClinicError::Unauthenticated("credentials are not valid base64".to_string()))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| ClinicError::Unauthenticated("credentials are not valid UTF-8".to_string()))?;
    match decoded.split_once(':') {
        Some((username, password)) => Ok((username.to_string(), password.to_string())),
        None => Err(ClinicError::Unauthenticated("malformed credentials".to_string())),
    }
}

/// Resolves the request's caller, or Unauthenticated when no valid credentials were sent.
pub async fn caller_from_header(state: &AppState, header: Option<String>) -> ClinicResult<Caller> {
    let header = header
        .ok_or_else(|| ClinicError::Unauthenticated("missing Authorization header".to_string()))?;
    let (username, password) = parse_basic(&header)?;
    state.directory.authenticate(&username, &password).await
}
