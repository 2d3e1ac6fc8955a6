use std::time::Duration;

use reqwest::StatusCode;

use crate::tidal_rs::types::{DeviceAuthorization, TokenErrorResponse, TokenResponse};

const DEVICE_AUTHORIZATION_URL: &str = "https://auth.tidal.com/v1/oauth2/device_authorization";
const TOKEN_URL: &str = "https://auth.tidal.com/v1/oauth2/token";
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

const SCOPE: &str = "r_usr w_usr w_sub";

#[derive(Debug, thiserror::Error)]
pub enum DeviceLoginError {
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
    #[error("Authorization was rejected: {reason}")]
    Rejected { reason: String },
    #[error("Login link expired before it was authorized")]
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshTokenError {
    #[error("Failed to send http request: {0}")]
    FailedToSendRequest(reqwest::Error),
    #[error("Failed to parse response: {0}")]
    FailedToParseResponse(reqwest::Error),
    #[error("Refresh token was rejected: {reason}")]
    Rejected { reason: String },
}

/// Request a device-code grant: the user visits the returned link while we
/// poll the token endpoint.
/// https://datatracker.ietf.org/doc/html/rfc8628
pub async fn request_device_authorization(
    client: &reqwest::Client,
    client_id: &str,
) -> Result<DeviceAuthorization, DeviceLoginError> {
    let params = [("client_id", client_id), ("scope", SCOPE)];

    let response = client
        .post(DEVICE_AUTHORIZATION_URL)
        .form(&params)
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(DeviceLoginError::FailedToSendRequest)?
        .error_for_status()
        .map_err(DeviceLoginError::FailedToSendRequest)?;

    response
        .json()
        .await
        .map_err(DeviceLoginError::FailedToParseResponse)
}

/// Poll the token endpoint until the user authorizes the device, the grant
/// expires, or Tidal rejects the request outright.
pub async fn poll_for_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: Option<&str>,
    grant: &DeviceAuthorization,
) -> Result<TokenResponse, DeviceLoginError> {
    let interval = Duration::from_secs(grant.interval.max(1));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(grant.expires_in);

    loop {
        tokio::time::sleep(interval).await;
        if tokio::time::Instant::now() >= deadline {
            return Err(DeviceLoginError::TimedOut);
        }

        let params = [
            ("client_id", client_id),
            ("device_code", grant.device_code.as_str()),
            ("grant_type", DEVICE_GRANT_TYPE),
            ("scope", SCOPE),
        ];
        let mut request = client
            .post(TOKEN_URL)
            .form(&params)
            .timeout(Duration::from_secs(10));
        if let Some(secret) = client_secret {
            request = request.basic_auth(client_id, Some(secret));
        }

        let response = request
            .send()
            .await
            .map_err(DeviceLoginError::FailedToSendRequest)?;

        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(DeviceLoginError::FailedToParseResponse);
        }

        let status = response.status();
        let error: TokenErrorResponse = response
            .json()
            .await
            .map_err(DeviceLoginError::FailedToParseResponse)?;

        match error.error.as_deref() {
            Some("authorization_pending") => {
                tracing::debug!("authorization pending, still polling");
            }
            _ => {
                return Err(DeviceLoginError::Rejected {
                    reason: error
                        .error_description
                        .or(error.error)
                        .unwrap_or_else(|| format!("token endpoint returned {status}")),
                });
            }
        }
    }
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh_token(
    client: &reqwest::Client,
    client_id: &str,
    client_secret: Option<&str>,
    refresh_token: &str,
) -> Result<TokenResponse, RefreshTokenError> {
    let params = [
        ("client_id", client_id),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
        ("scope", SCOPE),
    ];
    let mut request = client
        .post(TOKEN_URL)
        .form(&params)
        .timeout(Duration::from_secs(10));
    if let Some(secret) = client_secret {
        request = request.basic_auth(client_id, Some(secret));
    }

    let response = request
        .send()
        .await
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    if response.status() == StatusCode::UNAUTHORIZED || response.status() == StatusCode::BAD_REQUEST
    {
        let error: TokenErrorResponse = response
            .json()
            .await
            .map_err(RefreshTokenError::FailedToParseResponse)?;
        return Err(RefreshTokenError::Rejected {
            reason: error
                .error_description
                .or(error.error)
                .unwrap_or_else(|| "no reason given".to_string()),
        });
    }

    let response = response
        .error_for_status()
        .map_err(RefreshTokenError::FailedToSendRequest)?;

    response
        .json()
        .await
        .map_err(RefreshTokenError::FailedToParseResponse)
}
