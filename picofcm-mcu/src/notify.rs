//! Notification sender
//!
//! Builds the single outbound message `{token, title, body}` and POSTs it to
//! the configured endpoint. One request per call, no retries.

use log::*;
use serde::Serialize;

use crate::credentials::NotificationEndpoint;
use crate::error::NotifyError;
use crate::http::HttpClient;
use crate::wifi::WifiStatus;

/// JSON body sent to the endpoint
#[derive(Debug, Serialize)]
struct NotificationPayload<'a> {
    token: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Send one notification
///
/// Only an HTTP 200 counts as delivered.
pub fn send<H: HttpClient>(
    http: &mut H,
    wifi: WifiStatus,
    endpoint: &NotificationEndpoint,
    title: &str,
    body: &str,
) -> Result<(), NotifyError> {
    if wifi != WifiStatus::Connected {
        error!("Cannot send notification: WiFi not connected");
        return Err(NotifyError::NotConnected);
    }
    if !endpoint.is_configured() {
        error!("Cannot send notification: FCM URL or token not configured");
        return Err(NotifyError::NotConfigured);
    }

    let payload = NotificationPayload {
        token: endpoint.token.as_str(),
        title,
        body,
    };
    let payload = serde_json::to_vec(&payload).map_err(NotifyError::Serialize)?;

    let response = http
        .post_json(endpoint.url.as_str(), &payload)
        .map_err(|e| {
            error!("Error on sending POST: {e:?}");
            NotifyError::TransportFailure(format!("{e:?}"))
        })?;

    info!("HTTP response code: {}", response.status);
    debug!("HTTP response body: {}", response.body);

    if response.status != 200 {
        warn!("Notification rejected with HTTP {}", response.status);
        return Err(NotifyError::HttpStatus(response.status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{FcmToken, FcmUrl};
    use crate::testing::FakeHttp;

    fn endpoint(url: &str, token: &str) -> NotificationEndpoint {
        NotificationEndpoint {
            url: FcmUrl::new(url),
            token: FcmToken::new(token),
        }
    }

    #[test]
    fn requires_wifi_before_configuration() {
        let mut http = FakeHttp::responding(200);
        for wifi in [WifiStatus::Disconnected, WifiStatus::Connecting, WifiStatus::Idle] {
            let result = send(&mut http, wifi, &endpoint("", ""), "t", "b");
            assert!(matches!(result, Err(NotifyError::NotConnected)));
            let result = send(&mut http, wifi, &endpoint("https://a", "tok"), "t", "b");
            assert!(matches!(result, Err(NotifyError::NotConnected)));
        }
        assert!(http.requests.is_empty());
    }

    #[test]
    fn requires_url_and_token() {
        let mut http = FakeHttp::responding(200);
        for (url, token) in [("", "tok"), ("https://a", ""), ("", "")] {
            let result = send(&mut http, WifiStatus::Connected, &endpoint(url, token), "t", "b");
            assert!(matches!(result, Err(NotifyError::NotConfigured)));
        }
        assert!(http.requests.is_empty());
    }

    #[test]
    fn posts_payload_and_accepts_200() {
        let mut http = FakeHttp::responding(200);
        send(
            &mut http,
            WifiStatus::Connected,
            &endpoint("https://example.com/notify", "device-token"),
            "Door",
            "Opened",
        )
        .unwrap();

        assert_eq!(http.requests.len(), 1);
        let (url, body) = &http.requests[0];
        assert_eq!(url, "https://example.com/notify");
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"token": "device-token", "title": "Door", "body": "Opened"})
        );
    }

    #[test]
    fn other_statuses_fail_without_retry() {
        for status in [201, 400, 500] {
            let mut http = FakeHttp::responding(status);
            let result = send(&mut http, WifiStatus::Connected, &endpoint("https://a", "t"), "t", "b");
            assert!(matches!(result, Err(NotifyError::HttpStatus(s)) if s == status));
            assert_eq!(http.requests.len(), 1);
        }
    }

    #[test]
    fn transport_errors_are_reported() {
        let mut http = FakeHttp::failing();
        let result = send(&mut http, WifiStatus::Connected, &endpoint("https://a", "t"), "t", "b");
        assert!(matches!(result, Err(NotifyError::TransportFailure(_))));
        assert_eq!(http.requests.len(), 1);
    }
}
