//! Notification transport over `EspHttpConnection`
//!
//! TLS runs without certificate verification (see sdkconfig.defaults).

use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::{Read, Write};

use picofcm_mcu::{HttpClient, HttpResponse};

/// Largest response body kept for logging
const MAX_BODY: usize = 512;

#[derive(Default)]
pub struct EspHttp;

impl HttpClient for EspHttp {
    type Error = anyhow::Error;

    fn post_json(&mut self, url: &str, body: &[u8]) -> anyhow::Result<HttpResponse> {
        let connection = EspHttpConnection::new(&Configuration {
            use_global_ca_store: false,
            crt_bundle_attach: None,
            ..Default::default()
        })?;
        let mut client = Client::wrap(connection);

        let length = body.len().to_string();
        let headers = [
            ("content-type", "application/json"),
            ("content-length", length.as_str()),
        ];
        let mut request = client.post(url, &headers)?;
        request.write_all(body)?;
        request.flush()?;

        let mut response = request.submit()?;
        let status = response.status();

        let mut buf = [0u8; MAX_BODY];
        let mut len = 0;
        while len < buf.len() {
            match response.read(&mut buf[len..])? {
                0 => break,
                n => len += n,
            }
        }

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&buf[..len]).into_owned(),
        })
    }
}
