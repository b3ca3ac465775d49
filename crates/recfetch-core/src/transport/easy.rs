//! libcurl-backed transport.

use std::str;
use std::time::Duration;

use super::parse::parse_header_lines;
use super::{HttpResponse, Transport, TransportError};
use crate::request::FetchRequest;

/// Connect timeout, independent of the per-attempt total timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking GET through a fresh curl easy handle per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for CurlTransport {
    fn get(&self, request: &FetchRequest) -> Result<HttpResponse, TransportError> {
        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(request.url().as_str())?;
        easy.get(true)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(CONNECT_TIMEOUT.min(request.timeout()))?;
        easy.timeout(request.timeout())?;

        let mut list = curl::easy::List::new();
        for (k, v) in request.headers() {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(HttpResponse {
            status,
            headers: parse_header_lines(&header_lines),
            body,
        })
    }
}
