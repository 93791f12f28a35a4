//! HTTP client construction for the content origin
//!
//! Every request to ccMixter carries a fixed identifying header set. The
//! origin's download hosts present certificates that fail hostname
//! validation, so certificate and hostname checks are disabled for this
//! client. That is a deliberate man-in-the-middle exposure, confined to this
//! one constructor; do not reuse the client for other origins.

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;

/// Site origin, sent as the `Referer` header
pub const SITE_ORIGIN: &str = "https://ccmixter.org/";

/// Fixed User-Agent for all outbound requests
pub const USER_AGENT: &str = "cratedig/0.1.0";

/// Build the shared client: identifying headers, relaxed TLS, no timeout
///
/// No request timeout is set: fetch cancellation is cooperative, and a
/// stalled transfer is the caller's accepted limitation.
pub fn build_client() -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(SITE_ORIGIN));

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
}
