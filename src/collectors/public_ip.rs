//! Public address lookup through an HTTP echo service.

use crate::cache::{ReadContext, Source, SourceId};
use crate::error::{MonitorError, Result};
use crate::subprocess::run_with_timeout_stdout;
use std::net::Ipv4Addr;
use std::time::Duration;

const ENDPOINTS: [&str; 2] = ["ifconfig.me", "icanhazip.com"];
const CURL_TIMEOUT: Duration = Duration::from_secs(3);

/// Shown until the first lookup completes.
pub const CHECKING: &str = "Checking...";

/// Shown when no endpoint answered with an IPv4 address.
pub const UNKNOWN: &str = "N/A";

/// Asks each endpoint in turn for this host's public IPv4 address.
#[derive(Debug)]
pub struct PublicIpSource {
    endpoints: Vec<String>,
}

impl Default for PublicIpSource {
    fn default() -> Self {
        Self { endpoints: ENDPOINTS.iter().map(|e| (*e).to_string()).collect() }
    }
}

impl PublicIpSource {
    /// Queries the given endpoints instead of the built-in ones.
    pub fn with_endpoints(endpoints: Vec<String>) -> Self {
        Self { endpoints }
    }
}

impl Source for PublicIpSource {
    type Output = String;

    fn id(&self) -> SourceId {
        SourceId::PublicIp
    }

    fn read(&mut self, _ctx: &ReadContext) -> Result<String> {
        for endpoint in &self.endpoints {
            let body = run_with_timeout_stdout("curl", &["-s", "--max-time", "2", endpoint], CURL_TIMEOUT);
            if let Some(ip) = body.as_deref().and_then(parse_ipv4_response) {
                return Ok(ip);
            }
            crate::trace!("public_ip", "{endpoint}: no usable answer");
        }
        Err(MonitorError::unavailable("public_ip", "no endpoint answered"))
    }

    fn sentinel(&self) -> String {
        UNKNOWN.to_string()
    }

    fn deferred_at_startup(&self) -> bool {
        true
    }

    fn placeholder(&self) -> String {
        CHECKING.to_string()
    }
}

/// Accepts a response body consisting of one dotted-quad address.
pub fn parse_ipv4_response(body: &str) -> Option<String> {
    let candidate = body.trim();
    candidate.parse::<Ipv4Addr>().ok().map(|_| candidate.to_string())
}
