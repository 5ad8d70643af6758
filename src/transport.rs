//! Transport seam between the client and the hub.
//!
//! All hub traffic funnels through [`HubTransport::exchange`]: one
//! request/response round trip for a path relative to the API root, an
//! optional JSON body, and an HTTP method. The blocking `ureq` implementation
//! lives here; tests substitute their own transports through the trait.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::Read;

pub const DEFAULT_PORT: u16 = 80;

/// HTTP methods the hub understands. `Put` is the default for commands
/// carried by schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::Put
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum TransportError {
    /// Connection refused, timeout, malformed URL, protocol error.
    Transport(String),
    /// The hub answered with a non-success HTTP status.
    Http { status: u16, message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Transport(s) => write!(f, "transport error: {}", s),
            TransportError::Http { status, message } => write!(f, "http {}: {}", status, message),
        }
    }
}

impl std::error::Error for TransportError {}

/// One request/response exchange against the hub.
///
/// `path` is relative to the API root established at construction; an empty
/// path addresses the root resource itself.
pub trait HubTransport {
    fn exchange(&self, path: &str, body: Option<&Value>, method: Method)
        -> Result<Vec<u8>, TransportError>;
}

impl<T: HubTransport> HubTransport for &T {
    fn exchange(
        &self,
        path: &str,
        body: Option<&Value>,
        method: Method,
    ) -> Result<Vec<u8>, TransportError> {
        T::exchange(self, path, body, method)
    }
}

/// Blocking HTTP transport rooted at `http://{host}:{port}/api/{app_key}`.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpTransport {
    pub fn new(host: &str, port: u16, app_key: &str) -> Self {
        let agent = ureq::AgentBuilder::new().build();
        HttpTransport {
            agent,
            base_url: format!("http://{}:{}/api/{}", host, port, app_key),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl HubTransport for HttpTransport {
    fn exchange(
        &self,
        path: &str,
        body: Option<&Value>,
        method: Method,
    ) -> Result<Vec<u8>, TransportError> {
        let url = self.url(path);
        let req = self
            .agent
            .request(method.as_str(), &url)
            .set("Accept", "application/json");

        let resp = match body {
            Some(v) => req.send_json(v.clone()),
            None => req.call(),
        };

        match resp {
            Ok(r) => {
                let mut buf = Vec::new();
                r.into_reader()
                    .read_to_end(&mut buf)
                    .map_err(|e| TransportError::Transport(e.to_string()))?;
                Ok(buf)
            }
            Err(ureq::Error::Transport(t)) => Err(TransportError::Transport(t.to_string())),
            Err(ureq::Error::Status(status, r)) => {
                let message = r.into_string().unwrap_or_else(|_| String::from("<no body>"));
                Err(TransportError::Http { status, message })
            }
        }
    }
}
