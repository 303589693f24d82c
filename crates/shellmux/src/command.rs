//! Shell text emitted on the control connection
//!
//! The remote side is an unmodified bash reading commands from the control
//! connection, so every request is a single line of plain shell. It opens a
//! fresh TCP connection back to the hub with `/dev/tcp`, announces itself
//! with `<session hex> <stream hex>\n`, then runs the command with stdin and
//! stdout bound to that connection.

use shellmux_proto::{Header, SessionHeader, StreamHeader};
use std::fmt;
use std::net::SocketAddr;

/// Address the shell dials back to, in `/dev/tcp` form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port part
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host, self.port)
    }
}

/// Build the control line that opens stream `stream` of session `session`
pub fn stream_command(
    session: &SessionHeader,
    stream: &StreamHeader,
    endpoint: &Endpoint,
    command: &str,
) -> String {
    // Leading space keeps the line out of history under HISTCONTROL=ignorespace.
    format!(
        " {{ echo {} {}; {} ; }} 0<>/dev/tcp/{} 1>&0 &\n",
        session.to_hex(),
        stream.to_hex(),
        command,
        endpoint,
    )
}
