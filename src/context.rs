use core::fmt;
use core::net::IpAddr;
use core::str::FromStr;

/// Scheme of a request, as seen by the listener or as reported by a trusted proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Standard port of the scheme: 80 for http and 443 for https
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scheme `{0}`")]
pub struct UnknownScheme(pub String);

impl FromStr for Scheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(UnknownScheme(s.to_string()))
        }
    }
}

/// The view of a request that application code should rely on
///
/// Built by [`normalize`](crate::normalize), it cannot be modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectiveRequestContext {
    scheme: Scheme,
    port: u16,
    client_ip: IpAddr,
}

impl EffectiveRequestContext {
    pub(crate) fn new(scheme: Scheme, port: u16, client_ip: IpAddr) -> Self {
        Self {
            scheme,
            port,
            client_ip,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_ip(&self) -> IpAddr {
        self.client_ip
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }
}
