use crate::context::{EffectiveRequestContext, Scheme};
use core::net::IpAddr;

/// A trait to look up the raw values of a header, whatever the request representation is
pub trait HeaderSource {
    /// Get all values of the header `name`, in the order they were received
    ///
    /// Header names are case-insensitive. A double-ended iterator is returned so the right-most
    /// value can be reached without collecting.
    fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str>;
}

/// An owned list of headers for servers that do not rely on the `http` crate
///
/// # Example
/// ```
/// use forwarding_normalizer::HeaderList;
///
/// let mut headers = HeaderList::new();
/// headers.append("X-Forwarded-Proto", "https");
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `name`, keeping the previous ones
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for HeaderList {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl HeaderSource for HeaderList {
    fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the listener knows about a request before any forwarding header is considered
#[derive(Debug)]
pub struct InboundConnection<'a, H: ?Sized> {
    /// Address of the immediate peer of the socket
    pub peer: IpAddr,
    /// Scheme of the listener that accepted the connection
    pub scheme: Scheme,
    /// Port of the listener that accepted the connection
    pub port: u16,
    pub headers: &'a H,
}

impl<'a, H: HeaderSource + ?Sized> InboundConnection<'a, H> {
    pub fn new(peer: IpAddr, scheme: Scheme, port: u16, headers: &'a H) -> Self {
        Self {
            peer,
            scheme,
            port,
            headers,
        }
    }

    /// The context as observed by the listener, without any forwarding header applied
    pub fn observed(&self) -> EffectiveRequestContext {
        EffectiveRequestContext::new(self.scheme, self.port, self.peer)
    }
}

#[cfg(feature = "http")]
mod http {
    use super::HeaderSource;

    impl HeaderSource for http::HeaderMap {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
        }
    }

    impl<T> HeaderSource for http::Request<T> {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.headers().header_values(name)
        }
    }

    impl HeaderSource for http::request::Parts {
        fn header_values(&self, name: &str) -> impl DoubleEndedIterator<Item = &str> {
            self.headers.header_values(name)
        }
    }
}
