//! Parsing of the RFC 7239 `Forwarded` header
//!
//! A header value is a comma separated list of elements, each element being a `;` separated list
//! of `key=value` pairs: `for=192.0.2.60;proto=https;by=203.0.113.43, for="[2001:db8::1]:4711"`.
//! Only the `for` and `proto` parameters are read.

use core::net::IpAddr;

/// One element of a `Forwarded` header, with values already unquoted
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ForwardedElement<'a> {
    pub for_node: Option<&'a str>,
    pub proto: Option<&'a str>,
}

impl<'a> ForwardedElement<'a> {
    pub fn parse(element: &'a str) -> Self {
        let mut parsed = Self::default();

        for item in element.split(';') {
            let mut kv = item.splitn(2, '=');
            let key = kv.next().map(|s| s.trim()).unwrap_or_default();
            let value = kv.next().map(unquote).unwrap_or_default();

            if value.is_empty() {
                continue;
            }

            // parameter names are case-insensitive
            if key.eq_ignore_ascii_case("for") {
                parsed.for_node = Some(value);
            } else if key.eq_ignore_ascii_case("proto") {
                parsed.proto = Some(value);
            }
        }

        parsed
    }

    /// Address of the `for` node, `None` for obfuscated identifiers, `unknown` or garbage
    pub fn for_ip(&self) -> Option<IpAddr> {
        self.for_node.and_then(parse_node)
    }
}

/// Iterate over the elements of all `Forwarded` values, in header order
pub(crate) fn elements<'a, I>(values: I) -> impl DoubleEndedIterator<Item = ForwardedElement<'a>>
where
    I: DoubleEndedIterator<Item = &'a str>,
{
    values
        .flat_map(|vals| vals.split(','))
        .map(ForwardedElement::parse)
}

/// Trim whitespace then any quote marks.
pub(crate) fn unquote(val: &str) -> &str {
    val.trim().trim_start_matches('"').trim_end_matches('"')
}

/// Remove port and IPv6 square brackets from a node.
pub(crate) fn bare_address(val: &str) -> &str {
    if val.starts_with('[') {
        val.split("]:")
            .next()
            .map(|s| s.trim_start_matches('[').trim_end_matches(']'))
            .unwrap_or(val)
    } else if val.matches(':').count() == 1 {
        // ipv4 with a port
        val.split(':').next().unwrap_or(val)
    } else {
        val
    }
}

/// Parse a node (`1.2.3.4`, `1.2.3.4:80`, `[::1]`, `[::1]:80` or a bare ipv6) as an ip address
pub(crate) fn parse_node(val: &str) -> Option<IpAddr> {
    bare_address(unquote(val)).parse().ok()
}
