use crate::config::{SchemeHeader, TrustPolicy};
use crate::context::{EffectiveRequestContext, Scheme};
use crate::error::Ignored;
use crate::extract::{HeaderSource, InboundConnection};
use crate::forwarded::{self, ForwardedElement};
use core::net::IpAddr;

const FORWARDED: &str = "forwarded";

/// Derive the effective scheme, port and client address of a connection
///
/// Forwarding headers are only read when the immediate peer is a trusted proxy, otherwise the
/// observed values are returned unchanged. Malformed or unrecognized values are skipped.
///
/// # Example
/// ```
/// use forwarding_normalizer::{normalize, HeaderList, InboundConnection, Scheme, TrustPolicy};
///
/// let mut policy = TrustPolicy::new();
/// policy.add_trusted_proxy("10.0.0.0/8").unwrap();
///
/// let mut headers = HeaderList::new();
/// headers.append("X-Forwarded-Proto", "HTTPS");
///
/// let conn = InboundConnection::new("10.0.0.2".parse().unwrap(), Scheme::Http, 8080, &headers);
/// let context = normalize(&conn, &policy);
///
/// assert_eq!(context.scheme(), Scheme::Https);
/// assert_eq!(context.port(), 443);
/// ```
pub fn normalize<H: HeaderSource + ?Sized>(
    conn: &InboundConnection<'_, H>,
    policy: &TrustPolicy,
) -> EffectiveRequestContext {
    let observed = conn.observed();

    if let Err(reason) = check_peer(&conn.peer, policy) {
        // if the peer address is not trusted, we can't trust the headers
        tracing::trace!(peer = %conn.peer, %reason, "forwarding headers ignored");

        return observed;
    }

    let element = if policy.is_forwarded_trusted {
        forwarded_element(conn.headers, policy)
    } else {
        None
    };

    let scheme = element
        .and_then(|element| element.proto)
        .and_then(|proto| skip(forwarded_scheme(proto)))
        .or_else(|| header_scheme(conn.headers, policy));

    let (scheme, port) = match scheme {
        Some(scheme) => (
            scheme,
            header_port(conn.headers, policy).unwrap_or_else(|| scheme.default_port()),
        ),
        None => (observed.scheme(), observed.port()),
    };

    let client_ip = element
        .and_then(|element| element.for_node)
        .and_then(|node| skip(parse_client(FORWARDED, node)))
        .or_else(|| header_client(conn.headers, policy))
        .unwrap_or(conn.peer);

    EffectiveRequestContext::new(scheme, port, client_ip)
}

/// Normalize a request and store the resulting context in its extensions
///
/// Downstream handlers can then fetch it with
/// `request.extensions().get::<EffectiveRequestContext>()`.
#[cfg(feature = "http")]
pub fn normalize_request<B>(
    request: &mut http::Request<B>,
    peer: IpAddr,
    scheme: Scheme,
    port: u16,
    policy: &TrustPolicy,
) -> EffectiveRequestContext {
    let context = normalize(&InboundConnection::new(peer, scheme, port, &*request), policy);
    request.extensions_mut().insert(context);

    context
}

fn check_peer(peer: &IpAddr, policy: &TrustPolicy) -> Result<(), Ignored> {
    if policy.is_trusted(peer) {
        Ok(())
    } else {
        Err(Ignored::UntrustedPeer)
    }
}

/// Log an ignored value and move on
fn skip<T>(result: Result<T, Ignored>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(reason) => {
            tracing::debug!(%reason, "forwarding header ignored");

            None
        }
    }
}

/// All entries of a header, splitting comma separated chains, in the order they were appended
fn entries<'a, H: HeaderSource + ?Sized>(
    headers: &'a H,
    name: &'a str,
) -> impl DoubleEndedIterator<Item = &'a str> {
    headers
        .header_values(name)
        .flat_map(|vals| vals.split(','))
        .map(|s| s.trim())
}

fn forwarded_element<'a, H: HeaderSource + ?Sized>(
    headers: &'a H,
    policy: &TrustPolicy,
) -> Option<ForwardedElement<'a>> {
    let mut elements = forwarded::elements(headers.header_values(FORWARDED));

    if !policy.is_chain_validated {
        return policy.chain_direction.pick(elements);
    }

    // quote from RFC 7239:
    // A proxy server that wants to add a new "Forwarded" header field value
    //    can either append it to the last existing "Forwarded" header field
    //    after a comma separator or add a new field at the end of the header
    //    block.
    // --- https://datatracker.ietf.org/doc/html/rfc7239#section-4
    // so we get the values in reverse order as we want to get the first untrusted value
    elements.rfind(|element| match element.for_ip() {
        Some(ip) => !policy.is_trusted(&ip),
        None => true,
    })
}

fn forwarded_scheme(proto: &str) -> Result<Scheme, Ignored> {
    proto
        .parse()
        .map_err(|_| Ignored::unrecognized(FORWARDED, proto))
}

fn parse_scheme(header: &SchemeHeader, value: &str) -> Result<Scheme, Ignored> {
    header
        .classify(value)
        .ok_or_else(|| Ignored::unrecognized(header.name(), value))
}

fn parse_port(header: &str, value: &str) -> Result<u16, Ignored> {
    // `u16::from_str` accepts a leading `+`
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Ignored::malformed(header, value));
    }

    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Ignored::malformed(header, value)),
    }
}

fn parse_client(header: &str, value: &str) -> Result<IpAddr, Ignored> {
    forwarded::parse_node(value).ok_or_else(|| Ignored::malformed(header, value))
}

/// First scheme header, in precedence order, carrying a recognized token
fn header_scheme<H: HeaderSource + ?Sized>(headers: &H, policy: &TrustPolicy) -> Option<Scheme> {
    policy.scheme_headers.iter().find_map(|header| {
        policy
            .chain_direction
            .pick(entries(headers, header.name()))
            .and_then(|value| skip(parse_scheme(header, value)))
    })
}

fn header_port<H: HeaderSource + ?Sized>(headers: &H, policy: &TrustPolicy) -> Option<u16> {
    policy.port_headers.iter().find_map(|name| {
        policy
            .chain_direction
            .pick(entries(headers, name))
            .and_then(|value| skip(parse_port(name, value)))
    })
}

fn header_client<H: HeaderSource + ?Sized>(headers: &H, policy: &TrustPolicy) -> Option<IpAddr> {
    policy.client_headers.iter().find_map(|name| {
        if policy.is_chain_validated {
            skip(walk_chain(headers, name, policy)).flatten()
        } else {
            policy
                .chain_direction
                .pick(entries(headers, name))
                .and_then(|value| skip(parse_client(name, value)))
        }
    })
}

/// Walk a chain from the right, skipping trusted hops, and return the first untrusted address
///
/// A malformed entry stops the walk as nothing on its left can be attributed to a trusted hop.
fn walk_chain<H: HeaderSource + ?Sized>(
    headers: &H,
    name: &str,
    policy: &TrustPolicy,
) -> Result<Option<IpAddr>, Ignored> {
    for value in entries(headers, name).rev() {
        let ip = parse_client(name, value)?;

        if !policy.is_trusted(&ip) {
            return Ok(Some(ip));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainDirection;
    use crate::extract::HeaderList;

    fn ip(value: &str) -> IpAddr {
        value.parse().unwrap()
    }

    fn headers(list: &[(&str, &str)]) -> HeaderList {
        list.iter().copied().collect()
    }

    fn run(peer: &str, list: &[(&str, &str)], policy: &TrustPolicy) -> EffectiveRequestContext {
        let headers = headers(list);

        normalize(&InboundConnection::new(ip(peer), Scheme::Http, 8080, &headers), policy)
    }

    #[test]
    fn untrusted_peer_keeps_observed_values() {
        let policy = TrustPolicy::new_local();
        let context = run(
            "1.1.1.1",
            &[
                ("X-Forwarded-Proto", "https"),
                ("X-Forwarded-Ssl", "on"),
                ("X-Forwarded-Port", "8443"),
                ("X-Forwarded-For", "8.8.8.8"),
                ("Forwarded", "for=8.8.4.4;proto=https"),
            ],
            &policy,
        );

        assert_eq!(context, EffectiveRequestContext::new(Scheme::Http, 8080, ip("1.1.1.1")));
    }

    #[test]
    fn empty_policy_trusts_nobody() {
        let policy = TrustPolicy::new();
        let context = run("127.0.0.1", &[("X-Forwarded-Proto", "https")], &policy);

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 8080);
    }

    #[test]
    fn ipv4_mapped_trusted_peer() {
        let policy = TrustPolicy::new_local();
        let context = run("::ffff:10.0.0.1", &[("X-Forwarded-Proto", "https")], &policy);

        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.port(), 443);
        assert_eq!(context.client_ip(), ip("::ffff:10.0.0.1"));
    }

    #[test]
    fn ipv4_mapped_untrusted_peer() {
        let policy = TrustPolicy::new_local();
        let context = run("::ffff:8.8.8.8", &[("X-Forwarded-Proto", "https")], &policy);

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 8080);
    }

    #[test]
    fn ipv4_mapped_hops_are_skipped() {
        let mut policy = TrustPolicy::new_local();
        policy.validate_chain();

        let context = run(
            "10.0.0.1",
            &[("X-Forwarded-For", "8.8.8.8, ::ffff:10.0.0.2")],
            &policy,
        );

        assert_eq!(context.client_ip(), ip("8.8.8.8"));
    }

    #[test]
    fn next_client_header_when_malformed() {
        let mut policy = TrustPolicy::new_local();
        policy.set_client_headers(&["x-real-ip", "x-forwarded-for"]).unwrap();

        let context = run(
            "192.168.2.60",
            &[("X-Real-IP", "garbage"), ("X-Forwarded-For", "1.1.1.1")],
            &policy,
        );
        assert_eq!(context.client_ip(), ip("1.1.1.1"));

        let context = run(
            "192.168.2.60",
            &[("X-Real-IP", "8.8.8.8"), ("X-Forwarded-For", "1.1.1.1")],
            &policy,
        );
        assert_eq!(context.client_ip(), ip("8.8.8.8"));
    }

    #[test]
    fn next_port_header_when_malformed() {
        let mut policy = TrustPolicy::new_local();
        policy
            .set_port_headers(&["x-forwarded-port", "x-original-port"])
            .unwrap();

        let context = run(
            "192.168.2.60",
            &[
                ("X-Forwarded-Proto", "https"),
                ("X-Forwarded-Port", "abc"),
                ("X-Original-Port", "8443"),
            ],
            &policy,
        );
        assert_eq!(context.port(), 8443);
    }

    #[test]
    fn port_headers_disabled() {
        let mut policy = TrustPolicy::new_local();
        policy.set_port_headers(&[]).unwrap();

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-Proto", "https"), ("X-Forwarded-Port", "8443")],
            &policy,
        );
        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.port(), 443);
    }

    #[test]
    fn added_scheme_header_is_consulted_last() {
        let mut policy = TrustPolicy::new_local();
        policy.add_scheme_header(SchemeHeader::new("Front-End-Https", &["on"], &[]).unwrap());

        let context = run("192.168.2.60", &[("Front-End-Https", "on")], &policy);
        assert_eq!(context.scheme(), Scheme::Https);

        let context = run(
            "192.168.2.60",
            &[("Front-End-Https", "on"), ("X-Forwarded-Ssl", "off")],
            &policy,
        );
        assert_eq!(context.scheme(), Scheme::Http);
    }

    #[test]
    fn trusted_peer_without_headers() {
        let policy = TrustPolicy::new_local();
        let headers = HeaderList::new();
        let conn = InboundConnection::new(ip("10.0.0.1"), Scheme::Https, 8443, &headers);

        assert_eq!(normalize(&conn, &policy), conn.observed());
    }

    #[test]
    fn x_forwarded_proto_case_insensitive() {
        let policy = TrustPolicy::new_local();

        for token in ["https", "HTTPS", "Https", " https "] {
            let context = run("192.168.2.60", &[("x-forwarded-proto", token)], &policy);

            assert_eq!(context.scheme(), Scheme::Https);
            assert_eq!(context.port(), 443);
            assert_eq!(context.client_ip(), ip("192.168.2.60"));
        }
    }

    #[test]
    fn x_forwarded_ssl() {
        let policy = TrustPolicy::new_local();
        let context = run("192.168.2.60", &[("X-Forwarded-Ssl", "ON")], &policy);

        assert!(context.is_secure());
        assert_eq!(context.port(), 443);
    }

    #[test]
    fn insecure_token_downgrades() {
        let policy = TrustPolicy::new_local();
        let headers = headers(&[("X-Forwarded-Proto", "http")]);
        let conn = InboundConnection::new(ip("10.0.0.1"), Scheme::Https, 8443, &headers);
        let context = normalize(&conn, &policy);

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 80);
    }

    #[test]
    fn unrecognized_token_is_ignored() {
        let policy = TrustPolicy::new_local();

        for token in ["yes", "true", "1", "https-ish", "ftp", ""] {
            let context = run(
                "192.168.2.60",
                &[("X-Forwarded-Proto", token), ("X-Forwarded-Ssl", token)],
                &policy,
            );

            assert_eq!(
                context,
                EffectiveRequestContext::new(Scheme::Http, 8080, ip("192.168.2.60"))
            );
        }
    }

    #[test]
    fn first_recognized_header_wins() {
        let policy = TrustPolicy::new_local();

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-Proto", "bogus"), ("X-Forwarded-Ssl", "on")],
            &policy,
        );
        assert_eq!(context.scheme(), Scheme::Https);

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-Ssl", "on"), ("X-Forwarded-Proto", "http")],
            &policy,
        );
        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 80);
    }

    #[test]
    fn custom_scheme_header() {
        let mut policy = TrustPolicy::new_local();
        policy.set_scheme_headers(vec![SchemeHeader::new("Front-End-Https", &["on"], &[]).unwrap()]);

        let context = run("192.168.2.60", &[("X-Forwarded-Proto", "https")], &policy);
        assert_eq!(context.scheme(), Scheme::Http);

        let context = run("192.168.2.60", &[("front-end-https", "On")], &policy);
        assert_eq!(context.scheme(), Scheme::Https);
    }

    #[test]
    fn forwarded_port() {
        let policy = TrustPolicy::new_local();

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-Proto", "https"), ("X-Forwarded-Port", "8443")],
            &policy,
        );
        assert_eq!(context.port(), 8443);

        for port in ["0", "65536", "-1", "+8443", "443abc", " 1 2", ""] {
            let context = run(
                "192.168.2.60",
                &[("X-Forwarded-Proto", "https"), ("X-Forwarded-Port", port)],
                &policy,
            );
            assert_eq!(context.port(), 443);
        }

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-Proto", "https"), ("X-Forwarded-Port", "65535")],
            &policy,
        );
        assert_eq!(context.port(), 65535);
    }

    #[test]
    fn forwarded_port_without_scheme() {
        let policy = TrustPolicy::new_local();
        let context = run("192.168.2.60", &[("X-Forwarded-Port", "8443")], &policy);

        assert_eq!(context.port(), 8080);
    }

    #[test]
    fn chain_direction() {
        let mut policy = TrustPolicy::new_local();
        let list = [
            ("X-Forwarded-Proto", "http, https"),
            ("X-Forwarded-For", "1.1.1.1, 8.8.8.8"),
        ];

        let context = run("192.168.2.60", &list, &policy);
        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.client_ip(), ip("8.8.8.8"));

        policy.set_chain_direction(ChainDirection::LeftMost);

        let context = run("192.168.2.60", &list, &policy);
        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 80);
        assert_eq!(context.client_ip(), ip("1.1.1.1"));
    }

    #[test]
    fn chain_across_header_lines() {
        let policy = TrustPolicy::new_local();
        let context = run(
            "192.168.2.60",
            &[
                ("X-Forwarded-For", "1.1.1.1"),
                ("X-Forwarded-For", "8.8.8.8"),
                ("X-Forwarded-Proto", "http"),
                ("X-Forwarded-Proto", "https"),
            ],
            &policy,
        );

        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.client_ip(), ip("8.8.8.8"));
    }

    #[test]
    fn empty_chain_entry_is_ignored() {
        let policy = TrustPolicy::new_local();
        let context = run("192.168.2.60", &[("X-Forwarded-Proto", "https, ")], &policy);

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.port(), 8080);
    }

    #[test]
    fn x_forwarded_for() {
        let policy = TrustPolicy::new_local();

        let context = run("192.168.2.60", &[("X-Forwarded-For", "1.1.1.1:4711")], &policy);
        assert_eq!(context.client_ip(), ip("1.1.1.1"));

        let context = run("192.168.2.60", &[("X-Forwarded-For", "[2001:db8::1]:80")], &policy);
        assert_eq!(context.client_ip(), ip("2001:db8::1"));

        let context = run("192.168.2.60", &[("X-Forwarded-For", "2001:db8::2")], &policy);
        assert_eq!(context.client_ip(), ip("2001:db8::2"));

        let context = run("192.168.2.60", &[("X-Forwarded-For", "garbage")], &policy);
        assert_eq!(context.client_ip(), ip("192.168.2.60"));
    }

    #[test]
    fn single_hop_does_not_skip_trusted_entries() {
        let policy = TrustPolicy::new_local();
        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-For", "1.1.1.1, 10.0.0.2")],
            &policy,
        );

        assert_eq!(context.client_ip(), ip("10.0.0.2"));
    }

    #[test]
    fn validated_chain() {
        let mut policy = TrustPolicy::new_local();
        policy.validate_chain();

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-For", "1.1.1.1, 8.8.8.8, 10.0.0.2, 10.0.0.3")],
            &policy,
        );
        assert_eq!(context.client_ip(), ip("8.8.8.8"));

        // nothing left of a malformed entry can be attributed to a trusted hop
        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-For", "8.8.8.8, garbage, 10.0.0.2")],
            &policy,
        );
        assert_eq!(context.client_ip(), ip("192.168.2.60"));

        let context = run(
            "192.168.2.60",
            &[("X-Forwarded-For", "10.0.0.1, 10.0.0.2")],
            &policy,
        );
        assert_eq!(context.client_ip(), ip("192.168.2.60"));
    }

    #[test]
    fn forwarded_header() {
        let mut policy = TrustPolicy::new_local();
        policy.trust_forwarded();

        let context = run(
            "127.0.0.1",
            &[
                ("Forwarded", "for=192.0.2.60; proto=https; by=203.0.113.43"),
                ("X-Forwarded-Proto", "http"),
                ("X-Forwarded-For", "8.8.8.8"),
            ],
            &policy,
        );

        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.port(), 443);
        assert_eq!(context.client_ip(), ip("192.0.2.60"));
    }

    #[test]
    fn forwarded_header_not_trusted() {
        let policy = TrustPolicy::new_local();
        let context = run(
            "127.0.0.1",
            &[
                ("Forwarded", "for=192.0.2.60;proto=https"),
                ("X-Forwarded-For", "8.8.8.8"),
            ],
            &policy,
        );

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.client_ip(), ip("8.8.8.8"));
    }

    #[test]
    fn forwarded_header_fallback() {
        let mut policy = TrustPolicy::new_local();
        policy.trust_forwarded();

        // unknown proto and obfuscated node fall back to the x-forwarded headers
        let context = run(
            "127.0.0.1",
            &[
                ("Forwarded", "for=_hidden;proto=gopher"),
                ("X-Forwarded-Ssl", "on"),
                ("X-Forwarded-For", "8.8.8.8"),
            ],
            &policy,
        );

        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.client_ip(), ip("8.8.8.8"));
    }

    #[test]
    fn forwarded_multiple() {
        let mut policy = TrustPolicy::new_local();
        policy.trust_forwarded();
        let list = [(
            "Forwarded",
            "for=192.0.2.60;proto=https, for=10.0.0.5;proto=http",
        )];

        let context = run("127.0.0.1", &list, &policy);
        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.client_ip(), ip("10.0.0.5"));

        policy.validate_chain();

        let context = run("127.0.0.1", &list, &policy);
        assert_eq!(context.scheme(), Scheme::Https);
        assert_eq!(context.client_ip(), ip("192.0.2.60"));
    }

    #[test]
    fn forwarded_multiple_lines_validated() {
        let mut policy = TrustPolicy::new_local();
        policy.trust_forwarded();
        policy.validate_chain();

        let context = run(
            "127.0.0.1",
            &[
                ("Forwarded", r#"for="[2001:db8:cafe::17]:4711""#),
                ("Forwarded", "for=10.0.0.5;proto=https"),
            ],
            &policy,
        );

        assert_eq!(context.scheme(), Scheme::Http);
        assert_eq!(context.client_ip(), ip("2001:db8:cafe::17"));
    }

    #[test]
    fn idempotent() {
        let policy = TrustPolicy::new_local();
        let headers = headers(&[
            ("X-Forwarded-Proto", "https"),
            ("X-Forwarded-For", "1.1.1.1"),
        ]);
        let conn = InboundConnection::new(ip("10.0.0.1"), Scheme::Http, 80, &headers);

        assert_eq!(normalize(&conn, &policy), normalize(&conn, &policy));
    }

    #[cfg(feature = "http")]
    mod http {
        use super::*;
        use ::http::{header::HeaderName, Request};

        #[test]
        fn trusted_request() {
            let mut request = Request::get("/").body(()).unwrap();
            request.headers_mut().insert(
                HeaderName::from_static("x-forwarded-proto"),
                "HTTPS".parse().unwrap(),
            );

            let policy = TrustPolicy::new_local();
            let context = normalize(
                &InboundConnection::new(ip("192.168.2.60"), Scheme::Http, 80, &request),
                &policy,
            );

            assert_eq!(context.scheme(), Scheme::Https);
            assert_eq!(context.port(), 443);
        }

        #[test]
        fn untrusted_request() {
            let mut request = Request::get("/").body(()).unwrap();
            request.headers_mut().insert(
                HeaderName::from_static("x-forwarded-proto"),
                "https".parse().unwrap(),
            );

            let policy = TrustPolicy::new_local();
            let context = normalize(
                &InboundConnection::new(ip("1.1.1.1"), Scheme::Http, 80, &request),
                &policy,
            );

            assert_eq!(context.scheme(), Scheme::Http);
            assert_eq!(context.port(), 80);
        }

        #[test]
        fn request_extensions() {
            let mut request = Request::get("/").body(()).unwrap();
            request.headers_mut().append(
                HeaderName::from_static("x-forwarded-for"),
                "1.1.1.1".parse().unwrap(),
            );
            request.headers_mut().append(
                HeaderName::from_static("x-forwarded-ssl"),
                "on".parse().unwrap(),
            );

            let policy = TrustPolicy::new_local();
            let context = normalize_request(&mut request, ip("10.0.0.1"), Scheme::Http, 80, &policy);

            assert_eq!(context.client_ip(), ip("1.1.1.1"));
            assert_eq!(
                request.extensions().get::<EffectiveRequestContext>(),
                Some(&context)
            );
        }

        #[test]
        fn request_parts() {
            let mut request = Request::get("/").body(()).unwrap();
            request.headers_mut().insert(
                HeaderName::from_static("x-forwarded-ssl"),
                "on".parse().unwrap(),
            );
            let (parts, _) = request.into_parts();

            let policy = TrustPolicy::new_local();
            let context = normalize(
                &InboundConnection::new(ip("10.0.0.1"), Scheme::Http, 80, &parts),
                &policy,
            );

            assert!(context.is_secure());
        }
    }
}
