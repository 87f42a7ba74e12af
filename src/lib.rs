//! # Forwarding normalizer
//!
//! This crate derives the effective scheme, port and client address of a request received
//! behind an SSL-terminating load balancer or any other trusted reverse proxy.
//!
//! ## Usage
//!
//! ```rust
//! use forwarding_normalizer::{normalize, InboundConnection, Scheme, TrustPolicy};
//!
//! let policy = TrustPolicy::new_local();
//! let mut request = http::Request::get("/").body(()).unwrap();
//! request.headers_mut().insert("x-forwarded-proto", "HTTPS".parse().unwrap());
//! request.headers_mut().insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
//! let socket_ip_addr = core::net::IpAddr::from([127, 0, 0, 1]);
//!
//! let conn = InboundConnection::new(socket_ip_addr, Scheme::Http, 8080, &request);
//! let context = normalize(&conn, &policy);
//!
//! assert_eq!(context.scheme(), Scheme::Https);
//! assert_eq!(context.port(), 443);
//! assert_eq!(context.client_ip(), core::net::IpAddr::from([1, 2, 3, 4]));
//! ```
//!
//! ## Features
//!
//!  * Headers are only considered when the immediate peer belongs to a trusted range, any other
//!    peer gets the values observed by the listener.
//!  * Scheme is read from `X-Forwarded-Proto` then `X-Forwarded-Ssl`, or any configured header,
//!    with an explicit set of recognized tokens.
//!  * Port is read from `X-Forwarded-Port` and client address from `X-Forwarded-For`.
//!  * The `Forwarded` header can be trusted and takes precedence over the `X-Forwarded-*` ones.
//!  * Chains are reduced to their left-most or right-most entry, or walked from the right
//!    skipping trusted hops when chain validation is enabled.
//!  * Policies can be loaded from a TOML file or from `FHN_*` environment variables.
//!
//! ## Implementation
//!
//! The `Forwarded` header parsing try to follow the [RFC 7239](https://tools.ietf.org/html/rfc7239)
//! specifications but may differ on real world usage.

mod config;
mod context;
mod error;
mod extract;
mod forwarded;
mod normalize;

pub use config::{ChainDirection, PolicySettings, SchemeHeader, SchemeHeaderSettings, TrustPolicy};
pub use context::{EffectiveRequestContext, Scheme, UnknownScheme};
pub use error::PolicyLoadError;
pub use extract::{HeaderList, HeaderSource, InboundConnection};
pub use normalize::normalize;
#[cfg(feature = "http")]
pub use normalize::normalize_request;
