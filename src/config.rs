use crate::context::Scheme;
use crate::error::PolicyLoadError;
use core::net::IpAddr;
use core::str::FromStr;
use ipnet::IpNet;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

static GLOBAL_POLICY: OnceLock<TrustPolicy> = OnceLock::new();

const ENV_PREFIX: &str = "FHN_";

/// Which entry of a comma separated chain is used when a header carries multiple values
///
/// `X-Forwarded-For: client, proxy1, proxy2` is read from left to right, each proxy appending
/// the address of its own peer. Multiple header lines are concatenated in order before the
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainDirection {
    /// Use the entry closest to the client, only safe when every hop rewrites the header
    LeftMost,
    /// Use the entry closest to this hop, the one appended by the trusted proxy
    #[default]
    RightMost,
}

impl ChainDirection {
    pub(crate) fn pick<T, I>(self, mut entries: I) -> Option<T>
    where
        I: DoubleEndedIterator<Item = T>,
    {
        match self {
            ChainDirection::LeftMost => entries.next(),
            ChainDirection::RightMost => entries.next_back(),
        }
    }
}

impl FromStr for ChainDirection {
    type Err = PolicyLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left-most" | "leftmost" | "left" => Ok(ChainDirection::LeftMost),
            "right-most" | "rightmost" | "right" => Ok(ChainDirection::RightMost),
            _ => Err(PolicyLoadError::InvalidChainDirection(s.to_string())),
        }
    }
}

/// A header announcing the scheme used by the client, with the tokens it is allowed to carry
///
/// Only the enumerated tokens are recognized, compared case-insensitively. Any other value is
/// ignored rather than interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeHeader {
    name: String,
    secure: Vec<String>,
    insecure: Vec<String>,
}

impl SchemeHeader {
    pub fn new(name: &str, secure: &[&str], insecure: &[&str]) -> Result<Self, PolicyLoadError> {
        let name = header_name(name)?;
        let secure = tokens(secure.iter().copied());
        let insecure = tokens(insecure.iter().copied());

        if secure.is_empty() && insecure.is_empty() {
            return Err(PolicyLoadError::MissingTokens(name));
        }

        Ok(Self {
            name,
            secure,
            insecure,
        })
    }

    /// `X-Forwarded-Proto: https` or `X-Forwarded-Proto: http`
    pub fn x_forwarded_proto() -> Self {
        Self {
            name: "x-forwarded-proto".to_string(),
            secure: vec!["https".to_string()],
            insecure: vec!["http".to_string()],
        }
    }

    /// `X-Forwarded-Ssl: on` or `X-Forwarded-Ssl: off`
    pub fn x_forwarded_ssl() -> Self {
        Self {
            name: "x-forwarded-ssl".to_string(),
            secure: vec!["on".to_string()],
            insecure: vec!["off".to_string()],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn classify(&self, token: &str) -> Option<Scheme> {
        let token = token.trim();

        if self.secure.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(Scheme::Https)
        } else if self.insecure.iter().any(|t| t.eq_ignore_ascii_case(token)) {
            Some(Scheme::Http)
        } else {
            None
        }
    }
}

/// Serialized form of a [`SchemeHeader`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeHeaderSettings {
    pub name: String,
    #[serde(default)]
    pub secure: Vec<String>,
    #[serde(default)]
    pub insecure: Vec<String>,
}

impl TryFrom<SchemeHeaderSettings> for SchemeHeader {
    type Error = PolicyLoadError;

    fn try_from(settings: SchemeHeaderSettings) -> Result<Self, Self::Error> {
        let secure: Vec<&str> = settings.secure.iter().map(String::as_str).collect();
        let insecure: Vec<&str> = settings.insecure.iter().map(String::as_str).collect();

        SchemeHeader::new(&settings.name, &secure, &insecure)
    }
}

/// Raw policy settings, as read from a configuration file
///
/// Missing keys take their default value, unknown keys are rejected.
///
/// ```toml
/// trusted_proxies = ["10.0.0.0/8", "35.191.0.1"]
/// chain_direction = "right-most"
/// validate_chain = false
/// trust_forwarded = false
/// port_headers = ["x-forwarded-port"]
/// client_headers = ["x-forwarded-for"]
///
/// [[scheme_headers]]
/// name = "x-forwarded-proto"
/// secure = ["https"]
/// insecure = ["http"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicySettings {
    pub trusted_proxies: Vec<String>,
    pub chain_direction: ChainDirection,
    pub validate_chain: bool,
    pub trust_forwarded: bool,
    pub scheme_headers: Vec<SchemeHeaderSettings>,
    pub port_headers: Vec<String>,
    pub client_headers: Vec<String>,
}

impl From<&SchemeHeader> for SchemeHeaderSettings {
    fn from(header: &SchemeHeader) -> Self {
        Self {
            name: header.name.clone(),
            secure: header.secure.clone(),
            insecure: header.insecure.clone(),
        }
    }
}

impl Default for PolicySettings {
    /// Same defaults as [`TrustPolicy::new`]
    fn default() -> Self {
        let policy = TrustPolicy::new();

        Self {
            trusted_proxies: policy.trusted_proxies.iter().map(IpNet::to_string).collect(),
            chain_direction: policy.chain_direction,
            validate_chain: policy.is_chain_validated,
            trust_forwarded: policy.is_forwarded_trusted,
            scheme_headers: policy
                .scheme_headers
                .iter()
                .map(SchemeHeaderSettings::from)
                .collect(),
            port_headers: policy.port_headers,
            client_headers: policy.client_headers,
        }
    }
}

/// Policy deciding which peers may rewrite the scheme, port and client address of a request
///
/// A new policy trusts no peer. Headers are read in the following order:
///   - `Forwarded` (only when [`TrustPolicy::trust_forwarded`] is called)
///   - `X-Forwarded-Proto` (`https` / `http`)
///   - `X-Forwarded-Ssl` (`on` / `off`)
///
/// The port is read from `X-Forwarded-Port` and the client address from `X-Forwarded-For`.
///
/// # Example
/// ```
/// use forwarding_normalizer::{ChainDirection, TrustPolicy};
///
/// let mut policy = TrustPolicy::new();
/// policy.add_trusted_proxy("35.191.0.0/16").unwrap();
/// policy.set_chain_direction(ChainDirection::RightMost);
/// ```
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    trusted_proxies: Vec<IpNet>,
    pub(crate) chain_direction: ChainDirection,
    pub(crate) is_chain_validated: bool,
    pub(crate) is_forwarded_trusted: bool,
    pub(crate) scheme_headers: Vec<SchemeHeader>,
    pub(crate) port_headers: Vec<String>,
    pub(crate) client_headers: Vec<String>,
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustPolicy {
    /// Create a new policy with no trusted proxies and the default headers
    pub fn new() -> Self {
        Self {
            trusted_proxies: Vec::new(),
            chain_direction: ChainDirection::default(),
            is_chain_validated: false,
            is_forwarded_trusted: false,
            scheme_headers: vec![SchemeHeader::x_forwarded_proto(), SchemeHeader::x_forwarded_ssl()],
            port_headers: vec!["x-forwarded-port".to_string()],
            client_headers: vec!["x-forwarded-for".to_string()],
        }
    }

    /// Create a new policy trusting loopback and private networks
    pub fn new_local() -> Self {
        let mut policy = Self::new();
        policy.trusted_proxies = vec![
            // IPV4 Loopback
            "127.0.0.0/8".parse().unwrap(),
            // IPV4 Private Networks
            "10.0.0.0/8".parse().unwrap(),
            "172.16.0.0/12".parse().unwrap(),
            "192.168.0.0/16".parse().unwrap(),
            // IPV6 Loopback
            "::1/128".parse().unwrap(),
            // IPV6 Private network
            "fd00::/8".parse().unwrap(),
        ];

        policy
    }

    /// Build a policy from its raw settings
    pub fn from_settings(settings: PolicySettings) -> Result<Self, PolicyLoadError> {
        let mut policy = Self::new();

        for proxy in &settings.trusted_proxies {
            policy.add_trusted_proxy(proxy)?;
        }

        policy.chain_direction = settings.chain_direction;
        policy.is_chain_validated = settings.validate_chain;
        policy.is_forwarded_trusted = settings.trust_forwarded;
        policy.scheme_headers = settings
            .scheme_headers
            .into_iter()
            .map(SchemeHeader::try_from)
            .collect::<Result<_, _>>()?;
        policy.port_headers = header_names(settings.port_headers.as_slice())?;
        policy.client_headers = header_names(settings.client_headers.as_slice())?;

        if policy.trusted_proxies.is_empty() {
            tracing::warn!("trust policy has no trusted proxy, forwarding headers will be ignored");
        }

        tracing::debug!(
            trusted_proxies = policy.trusted_proxies.len(),
            chain_direction = ?policy.chain_direction,
            validate_chain = policy.is_chain_validated,
            trust_forwarded = policy.is_forwarded_trusted,
            "trust policy loaded"
        );

        Ok(policy)
    }

    /// Parse a policy from a TOML document, see [`PolicySettings`] for the format
    pub fn from_toml_str(content: &str) -> Result<Self, PolicyLoadError> {
        Self::from_settings(toml::from_str(content)?)
    }

    /// Load a policy from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Load a policy from the process environment, see [`TrustPolicy::from_vars`]
    pub fn from_env() -> Result<Self, PolicyLoadError> {
        Self::from_vars(std::env::vars())
    }

    /// Load a policy from a set of environment variables
    ///
    /// Recognized variables, unset ones keep their default:
    ///   - `FHN_TRUSTED_PROXIES`: comma separated list of ip addresses or CIDR
    ///   - `FHN_CHAIN_DIRECTION`: `left-most` or `right-most`
    ///   - `FHN_VALIDATE_CHAIN`: boolean
    ///   - `FHN_TRUST_FORWARDED`: boolean
    ///   - `FHN_SCHEME_HEADERS`: `name=secure|secure/insecure|insecure`, comma separated
    ///   - `FHN_PORT_HEADERS`: comma separated list of header names
    ///   - `FHN_CLIENT_HEADERS`: comma separated list of header names
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, PolicyLoadError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.as_ref()
                    .strip_prefix(ENV_PREFIX)
                    .map(|key| (key.to_string(), value.as_ref().to_string()))
            })
            .collect();

        let mut settings = PolicySettings::default();

        if let Some(value) = vars.get("TRUSTED_PROXIES") {
            settings.trusted_proxies = list(value);
        }

        if let Some(value) = vars.get("CHAIN_DIRECTION") {
            settings.chain_direction = value.parse()?;
        }

        if let Some(value) = vars.get("VALIDATE_CHAIN") {
            settings.validate_chain = boolean("FHN_VALIDATE_CHAIN", value)?;
        }

        if let Some(value) = vars.get("TRUST_FORWARDED") {
            settings.trust_forwarded = boolean("FHN_TRUST_FORWARDED", value)?;
        }

        if let Some(value) = vars.get("SCHEME_HEADERS") {
            settings.scheme_headers = list(value)
                .iter()
                .map(|entry| scheme_header_settings(entry))
                .collect::<Result<_, _>>()?;
        }

        if let Some(value) = vars.get("PORT_HEADERS") {
            settings.port_headers = list(value);
        }

        if let Some(value) = vars.get("CLIENT_HEADERS") {
            settings.client_headers = list(value);
        }

        Self::from_settings(settings)
    }

    /// Store this policy for the lifetime of the process
    ///
    /// Only one policy can be installed, a second call returns [`PolicyLoadError::AlreadyInstalled`].
    pub fn install(self) -> Result<&'static TrustPolicy, PolicyLoadError> {
        GLOBAL_POLICY
            .set(self)
            .map_err(|_| PolicyLoadError::AlreadyInstalled)?;

        GLOBAL_POLICY.get().ok_or(PolicyLoadError::AlreadyInstalled)
    }

    /// The policy stored by [`TrustPolicy::install`], if any
    pub fn global() -> Option<&'static TrustPolicy> {
        GLOBAL_POLICY.get()
    }

    /// Add a trusted proxy to the list of trusted proxies
    ///
    /// proxy can be an IP address or a CIDR
    pub fn add_trusted_proxy(&mut self, proxy: &str) -> Result<(), PolicyLoadError> {
        let proxy = proxy.trim();

        match proxy.parse() {
            Ok(v) => {
                self.trusted_proxies.push(v);

                Ok(())
            }
            Err(e) => match proxy.parse::<IpAddr>() {
                Ok(v) => {
                    self.trusted_proxies.push(IpNet::from(v));

                    Ok(())
                }
                _ => Err(PolicyLoadError::InvalidProxy {
                    value: proxy.to_string(),
                    source: e,
                }),
            },
        }
    }

    /// Check if a remote address is trusted given the list of trusted proxies
    ///
    /// IPv4-mapped IPv6 addresses, as reported by dual-stack sockets, are matched as IPv4.
    pub fn is_trusted(&self, remote_addr: &IpAddr) -> bool {
        let remote_addr = remote_addr.to_canonical();

        self.trusted_proxies
            .iter()
            .any(|proxy| proxy.contains(&remote_addr))
    }

    pub fn trusted_proxies(&self) -> &[IpNet] {
        &self.trusted_proxies
    }

    pub fn chain_direction(&self) -> ChainDirection {
        self.chain_direction
    }

    pub fn set_chain_direction(&mut self, direction: ChainDirection) {
        self.chain_direction = direction;
    }

    /// Walk forwarding chains from the right and skip every trusted hop
    ///
    /// Without it, only the entry selected by the [`ChainDirection`] is considered. Enable it
    /// when requests go through more than one trusted proxy before reaching this hop.
    pub fn validate_chain(&mut self) {
        self.is_chain_validated = true;
    }

    /// Trust the RFC 7239 `Forwarded` header, which takes precedence over the `X-Forwarded-*` ones
    pub fn trust_forwarded(&mut self) {
        self.is_forwarded_trusted = true;
    }

    /// Add a scheme header, consulted after the already configured ones
    pub fn add_scheme_header(&mut self, header: SchemeHeader) {
        self.scheme_headers.push(header);
    }

    /// Replace the scheme headers, in precedence order
    pub fn set_scheme_headers(&mut self, headers: Vec<SchemeHeader>) {
        self.scheme_headers = headers;
    }

    pub fn scheme_headers(&self) -> &[SchemeHeader] {
        &self.scheme_headers
    }

    /// Replace the headers carrying the port used by the client, an empty list disables them
    pub fn set_port_headers(&mut self, names: &[&str]) -> Result<(), PolicyLoadError> {
        self.port_headers = header_names(names)?;

        Ok(())
    }

    /// Replace the headers carrying the client address, an empty list disables them
    pub fn set_client_headers(&mut self, names: &[&str]) -> Result<(), PolicyLoadError> {
        self.client_headers = header_names(names)?;

        Ok(())
    }
}

/// Validate an header name against the RFC 9110 token grammar and lowercase it
fn header_name(name: &str) -> Result<String, PolicyLoadError> {
    let name = name.trim();
    let is_token = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));

    if !is_token {
        return Err(PolicyLoadError::InvalidHeaderName(name.to_string()));
    }

    Ok(name.to_ascii_lowercase())
}

fn header_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, PolicyLoadError> {
    names.iter().map(|name| header_name(name.as_ref())).collect()
}

fn tokens<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn boolean(var: &str, value: &str) -> Result<bool, PolicyLoadError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(PolicyLoadError::InvalidBool {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse `name=secure|secure/insecure|insecure`
fn scheme_header_settings(entry: &str) -> Result<SchemeHeaderSettings, PolicyLoadError> {
    let (name, values) = entry
        .split_once('=')
        .ok_or_else(|| PolicyLoadError::InvalidSchemeHeader(entry.to_string()))?;
    let (secure, insecure) = values.split_once('/').unwrap_or((values, ""));
    let split = |tokens: &str| -> Vec<String> {
        tokens
            .split('|')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    };

    Ok(SchemeHeaderSettings {
        name: name.trim().to_string(),
        secure: split(secure),
        insecure: split(insecure),
    })
}
