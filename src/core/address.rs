//! Node address resolution.
//!
//! Converts configured point identifiers into structured `NodeAddress`
//! values, in the order they were configured.

use std::fmt;

use crate::core::error::{ProbeError, Result};

/// Identifier part of a node address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    /// `i=1234`
    Numeric(u32),
    /// `s=Temperature`
    String(String),
    /// `g=72962B91-FA75-4AE6-8D28-B404DC7DAF63`
    Guid(String),
    /// `b=M/RbKBsRVkePCePcx24oRA==`
    Opaque(String),
}

impl Identifier {
    /// Type prefix used in the textual node id form.
    fn prefix(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "i",
            Self::String(_) => "s",
            Self::Guid(_) => "g",
            Self::Opaque(_) => "b",
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::String(s) | Self::Guid(s) | Self::Opaque(s) => f.write_str(s),
        }
    }
}

/// Structured reference to a single node on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeAddress {
    /// Namespace index.
    pub namespace: u16,
    /// Identifier within the namespace.
    pub identifier: Identifier,
}

impl NodeAddress {
    /// Create a string-identified address.
    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }

    /// Create a numeric address.
    pub fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    /// Parse a node id: `[ns=N;](i=ID|s=Name|g=GUID|b=Base64)`.
    pub fn parse(address: &str) -> Result<Self> {
        if address.starts_with("nsu=") {
            return Err(ProbeError::invalid_address(
                address,
                "namespace URIs are not supported, use ns=<index>",
            ));
        }

        let (namespace, id_str) = match address.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id_str) = rest.split_once(';').ok_or_else(|| {
                    ProbeError::invalid_address(address, "expected 'ns=N;<type>=<id>'")
                })?;
                let namespace = ns_str.parse::<u16>().map_err(|_| {
                    ProbeError::invalid_address(
                        address,
                        format!("invalid namespace index: {}", ns_str),
                    )
                })?;
                (namespace, id_str)
            }
            None => (0, address),
        };

        let identifier = parse_identifier(id_str).map_err(|reason| {
            ProbeError::invalid_address(address, reason)
        })?;

        Ok(Self {
            namespace,
            identifier,
        })
    }

    /// Name used for the metric line: the identifier without its type prefix.
    ///
    /// The text is used as-is. Numeric ids give digit-only names such as
    /// `2258`, and guid or opaque ids keep their dashes and base64
    /// characters, so those names are not valid exposition metric names.
    pub fn point_name(&self) -> String {
        self.identifier.to_string()
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        write!(f, "{}={}", self.identifier.prefix(), self.identifier)
    }
}

impl std::str::FromStr for NodeAddress {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn parse_identifier(id_str: &str) -> std::result::Result<Identifier, String> {
    let (kind, value) = id_str
        .split_once('=')
        .ok_or_else(|| format!("missing identifier type in '{}'", id_str))?;

    if value.is_empty() {
        return Err(format!("empty identifier in '{}'", id_str));
    }

    match kind {
        "i" => value
            .parse::<u32>()
            .map(Identifier::Numeric)
            .map_err(|_| format!("invalid numeric identifier: {}", value)),
        "s" => Ok(Identifier::String(value.to_string())),
        "g" if is_guid(value) => Ok(Identifier::Guid(value.to_string())),
        "g" => Err(format!("invalid guid identifier: {}", value)),
        "b" if is_base64(value) => Ok(Identifier::Opaque(value.to_string())),
        "b" => Err(format!("invalid opaque identifier: {}", value)),
        other => Err(format!(
            "unknown identifier type '{}', expected i, s, g or b",
            other
        )),
    }
}

/// `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX`
fn is_guid(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut count = 0;
    for (part, len) in s.split('-').zip(GROUPS) {
        if part.len() != len || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return false;
        }
        count += 1;
    }
    count == GROUPS.len() && s.split('-').count() == GROUPS.len()
}

fn is_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    s.len() - body.len() <= 2
        && !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}

/// Resolve configured point identifiers into node addresses.
///
/// Each identifier is trimmed. With a namespace configured, identifiers are
/// treated as string ids inside that namespace (`ns=<namespace>;s=<id>`);
/// without one they must already be complete node ids.
///
/// Stops at the first identifier that does not parse.
pub fn resolve_addresses(raw_ids: &[String], namespace: Option<&str>) -> Result<Vec<NodeAddress>> {
    let namespace = namespace.map(str::trim).filter(|ns| !ns.is_empty());

    raw_ids
        .iter()
        .map(|raw| {
            let id = raw.trim();
            match namespace {
                Some(ns) => NodeAddress::parse(&format!("ns={};s={}", ns, id)),
                None => NodeAddress::parse(id),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_address() {
        let addr = NodeAddress::parse("ns=2;s=Temperature").unwrap();
        assert_eq!(addr.namespace, 2);
        assert_eq!(addr.identifier, Identifier::String("Temperature".into()));
        assert_eq!(addr.point_name(), "Temperature");
    }

    #[test]
    fn test_parse_numeric_address_no_namespace() {
        let addr = NodeAddress::parse("i=2258").unwrap();
        assert_eq!(addr, NodeAddress::numeric(0, 2258));
        assert_eq!(addr.to_string(), "i=2258");
    }

    #[test]
    fn test_parse_guid_and_opaque() {
        let addr = NodeAddress::parse("ns=1;g=72962B91-FA75-4AE6-8D28-B404DC7DAF63").unwrap();
        assert!(matches!(addr.identifier, Identifier::Guid(_)));

        let addr = NodeAddress::parse("ns=1;b=M/RbKBsRVkePCePcx24oRA==").unwrap();
        assert!(matches!(addr.identifier, Identifier::Opaque(_)));

        assert!(NodeAddress::parse("ns=1;g=not-a-guid").is_err());
        assert!(NodeAddress::parse("ns=1;b=***").is_err());
    }

    #[test]
    fn test_string_id_may_contain_separators() {
        let addr = NodeAddress::parse("ns=3;s=Line1;Motor=2").unwrap();
        assert_eq!(addr.point_name(), "Line1;Motor=2");
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["ns=2;s=Temperature", "i=85", "ns=5;i=1001"] {
            assert_eq!(NodeAddress::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_parse_invalid() {
        for s in [
            "ns=x;bad",
            "ns=1",
            "ns=70000;s=A",
            "Temperature",
            "i=abc",
            "s=",
            "x=1",
            "nsu=urn:test;s=A",
        ] {
            assert!(
                matches!(NodeAddress::parse(s), Err(ProbeError::InvalidAddress { .. })),
                "{} should not parse",
                s
            );
        }
    }

    #[test]
    fn test_resolve_with_namespace() {
        let addrs = resolve_addresses(&[" NODE1 ".to_string()], Some("2")).unwrap();
        assert_eq!(addrs, vec![NodeAddress::string(2, "NODE1")]);
        assert_eq!(addrs[0].to_string(), "ns=2;s=NODE1");
    }

    #[test]
    fn test_resolve_without_namespace_keeps_order() {
        let raw = vec!["ns=1;s=B".to_string(), " ns=1;s=A".to_string(), "i=85".to_string()];
        let addrs = resolve_addresses(&raw, None).unwrap();
        let names: Vec<String> = addrs.iter().map(NodeAddress::point_name).collect();
        assert_eq!(names, vec!["B", "A", "85"]);
    }

    #[test]
    fn test_resolve_blank_namespace_is_ignored() {
        let addrs = resolve_addresses(&["ns=4;s=A".to_string()], Some("  ")).unwrap();
        assert_eq!(addrs[0].namespace, 4);
    }

    #[test]
    fn test_resolve_aborts_on_first_invalid() {
        let raw = vec!["ns=1;s=A".to_string(), "ns=x;bad".to_string(), "i=zzz".to_string()];
        match resolve_addresses(&raw, None) {
            Err(ProbeError::InvalidAddress { address, .. }) => assert_eq!(address, "ns=x;bad"),
            other => panic!("Expected InvalidAddress, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_invalid_namespace() {
        let err = resolve_addresses(&["A".to_string()], Some("x")).unwrap_err();
        match err {
            ProbeError::InvalidAddress { address, .. } => assert_eq!(address, "ns=x;s=A"),
            other => panic!("Expected InvalidAddress, got {:?}", other),
        }
    }
}
