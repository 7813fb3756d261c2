//! Identifiers and value types shared by the topology and the tablet catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopologyError;

/// Index of a shard within a node. Dense and 0-based.
pub type ShardId = u32;

// ── Identifiers ───────────────────────────────────────────────────

/// Opaque identity of a cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of a table owning a tablet map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Position of a tablet within its table's tablet map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabletId(pub u64);

impl fmt::Display for TabletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Replicas ──────────────────────────────────────────────────────

/// One placement of a tablet: a node and a shard on that node.
///
/// Serialized as the string `host:shard`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TabletReplica {
    pub host: HostId,
    pub shard: ShardId,
}

impl TabletReplica {
    pub fn new(host: impl Into<HostId>, shard: ShardId) -> Self {
        Self {
            host: host.into(),
            shard,
        }
    }
}

impl fmt::Display for TabletReplica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.shard)
    }
}

impl FromStr for TabletReplica {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split on the last ':' so host ids may themselves contain colons.
        let (host, shard) = s
            .rsplit_once(':')
            .ok_or_else(|| TopologyError::MalformedReplica(s.to_string()))?;
        if host.is_empty() {
            return Err(TopologyError::MalformedReplica(s.to_string()));
        }
        let shard = shard
            .trim()
            .parse::<ShardId>()
            .map_err(|_| TopologyError::MalformedReplica(s.to_string()))?;
        Ok(Self::new(HostId::new(host.trim()), shard))
    }
}

impl TryFrom<String> for TabletReplica {
    type Error = TopologyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TabletReplica> for String {
    fn from(r: TabletReplica) -> Self {
        r.to_string()
    }
}

/// Replica set of a single tablet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabletInfo {
    pub replicas: Vec<TabletReplica>,
}

impl TabletInfo {
    pub fn new(replicas: Vec<TabletReplica>) -> Self {
        Self { replicas }
    }
}

/// In-flight migration of a tablet towards a new replica set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabletTransitionInfo {
    pub next: Vec<TabletReplica>,
    pub pending_replica: TabletReplica,
}

pub(crate) struct ReplicaList<'a>(pub &'a [TabletReplica]);

impl fmt::Display for ReplicaList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, r) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{r}")?;
        }
        f.write_str("]")
    }
}

// ── Tokens ────────────────────────────────────────────────────────

/// A position on the token ring.
///
/// `i64::MIN` is reserved as the ring minimum and never owned by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(pub i64);

impl Token {
    pub const MINIMUM: Token = Token(i64::MIN);
    pub const FIRST: Token = Token(i64::MIN + 1);
    pub const LAST: Token = Token(i64::MAX);

    const SIGN_BIT: u64 = 1 << 63;

    /// Maps the token onto `0..=u64::MAX` preserving order.
    pub(crate) fn biased(self) -> u64 {
        (self.0 as u64) ^ Self::SIGN_BIT
    }

    pub(crate) fn from_biased(v: u64) -> Self {
        Token((v ^ Self::SIGN_BIT) as i64)
    }

    pub fn next(self) -> Self {
        Token(self.0.saturating_add(1))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::MINIMUM {
            f.write_str("minimum token")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Range of tokens `(start, end]`. A `None` start is the ring minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRange {
    pub start: Option<Token>,
    pub end: Token,
}

impl TokenRange {
    pub fn contains(&self, t: Token) -> bool {
        let after_start = match self.start {
            Some(start) => t > start,
            None => true,
        };
        after_start && t <= self.end
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "({start}, {}]", self.end),
            None => write!(f, "({}, {}]", Token::MINIMUM, self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_parses_host_and_shard() {
        let r: TabletReplica = "node-a:3".parse().unwrap();
        assert_eq!(r.host, HostId::from("node-a"));
        assert_eq!(r.shard, 3);
        assert_eq!(r.to_string(), "node-a:3");
    }

    #[test]
    fn replica_host_may_contain_colons() {
        let r: TabletReplica = "10.0.0.1:7000:1".parse().unwrap();
        assert_eq!(r.host.as_str(), "10.0.0.1:7000");
        assert_eq!(r.shard, 1);
    }

    #[test]
    fn replica_rejects_malformed_input() {
        assert!("node-a".parse::<TabletReplica>().is_err());
        assert!(":1".parse::<TabletReplica>().is_err());
        assert!("node-a:-1".parse::<TabletReplica>().is_err());
        assert!("node-a:x".parse::<TabletReplica>().is_err());
    }

    #[test]
    fn biasing_preserves_order() {
        assert_eq!(Token::MINIMUM.biased(), 0);
        assert_eq!(Token::LAST.biased(), u64::MAX);
        assert!(Token(-1).biased() < Token(0).biased());
        assert_eq!(Token::from_biased(Token(42).biased()), Token(42));
    }

    #[test]
    fn token_range_is_start_exclusive() {
        let range = TokenRange {
            start: Some(Token(10)),
            end: Token(20),
        };
        assert!(!range.contains(Token(10)));
        assert!(range.contains(Token(11)));
        assert!(range.contains(Token(20)));
        assert!(!range.contains(Token(21)));
    }
}
