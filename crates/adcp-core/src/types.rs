//! Core domain types for Active Directory control paths.
//!
//! These types describe principals (identities), the relationships between
//! them, and the denial facts extracted from ACL dumps. They are shared by the
//! graph adapters and the control-path engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── Relation families ─────────────────────────────────────────────

/// Relations through which control passes transparently: a member of a group
/// is effectively the group for access-control purposes.
pub const TRANSITIVE_RELATIONS: &[&str] = &["GROUP_MEMBER", "PRIMARY_GROUP", "SID_HISTORY"];

/// Exchange RBAC relations. Only mailbox principals take part in these.
pub const MAILBOX_RELATIONS: &[&str] = &[
    "RBAC_SET_MBX",
    "RBAC_ADD_MBXPERM",
    "RBAC_ADD_MBXFOLDERPERM",
    "RBAC_CONNECT_MBX",
    "RBAC_NEW_MBXEXPORTREQ",
];

/// Prefix of the synthetic relation materialized for a denied hop.
pub const DENY_PREFIX: &str = "DENY_";

// ── Identity ──────────────────────────────────────────────────────

/// Opaque key of a principal in the external graph store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeKey(pub i64);

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A principal: user, group, computer, GPO, container...
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub key: NodeKey,
    /// Distinguished name, unique within a working graph.
    pub name: String,
    /// Category labels reported by the store (e.g. "user", "group").
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Identity {
    pub fn new(key: i64, name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            key: NodeKey(key),
            name: name.into(),
            labels,
        }
    }

    /// First RDN of the distinguished name (`cn=foo,dc=bar` → `cn=foo`).
    pub fn short_name(&self) -> &str {
        self.name.split(',').next().unwrap_or(&self.name)
    }

    /// Primary category label, if the store reported any.
    pub fn kind(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    /// Heuristic for mailbox principals: their names carry an SMTP address.
    pub fn is_mailbox_capable(&self) -> bool {
        self.name.contains('@')
    }
}

// ── Relations ─────────────────────────────────────────────────────

/// Tag naming the type of a control relationship ("GROUP_MEMBER", "WRITE_DACL"...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RelationKind(String);

impl RelationKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether control is inherited through this relation.
    pub fn is_transitive(&self) -> bool {
        TRANSITIVE_RELATIONS.contains(&self.0.as_str())
    }

    /// Whether this relation belongs to the Exchange mailbox family.
    pub fn is_mailbox(&self) -> bool {
        MAILBOX_RELATIONS.contains(&self.0.as_str())
    }

    /// The synthetic `DENY_<kind>` tag for this relation.
    pub fn deny_tag(&self) -> RelationKind {
        RelationKind(format!("{DENY_PREFIX}{}", self.0))
    }

    /// For a `DENY_<kind>` tag, the relation it denies.
    pub fn denied_kind(&self) -> Option<RelationKind> {
        self.0
            .strip_prefix(DENY_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(RelationKind::new)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelationKind {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Ordered, duplicate-free set of relation kinds.
///
/// Keeps first-insertion order so merged edges list their kinds in the order
/// they were observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RelationKinds(Vec<RelationKind>);

impl RelationKinds {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(kind: RelationKind) -> Self {
        Self(vec![kind])
    }

    /// Insert a kind unless already present. Returns `true` if inserted.
    pub fn insert(&mut self, kind: RelationKind) -> bool {
        if self.0.contains(&kind) {
            return false;
        }
        self.0.push(kind);
        true
    }

    /// Remove a kind if present. Returns `true` if something was removed.
    pub fn remove(&mut self, kind: &RelationKind) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != kind);
        self.0.len() != before
    }

    pub fn contains(&self, kind: &RelationKind) -> bool {
        self.0.contains(kind)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationKind> {
        self.0.iter()
    }

    /// Comma-joined label, as used by export formats.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(RelationKind::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Extend<RelationKind> for RelationKinds {
    fn extend<I: IntoIterator<Item = RelationKind>>(&mut self, iter: I) {
        for kind in iter {
            self.insert(kind);
        }
    }
}

impl FromIterator<RelationKind> for RelationKinds {
    fn from_iter<I: IntoIterator<Item = RelationKind>>(iter: I) -> Self {
        let mut kinds = Self::new();
        kinds.extend(iter);
        kinds
    }
}

impl<'a> IntoIterator for &'a RelationKinds {
    type Item = &'a RelationKind;
    type IntoIter = std::slice::Iter<'a, RelationKind>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ── Direction ─────────────────────────────────────────────────────

/// Traversal direction relative to the root principal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    /// What the root controls: follow edges source → target.
    #[serde(rename = "from")]
    Forward,
    /// Who controls the root: follow edges target → source.
    #[serde(rename = "to")]
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "from",
            Self::Reverse => "to",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "from" | "forward" => Ok(Self::Forward),
            "to" | "reverse" => Ok(Self::Reverse),
            _ => Err(CoreError::InvalidDirection(s.to_string())),
        }
    }
}

// ── Denials ───────────────────────────────────────────────────────

/// An explicit deny ACE: `source` may not exercise `kind` over `target`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DenyRecord {
    pub source: String,
    pub target: String,
    pub kind: RelationKind,
}

impl DenyRecord {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: impl Into<RelationKind>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_takes_first_rdn() {
        let id = Identity::new(1, "cn=domain admins,cn=users,dc=corp,dc=local", vec![]);
        assert_eq!(id.short_name(), "cn=domain admins");

        let bare = Identity::new(2, "TEST_1", vec!["group".to_string()]);
        assert_eq!(bare.short_name(), "TEST_1");
        assert_eq!(bare.kind(), Some("group"));
    }

    #[test]
    fn transitive_and_mailbox_families() {
        assert!(RelationKind::from("GROUP_MEMBER").is_transitive());
        assert!(RelationKind::from("SID_HISTORY").is_transitive());
        assert!(!RelationKind::from("WRITE_DACL").is_transitive());
        assert!(RelationKind::from("RBAC_CONNECT_MBX").is_mailbox());
        assert!(!RelationKind::from("AD_OWNER").is_mailbox());
    }

    #[test]
    fn deny_tag_roundtrip() {
        let kind = RelationKind::from("WRITE_OWNER");
        let tag = kind.deny_tag();
        assert_eq!(tag.as_str(), "DENY_WRITE_OWNER");
        assert_eq!(tag.denied_kind(), Some(kind));
        assert_eq!(RelationKind::from("DENY_").denied_kind(), None);
        assert_eq!(RelationKind::from("GPLINK").denied_kind(), None);
    }

    #[test]
    fn relation_kinds_keep_first_seen_order() {
        let mut kinds = RelationKinds::new();
        assert!(kinds.insert("B".into()));
        assert!(kinds.insert("A".into()));
        assert!(!kinds.insert("B".into()));
        assert_eq!(kinds.joined(), "B,A");

        assert!(kinds.remove(&"B".into()));
        assert!(!kinds.remove(&"Z".into()));
        assert_eq!(kinds.joined(), "A");
    }

    #[test]
    fn direction_parses_cli_words() {
        assert_eq!("from".parse::<Direction>().unwrap(), Direction::Forward);
        assert_eq!("TO".parse::<Direction>().unwrap(), Direction::Reverse);
        assert!("sideways".parse::<Direction>().is_err());

        let json = serde_json::to_string(&Direction::Reverse).unwrap();
        assert_eq!(json, "\"to\"");
    }
}
