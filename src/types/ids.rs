//! Newtype wrappers for Reddit identifiers.
//!
//! Reddit addresses every object ("thing") by a base-36 id, and by a
//! *fullname* that prefixes the id with the thing's kind (`t1_` for comments,
//! `t3_` for submissions). These types keep the two forms apart so a bare id is
//! never sent where the API expects a fullname.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// The base-36 id of a comment, without the `t1_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn new(s: impl Into<String>) -> Self {
        CommentId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `t1_` fullname used by write endpoints.
    pub fn fullname(&self) -> Fullname {
        Fullname::new(ThingKind::Comment, self.0.clone())
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The base-36 id of a submission (link or self post), without the `t3_` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn new(s: impl Into<String>) -> Self {
        SubmissionId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fullname(&self) -> Fullname {
        Fullname::new(ThingKind::Submission, self.0.clone())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind prefix of a fullname.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingKind {
    /// `t1_`
    Comment,
    /// `t2_`
    Account,
    /// `t3_`
    Submission,
    /// `t4_`
    Message,
    /// `t5_`
    Subreddit,
}

impl ThingKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ThingKind::Comment => "t1",
            ThingKind::Account => "t2",
            ThingKind::Submission => "t3",
            ThingKind::Message => "t4",
            ThingKind::Subreddit => "t5",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "t1" => Some(ThingKind::Comment),
            "t2" => Some(ThingKind::Account),
            "t3" => Some(ThingKind::Submission),
            "t4" => Some(ThingKind::Message),
            "t5" => Some(ThingKind::Subreddit),
            _ => None,
        }
    }
}

/// Error returned when parsing an invalid fullname.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fullname: {0:?}")]
pub struct InvalidFullname(pub String);

/// A kind-prefixed Reddit identifier such as `t1_k2x9a0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fullname {
    kind: ThingKind,
    id: String,
}

impl Fullname {
    pub fn new(kind: ThingKind, id: impl Into<String>) -> Self {
        Fullname {
            kind,
            id: id.into(),
        }
    }

    /// Parses a fullname, requiring a known kind prefix and a non-empty id.
    pub fn parse(s: &str) -> Result<Self, InvalidFullname> {
        let (prefix, id) = s
            .split_once('_')
            .ok_or_else(|| InvalidFullname(s.to_string()))?;
        let kind = ThingKind::from_prefix(prefix).ok_or_else(|| InvalidFullname(s.to_string()))?;
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(InvalidFullname(s.to_string()));
        }
        Ok(Fullname::new(kind, id))
    }

    pub fn kind(&self) -> ThingKind {
        self.kind
    }

    /// The bare id, without the kind prefix.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.id)
    }
}

impl Serialize for Fullname {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fullname {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Fullname::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A Reddit account name, used both for comment authors and for the bot itself.
///
/// Reddit treats usernames case-insensitively, so equality and hashing ignore
/// ASCII case while `Display` keeps the original spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Identity(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Identity {}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u/{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod fullname {
        use super::*;
        use proptest::prelude::*;

        #[test]
        fn parses_comment_fullname() {
            let name = Fullname::parse("t1_k2x9a0").unwrap();
            assert_eq!(name.kind(), ThingKind::Comment);
            assert_eq!(name.id(), "k2x9a0");
        }

        #[test]
        fn parses_submission_fullname() {
            let name = Fullname::parse("t3_abc").unwrap();
            assert_eq!(name.kind(), ThingKind::Submission);
            assert_eq!(name.id(), "abc");
        }

        #[test]
        fn rejects_malformed_input() {
            assert!(Fullname::parse("k2x9a0").is_err());
            assert!(Fullname::parse("t9_abc").is_err());
            assert!(Fullname::parse("t1_").is_err());
            assert!(Fullname::parse("t1_a-b").is_err());
        }

        #[test]
        fn deserializes_from_json_string() {
            let name: Fullname = serde_json::from_str("\"t1_xyz\"").unwrap();
            assert_eq!(name, CommentId::new("xyz").fullname());
        }

        proptest! {
            #[test]
            fn display_parses_back(id in "[0-9a-z]{1,10}") {
                let name = Fullname::new(ThingKind::Comment, id.clone());
                let parsed = Fullname::parse(&name.to_string()).unwrap();
                prop_assert_eq!(parsed.id(), id.as_str());
            }
        }
    }

    mod identity {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[test]
        fn equality_ignores_case() {
            assert_eq!(Identity::new("TriggerBot"), Identity::new("triggerbot"));
            assert_ne!(Identity::new("triggerbot"), Identity::new("triggerbot2"));
        }

        #[test]
        fn hash_agrees_with_equality() {
            let mut set = HashSet::new();
            set.insert(Identity::new("SomeUser"));
            assert!(set.contains(&Identity::new("someuser")));
        }

        #[test]
        fn display_uses_user_prefix() {
            assert_eq!(Identity::new("SomeUser").to_string(), "u/SomeUser");
        }

        proptest! {
            #[test]
            fn comparison_matches_lowercased(a in "[a-zA-Z0-9_]{3,20}", b in "[a-zA-Z0-9_]{3,20}") {
                prop_assert_eq!(
                    Identity::new(a.clone()) == Identity::new(b.clone()),
                    a.to_ascii_lowercase() == b.to_ascii_lowercase()
                );
            }
        }
    }
}
