//! Host alias and identity-key resolution.
//!
//! For every canonical instance record the resolver picks an SSH identity
//! key from a tag-to-key priority table and derives a unique `Host` alias.
//! The winning tag (or the instance name when no tag matches) becomes the
//! alias seed; repeated seeds get a numeric suffix. Output is sorted by
//! alias so repeated runs produce diff-friendly files regardless of the
//! order the provider returned instances in.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use thiserror::Error;

use crate::record::InstanceRecord;


/// A named SSH private key with a selection priority.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct IdentityKey {
    /// File name of the key under `~/.ssh/`.
    pub key: String,
    /// Selection priority; the strictly highest priority wins when several
    /// tags match.
    pub priority: i64,
}

/// Tag-to-key table with an optional fallback key.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyTable {
    /// Key used when no tag on an instance matches the table.
    #[serde(default)]
    pub default: Option<IdentityKey>,
    /// Mapping from tag name to identity key.
    #[serde(default)]
    pub tag_to_key: BTreeMap<String, IdentityKey>,
}

/// Instance descriptor with its alias and identity file resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedInstance {
    /// Unique `Host` alias, prefix included.
    pub host: String,
    /// Instance name as reported by the provider.
    pub name: String,
    /// Public IPv4 address.
    pub ip: String,
    /// Path to the identity file, `~/.ssh/` included.
    pub identity_file: String,
}

/// Errors raised during alias resolution.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    /// Raised when no tag matches the table and no fallback key exists.
    #[error("no tag on instance '{name}' matches the key table and no default key is configured")]
    NoDefaultKey {
        /// Instance that could not be assigned a key.
        name: String,
    },
}

/// Resolves aliases and identity keys for every record.
///
/// Tags are considered in lexicographic order and a candidate only
/// displaces the current winner with a strictly higher priority, so equal
/// priorities resolve to the lexicographically smallest tag. Aliases are
/// guaranteed unique: the per-seed occurrence counter keeps incrementing
/// past any alias that is already taken, which covers instances whose
/// literal name collides with a suffixed alias (for example a droplet
/// named `web2` next to a second `web`).
///
/// The returned list is sorted ascending by alias.
///
/// # Errors
///
/// Returns [`ResolveError::NoDefaultKey`] when an instance has no matching
/// tag and the table has no default key.
pub fn resolve(
    records: &[InstanceRecord],
    keys: &KeyTable,
    host_prefix: &str,
) -> Result<Vec<ResolvedInstance>, ResolveError> {
    let mut seed_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut taken: BTreeSet<String> = BTreeSet::new();
    let mut resolved = Vec::with_capacity(records.len());

    for record in records {
        let winner = select_key(record, keys);
        let (seed, key) = match winner {
            Some((tag, key)) => (tag, key),
            None => {
                let default = keys.default.as_ref().ok_or_else(|| {
                    ResolveError::NoDefaultKey {
                        name: record.name.clone(),
                    }
                })?;
                (record.name.as_str(), default)
            }
        };

        let mut occurrence = seed_counts.get(seed).copied().unwrap_or(0) + 1;
        let mut host = compose_alias(host_prefix, seed, occurrence);
        while taken.contains(&host) {
            occurrence += 1;
            host = compose_alias(host_prefix, seed, occurrence);
        }
        seed_counts.insert(seed.to_owned(), occurrence);
        taken.insert(host.clone());

        resolved.push(ResolvedInstance {
            host,
            name: record.name.clone(),
            ip: record.ip.clone(),
            identity_file: format!("~/.ssh/{}", key.key),
        });
    }

    resolved.sort_by(|a, b| a.host.cmp(&b.host));
    Ok(resolved)
}

/// Picks the matching key with the strictly highest priority. Iterating a
/// sorted copy of the tag list makes the equal-priority winner the
/// lexicographically smallest tag.
fn select_key<'a>(
    record: &'a InstanceRecord,
    keys: &'a KeyTable,
) -> Option<(&'a str, &'a IdentityKey)> {
    let mut sorted_tags: Vec<&String> = record.tags.iter().collect();
    sorted_tags.sort();

    let mut winner: Option<(&str, &IdentityKey)> = None;
    for tag in sorted_tags {
        if let Some(key) = keys.tag_to_key.get(tag) {
            let beats_current = winner.is_none_or(|(_, current)| key.priority > current.priority);
            if beats_current {
                winner = Some((tag.as_str(), key));
            }
        }
    }
    winner
}

fn compose_alias(prefix: &str, seed: &str, occurrence: u32) -> String {
    if occurrence == 1 {
        format!("{prefix}{seed}")
    } else {
        format!("{prefix}{seed}{occurrence}")
    }
}
