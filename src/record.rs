//! Normalisation of raw provider records into canonical descriptors.
//!
//! The rest of the pipeline works on [`InstanceRecord`]s whose name and
//! address are guaranteed present. A record missing either field aborts the
//! whole run; a partial sync would silently drop hosts from the generated
//! region.

use thiserror::Error;

use crate::backend::RawInstance;

/// Canonical instance descriptor consumed by the resolver.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceRecord {
    /// Instance name as reported by the provider.
    pub name: String,
    /// Public IPv4 address.
    pub ip: String,
    /// Tags attached to the instance, in provider order.
    pub tags: Vec<String>,
}

/// Errors raised while normalising provider records.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RecordError {
    /// Raised when a provider record is missing a required field.
    #[error("instance '{name}' is missing required field '{field}'")]
    MalformedRecord {
        /// Name of the offending instance, or `<unnamed>` when the name
        /// itself is missing.
        name: String,
        /// Field that was absent or empty.
        field: &'static str,
    },
}

/// Converts raw provider records into canonical descriptors.
///
/// No filtering and no reordering: the output holds exactly the input
/// instances in the input order.
///
/// # Errors
///
/// Returns [`RecordError::MalformedRecord`] when an instance lacks a name
/// or a public address.
pub fn normalize(raw: Vec<RawInstance>) -> Result<Vec<InstanceRecord>, RecordError> {
    raw.into_iter().map(normalize_one).collect()
}

fn normalize_one(raw: RawInstance) -> Result<InstanceRecord, RecordError> {
    if raw.name.trim().is_empty() {
        return Err(RecordError::MalformedRecord {
            name: String::from("<unnamed>"),
            field: "name",
        });
    }
    let ip = match raw.public_ip {
        Some(ip) if !ip.trim().is_empty() => ip,
        _ => {
            return Err(RecordError::MalformedRecord {
                name: raw.name,
                field: "public address",
            });
        }
    };
    Ok(InstanceRecord {
        name: raw.name,
        ip,
        tags: raw.tags,
    })
}
