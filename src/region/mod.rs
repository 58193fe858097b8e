//! Managed-region editing of line-oriented text files.
//!
//! A managed region is the span of an SSH configuration file between a
//! start marker line and an end marker line. The editor splits the file
//! around that span, regenerates the span's content from resolved
//! instances, and reassembles the file. Everything outside the markers is
//! preserved byte-for-byte, original line terminators included; everything
//! strictly between them is discarded and rebuilt, which is what makes
//! repeated runs idempotent.

use thiserror::Error;

use crate::resolver::ResolvedInstance;

#[cfg(test)]
mod tests;

/// File content split around the managed region.
///
/// `prefix` ends with the start-marker line and `suffix` starts with the
/// end-marker line, so splicing is a plain concatenation of prefix,
/// generated blocks, and suffix. Lines keep their original terminators.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ManagedFile {
    /// Lines up to and including the start-marker line.
    pub prefix: Vec<String>,
    /// Lines from the end-marker line to the end of the file.
    pub suffix: Vec<String>,
}

/// Errors raised while locating the managed region.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RegionError {
    /// Raised when the start marker never appears in the file.
    #[error("start marker '{start}' not found; add '{start}' and '{end}' to the file")]
    MarkersNotFound {
        /// Configured start marker.
        start: String,
        /// Configured end marker.
        end: String,
    },
    /// Raised when the start marker appears but the end marker never does.
    #[error("end marker '{end}' not found after the start marker")]
    EndMarkerMissing {
        /// Configured end marker.
        end: String,
    },
    /// Raised when the end marker only appears before the start marker.
    #[error("marker '{start}' must come before '{end}'")]
    MarkersOutOfOrder {
        /// Configured start marker.
        start: String,
        /// Configured end marker.
        end: String,
    },
}

/// Scanner phases while walking the file top to bottom.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Scan {
    /// Still looking for the start marker.
    Searching,
    /// Start marker seen; looking for the end marker.
    InRegion,
}

impl ManagedFile {
    /// Splits `content` around the managed region delimited by `start_mark`
    /// and `end_mark`.
    ///
    /// A line matches a marker when its trimmed content equals the marker,
    /// so indentation and trailing carriage returns do not defeat the scan.
    /// Only the first marker pair is honoured; the file is expected to
    /// contain exactly one.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::MarkersNotFound`] when the start marker is
    /// absent, [`RegionError::EndMarkerMissing`] when the end marker never
    /// follows it, and [`RegionError::MarkersOutOfOrder`] when the end
    /// marker only appears before the start marker.
    pub fn split(content: &str, start_mark: &str, end_mark: &str) -> Result<Self, RegionError> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();

        let mut phase = Scan::Searching;
        let mut start_index = 0_usize;
        let mut end_seen_while_searching = false;

        for (index, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            match phase {
                Scan::Searching => {
                    if trimmed == start_mark {
                        start_index = index;
                        phase = Scan::InRegion;
                    } else if trimmed == end_mark {
                        end_seen_while_searching = true;
                    }
                }
                Scan::InRegion => {
                    if trimmed == end_mark {
                        return Ok(Self {
                            prefix: collect_owned(lines.iter().take(start_index + 1)),
                            suffix: collect_owned(lines.iter().skip(index)),
                        });
                    }
                }
            }
        }

        match phase {
            Scan::Searching => Err(RegionError::MarkersNotFound {
                start: start_mark.to_owned(),
                end: end_mark.to_owned(),
            }),
            Scan::InRegion if end_seen_while_searching => Err(RegionError::MarkersOutOfOrder {
                start: start_mark.to_owned(),
                end: end_mark.to_owned(),
            }),
            Scan::InRegion => Err(RegionError::EndMarkerMissing {
                end: end_mark.to_owned(),
            }),
        }
    }

    /// Reassembles the file with freshly generated blocks between the
    /// markers. Instances are emitted in the order given; the resolver has
    /// already sorted them by alias.
    #[must_use]
    pub fn splice(&self, instances: &[ResolvedInstance], user: &str) -> String {
        let mut output = String::new();
        for line in &self.prefix {
            output.push_str(line);
        }
        for instance in instances {
            output.push_str(&render_block(instance, user));
        }
        for line in &self.suffix {
            output.push_str(line);
        }
        output
    }
}

/// Renders the five-line connection block for one instance.
fn render_block(instance: &ResolvedInstance, user: &str) -> String {
    format!(
        "Host {}\n    # {}\n    Hostname {}\n    IdentityFile {}\n    User {}\n",
        instance.host, instance.name, instance.ip, instance.identity_file, user
    )
}

fn collect_owned<'a>(lines: impl Iterator<Item = &'a &'a str>) -> Vec<String> {
    lines.map(|line| (*line).to_owned()).collect()
}
