//! Orchestrates a full droplet-to-SSH-config sync run.
//!
//! The workflow fetches instances from a source, normalises and resolves
//! them, splices the generated blocks into the managed region of the
//! target file, and writes the file back in one replacement. The entire
//! new content exists in memory before the file is touched, so a failure
//! at any stage leaves the on-disk file exactly as it was.
//!
//! The target file is read once and written once with no locking; a
//! concurrent external writer to the same file can race this tool and be
//! overwritten.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;

use crate::backend::InstanceSource;
use crate::config::Profile;
use crate::record::{self, RecordError};
use crate::region::{ManagedFile, RegionError};
use crate::resolver::{self, ResolveError};

/// Summary of a completed sync run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyncReport {
    /// Number of instances written into the managed region.
    pub instances: usize,
    /// File that was rewritten.
    pub path: Utf8PathBuf,
}

/// Errors surfaced while performing a sync run.
#[derive(Debug, Error)]
pub enum SyncRunError<SourceError>
where
    SourceError: std::error::Error + 'static,
{
    /// Raised when listing instances from the provider fails.
    #[error("failed to list instances: {0}")]
    Fetch(#[source] SourceError),
    /// Raised when a provider record is missing required fields.
    #[error("invalid provider record: {0}")]
    Record(#[source] RecordError),
    /// Raised when alias or identity-key resolution fails.
    #[error("alias resolution failed: {0}")]
    Resolve(#[source] ResolveError),
    /// Raised when the managed region cannot be located in the target file.
    #[error("managed region error in {path}: {source}")]
    Region {
        /// File that was being edited.
        path: Utf8PathBuf,
        /// Underlying region error.
        #[source]
        source: RegionError,
    },
    /// Raised when reading or writing the target file fails.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
}

/// Executes the sync flow against a configured instance source.
#[derive(Clone, Debug)]
pub struct SyncOrchestrator<S: InstanceSource> {
    source: S,
}

impl<S: InstanceSource> SyncOrchestrator<S> {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Runs the full pipeline and rewrites `ssh_config` in place.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncRunError`] naming the stage that failed; the target
    /// file is only written after every stage has succeeded.
    pub async fn execute(
        &self,
        profile: &Profile,
        ssh_config: &Utf8Path,
    ) -> Result<SyncReport, SyncRunError<S::Error>> {
        let raw = self.source.list_all().await.map_err(SyncRunError::Fetch)?;
        let records = record::normalize(raw).map_err(SyncRunError::Record)?;
        let resolved = resolver::resolve(&records, &profile.keys, &profile.host_prefix)
            .map_err(SyncRunError::Resolve)?;

        let content = read_target(ssh_config)?;
        let managed = ManagedFile::split(&content, &profile.start_mark, &profile.end_mark)
            .map_err(|source| SyncRunError::Region {
                path: ssh_config.to_path_buf(),
                source,
            })?;
        let output = managed.splice(&resolved, &profile.user);
        write_target(ssh_config, &output)?;

        Ok(SyncReport {
            instances: resolved.len(),
            path: ssh_config.to_path_buf(),
        })
    }
}

fn open_parent<E>(path: &Utf8Path) -> Result<(Dir, &str), SyncRunError<E>>
where
    E: std::error::Error + 'static,
{
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| SyncRunError::Io {
        path: path.to_path_buf(),
        message: String::from("target path is missing a filename"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| SyncRunError::Io {
        path: parent.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok((dir, file_name))
}

fn read_target<E>(path: &Utf8Path) -> Result<String, SyncRunError<E>>
where
    E: std::error::Error + 'static,
{
    let (dir, file_name) = open_parent(path)?;
    dir.read_to_string(file_name).map_err(|err| SyncRunError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn write_target<E>(path: &Utf8Path, content: &str) -> Result<(), SyncRunError<E>>
where
    E: std::error::Error + 'static,
{
    let (dir, file_name) = open_parent(path)?;
    dir.write(file_name, content).map_err(|err| SyncRunError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawInstance;
    use crate::config::DEFAULT_SSH_USER;
    use crate::resolver::{IdentityKey, KeyTable};
    use crate::test_support::ScriptedSource;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    fn profile() -> Profile {
        Profile {
            host_prefix: String::from("do-"),
            start_mark: String::from("#S"),
            end_mark: String::from("#E"),
            token: String::from("tok"),
            user: String::from(DEFAULT_SSH_USER),
            keys: KeyTable {
                default: Some(IdentityKey {
                    key: String::from("id_default"),
                    priority: 0,
                }),
                tag_to_key: [(
                    String::from("prod"),
                    IdentityKey {
                        key: String::from("id_prod"),
                        priority: 3,
                    },
                )]
                .into_iter()
                .collect(),
            },
        }
    }

    struct Target {
        _tmp: TempDir,
        path: Utf8PathBuf,
    }

    #[fixture]
    fn target() -> Target {
        let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("config"))
            .unwrap_or_else(|err| panic!("temp path should be utf8: {}", err.display()));
        std::fs::write(&path, "Host gw\n#S\nstale\n#E\ntail\n")
            .unwrap_or_else(|err| panic!("seed target: {err}"));
        Target { _tmp: tmp, path }
    }

    fn read(path: &Utf8Path) -> String {
        std::fs::read_to_string(path).unwrap_or_else(|err| panic!("read target: {err}"))
    }

    fn instance(name: &str, ip: &str, tags: &[&str]) -> RawInstance {
        RawInstance {
            name: name.to_owned(),
            public_ip: Some(ip.to_owned()),
            tags: tags.iter().map(|tag| (*tag).to_owned()).collect(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn execute_rewrites_only_the_managed_region(target: Target) {
        let source = ScriptedSource::new();
        source.push_instances(vec![
            instance("web2", "10.0.0.2", &[]),
            instance("web1", "10.0.0.1", &["prod"]),
        ]);
        let orchestrator = SyncOrchestrator::new(source);

        let report = orchestrator
            .execute(&profile(), &target.path)
            .await
            .unwrap_or_else(|err| panic!("execute: {err}"));

        assert_eq!(report.instances, 2);
        assert_eq!(
            read(&target.path),
            "Host gw\n#S\n\
             Host do-prod\n    # web1\n    Hostname 10.0.0.1\n    \
             IdentityFile ~/.ssh/id_prod\n    User user\n\
             Host do-web2\n    # web2\n    Hostname 10.0.0.2\n    \
             IdentityFile ~/.ssh/id_default\n    User user\n\
             #E\ntail\n"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn execute_twice_produces_identical_content(target: Target) {
        let source = ScriptedSource::new();
        source.push_instances(vec![instance("web1", "10.0.0.1", &["prod"])]);
        source.push_instances(vec![instance("web1", "10.0.0.1", &["prod"])]);
        let orchestrator = SyncOrchestrator::new(source);

        orchestrator
            .execute(&profile(), &target.path)
            .await
            .unwrap_or_else(|err| panic!("first run: {err}"));
        let first = read(&target.path);

        orchestrator
            .execute(&profile(), &target.path)
            .await
            .unwrap_or_else(|err| panic!("second run: {err}"));

        assert_eq!(read(&target.path), first);
    }

    #[rstest]
    #[tokio::test]
    async fn execute_leaves_the_file_untouched_when_markers_are_incomplete(target: Target) {
        std::fs::write(&target.path, "Host gw\n#S\nno end marker\n")
            .unwrap_or_else(|err| panic!("seed target: {err}"));
        let source = ScriptedSource::new();
        source.push_instances(vec![instance("web1", "10.0.0.1", &[])]);
        let orchestrator = SyncOrchestrator::new(source);

        let err = orchestrator
            .execute(&profile(), &target.path)
            .await
            .expect_err("execute should fail");

        assert!(
            matches!(
                err,
                SyncRunError::Region {
                    source: RegionError::EndMarkerMissing { .. },
                    ..
                }
            ),
            "unexpected error: {err}"
        );
        assert_eq!(read(&target.path), "Host gw\n#S\nno end marker\n");
    }

    #[rstest]
    #[tokio::test]
    async fn execute_surfaces_source_failures(target: Target) {
        let source = ScriptedSource::new();
        source.push_error("listing failed");
        let orchestrator = SyncOrchestrator::new(source);
        let before = read(&target.path);

        let err = orchestrator
            .execute(&profile(), &target.path)
            .await
            .expect_err("execute should fail");

        assert!(matches!(err, SyncRunError::Fetch(_)), "unexpected error: {err}");
        assert_eq!(read(&target.path), before);
    }

    #[rstest]
    #[tokio::test]
    async fn execute_aborts_on_malformed_records(target: Target) {
        let source = ScriptedSource::new();
        source.push_instances(vec![RawInstance {
            name: String::from("half-provisioned"),
            public_ip: None,
            tags: Vec::new(),
        }]);
        let orchestrator = SyncOrchestrator::new(source);
        let before = read(&target.path);

        let err = orchestrator
            .execute(&profile(), &target.path)
            .await
            .expect_err("execute should fail");

        assert!(matches!(err, SyncRunError::Record(_)), "unexpected error: {err}");
        assert_eq!(read(&target.path), before);
    }
}
