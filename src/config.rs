//! Named profile loading for `dropsync`.
//!
//! A profile is a small JSON document holding the provider token, the
//! managed-region markers, and the tag-to-key table. Profiles are selected
//! by name on the command line and resolved to
//! `~/.config/dropsync/<name>.json` through `ortho-config`'s discovery
//! candidates, so an explicit path override via `DROPSYNC_PROFILE_PATH`
//! also works.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use ortho_config::ConfigDiscovery;
use serde::Deserialize;
use thiserror::Error;

use crate::resolver::KeyTable;

const APP_NAME: &str = "dropsync";
const PROFILE_ENV_VAR: &str = "DROPSYNC_PROFILE_PATH";

/// Remote user written into generated blocks when the profile omits one.
pub const DEFAULT_SSH_USER: &str = "user";

/// Immutable per-run configuration loaded from a named JSON profile.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Prefix prepended to every generated alias.
    pub host_prefix: String,
    /// Line marking the start of the managed region (compared trimmed).
    pub start_mark: String,
    /// Line marking the end of the managed region (compared trimmed).
    pub end_mark: String,
    /// Provider API token.
    pub token: String,
    /// Remote user for generated blocks. Defaults to `user`.
    #[serde(default = "default_user")]
    pub user: String,
    /// Identity key table.
    #[serde(default)]
    pub keys: KeyTable,
}

fn default_user() -> String {
    String::from(DEFAULT_SSH_USER)
}

impl Profile {
    /// Performs semantic validation on required fields.
    ///
    /// The host prefix may legitimately be empty; markers, token, and user
    /// may not.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::MissingField`] when a required field is
    /// empty.
    pub fn validate(&self) -> Result<(), ProfileError> {
        Self::require_field(&self.start_mark, "startMark")?;
        Self::require_field(&self.end_mark, "endMark")?;
        Self::require_field(&self.token, "token")?;
        Self::require_field(&self.user, "user")?;
        Ok(())
    }

    fn require_field(value: &str, json_key: &'static str) -> Result<(), ProfileError> {
        if value.trim().is_empty() {
            return Err(ProfileError::MissingField(format!(
                "missing '{json_key}': add it to the profile JSON"
            )));
        }
        Ok(())
    }
}

/// Errors raised while locating, reading, or validating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Raised when no candidate profile file exists.
    #[error("profile '{name}' not found; searched {searched}")]
    NotFound {
        /// Profile name requested on the command line.
        name: String,
        /// Candidate paths that were checked.
        searched: String,
    },
    /// Raised when file system operations fail.
    #[error("failed to access {path}: {message}")]
    Io {
        /// Path that could not be accessed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when parsing profile JSON fails.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when a required profile field is empty or missing.
    #[error("invalid profile: {0}")]
    MissingField(String),
}

/// Locates and reads named profiles using `OrthoConfig`'s discovery order.
#[derive(Clone, Debug, Default)]
pub struct ProfileStore {
    root_override: Option<Utf8PathBuf>,
}

impl ProfileStore {
    /// Builds a store using the standard discovery settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root_override: None,
        }
    }

    /// Builds a store that only searches `root`, for tests and embedding.
    #[must_use]
    pub fn with_root(root: &Utf8Path) -> Self {
        Self {
            root_override: Some(root.to_path_buf()),
        }
    }

    /// Loads and validates the profile with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] when no candidate file exists,
    /// [`ProfileError::Io`] or [`ProfileError::Parse`] when reading or
    /// decoding fails, and [`ProfileError::MissingField`] when validation
    /// rejects the content.
    pub fn load(&self, name: &str) -> Result<Profile, ProfileError> {
        let candidates = self.candidates(name);
        let mut searched = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            if path_exists(candidate)? {
                let contents = read_file(candidate)?;
                let profile: Profile =
                    serde_json::from_str(&contents).map_err(|err| ProfileError::Parse {
                        path: candidate.clone(),
                        message: err.to_string(),
                    })?;
                profile.validate()?;
                return Ok(profile);
            }
            searched.push(candidate.as_str().to_owned());
        }

        Err(ProfileError::NotFound {
            name: name.to_owned(),
            searched: searched.join(", "),
        })
    }

    fn candidates(&self, name: &str) -> Vec<Utf8PathBuf> {
        let file_name = format!("{name}.json");
        let mut builder = ConfigDiscovery::builder(APP_NAME)
            .env_var(PROFILE_ENV_VAR)
            .config_file_name(file_name.as_str())
            .dotfile_name(format!(".dropsync-{name}.json").as_str())
            .project_file_name(file_name.as_str());
        if let Some(root) = &self.root_override {
            builder = builder.clear_project_roots().add_project_root(root);
        }
        builder.build().utf8_candidates()
    }
}

fn path_exists(path: &Utf8Path) -> Result<bool, ProfileError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let Some(file_name) = path.file_name() else {
        return Ok(false);
    };

    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir.try_exists(file_name).map_err(|err| ProfileError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ProfileError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

fn read_file(path: &Utf8Path) -> Result<String, ProfileError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| ProfileError::Io {
        path: path.to_path_buf(),
        message: String::from("profile path is missing a filename"),
    })?;

    let dir =
        Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| ProfileError::Io {
            path: parent.to_path_buf(),
            message: err.to_string(),
        })?;

    dir.read_to_string(file_name).map_err(|err| ProfileError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}
