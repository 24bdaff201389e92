//! Search engine discovery.
//!
//! derp drives an external line-oriented matcher. ripgrep is preferred when it
//! is on `PATH`; `grep` is the universally available fallback. If neither can
//! be found the run stops before any model call is made.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Which engine the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePreference {
    /// ripgrep if available, otherwise grep.
    #[default]
    Auto,
    /// ripgrep only.
    #[serde(rename = "rg", alias = "ripgrep")]
    Ripgrep,
    /// grep only.
    Grep,
}

impl EnginePreference {
    /// Parse a preference name (`auto`, `rg`/`ripgrep`, `grep`).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "rg" | "ripgrep" => Some(Self::Ripgrep),
            "grep" => Some(Self::Grep),
            _ => None,
        }
    }

    const fn candidates(self) -> &'static [EngineKind] {
        match self {
            Self::Auto => &[EngineKind::Ripgrep, EngineKind::Grep],
            Self::Ripgrep => &[EngineKind::Ripgrep],
            Self::Grep => &[EngineKind::Grep],
        }
    }
}

/// Identity of a resolved engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// ripgrep, the primary engine.
    Ripgrep,
    /// POSIX grep, the fallback engine.
    Grep,
}

impl EngineKind {
    /// Executable name looked up on `PATH`.
    #[must_use]
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Ripgrep => "rg",
            Self::Grep => "grep",
        }
    }

    /// Whether this is the preferred engine.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::Ripgrep)
    }

    /// Flag that switches the engine into ERE mode.
    ///
    /// ripgrep's default syntax already accepts ERE, and its `-E` means
    /// `--encoding`, so it gets none.
    #[must_use]
    pub const fn ere_flag(self) -> Option<&'static str> {
        match self {
            Self::Ripgrep => None,
            Self::Grep => Some("-E"),
        }
    }

    /// Flag injected when a bare query should search the working tree.
    ///
    /// ripgrep recurses by default.
    #[must_use]
    pub const fn recursive_flag(self) -> Option<&'static str> {
        match self {
            Self::Ripgrep => None,
            Self::Grep => Some("-r"),
        }
    }

    /// Whether a bare query already searches the working tree.
    #[must_use]
    pub const fn recurses_by_default(self) -> bool {
        self.recursive_flag().is_none()
    }

    /// grep-style flags that mean something else to this engine and must not
    /// be forwarded to it.
    #[must_use]
    pub const fn foreign_flags(self) -> &'static [&'static str] {
        match self {
            Self::Ripgrep => &["-E", "--extended-regexp", "-r", "-R", "--recursive"],
            Self::Grep => &[],
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// A resolved engine: identity plus the executable to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDescriptor {
    kind: EngineKind,
    path: PathBuf,
}

impl EngineDescriptor {
    /// Describe an engine at a known path.
    ///
    /// Callers normally use [`resolve_engine`]; this exists for embedding and tests.
    pub fn new(kind: EngineKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Engine identity.
    #[must_use]
    pub const fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Executable path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve an engine against the process `PATH`.
#[instrument(level = "debug")]
pub fn resolve_engine(preference: EnginePreference) -> Result<EngineDescriptor> {
    resolve_with(preference, |name| which::which(name).ok())
}

/// Resolve an engine against an explicit search path (same syntax as `PATH`).
pub fn resolve_engine_in(
    preference: EnginePreference,
    search_path: &OsStr,
) -> Result<EngineDescriptor> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_with(preference, |name| {
        which::which_in(name, Some(search_path), &cwd).ok()
    })
}

fn resolve_with<F>(preference: EnginePreference, lookup: F) -> Result<EngineDescriptor>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    for &kind in preference.candidates() {
        if let Some(path) = lookup(kind.binary_name()) {
            debug!(engine = %kind, path = %path.display(), "resolved search engine");
            return Ok(EngineDescriptor { kind, path });
        }
        debug!(engine = %kind, "engine not found on search path");
    }

    Err(Error::EngineNotFound(match preference {
        EnginePreference::Auto => "Neither ripgrep (rg) nor grep found in PATH".to_string(),
        EnginePreference::Ripgrep => "ripgrep (rg) not found in PATH".to_string(),
        EnginePreference::Grep => "grep not found in PATH".to_string(),
    }))
}
