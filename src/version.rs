//! Build identity embedded by `build.rs`.

use std::fmt;

use serde::Serialize;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" outside a checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// What the `consilium version` command prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_branch: &'static str,
    pub git_sha: &'static str,
    pub dirty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_at: Option<&'static str>,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: PKG_VERSION,
            git_branch: GIT_BRANCH,
            git_sha: GIT_SHA,
            dirty: matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true")),
            built_at: option_env!("VERGEN_BUILD_TIMESTAMP"),
        }
    }

    fn short_sha(&self) -> &'static str {
        &self.git_sha[..7.min(self.git_sha.len())]
    }
}

/// `{version}+{branch}.{sha7}`, with `.dirty` appended for dirty trees.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}.{}", self.version, self.git_branch, self.short_sha())?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}
