//! Build metadata reported by `huginnd --version` and `/health`.

use serde::Serialize;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" outside a checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

const SHORT_SHA_LEN: usize = 7;

/// Build metadata of the running binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub sha: &'static str,
    pub dirty: bool,
}

impl BuildInfo {
    /// Metadata captured by the build script.
    pub fn current() -> Self {
        Self {
            version: PKG_VERSION,
            branch: GIT_BRANCH,
            sha: &GIT_SHA[..SHORT_SHA_LEN.min(GIT_SHA.len())],
            dirty: option_env!("VERGEN_GIT_DIRTY") == Some("true"),
        }
    }

    /// `{version}+{branch}.{sha}`, with `.dirty` appended for dirty trees.
    pub fn render(&self) -> String {
        let mut rendered = format!("{}+{}.{}", self.version, self.branch, self.sha);
        if self.dirty {
            rendered.push_str(".dirty");
        }
        rendered
    }
}

/// Full version string of the running binary, e.g. `0.1.0+main.abc1234`.
pub fn version_string() -> String {
    BuildInfo::current().render()
}
