//! Semantic version of the library.
//!
//! The version is `MAJOR.MINOR.PATCH`, with a `-QUALIFIER.ITERATION` suffix while the
//! release is in a pre-release stage:
//!
//! 1. MAJOR: incompatible changes
//! 2. MINOR: backwards-compatible features
//! 3. PATCH: backwards-compatible bug fixes
//! 4. QUALIFIER: pre-release stage (`a`, `b`, `rc`) and its iteration
//!
//! Compiled-in defaults can be overridden with `MAJOR_VERSION`, `MINOR_VERSION`,
//! `PATCH_VERSION`, `DEV_STAGE` and `STAGE_ITERATION`.

use std::fmt;

const DEFAULT_MAJOR: u32 = 2;
const DEFAULT_MINOR: u32 = 5;
const DEFAULT_PATCH: u32 = 8;
const DEFAULT_STAGE: DevStage = DevStage::ReleaseCandidate;
const DEFAULT_STAGE_ITERATION: u32 = 2;

/// Environment variable overriding the major component.
pub const MAJOR_VERSION_ENV: &str = "MAJOR_VERSION";
/// Environment variable overriding the minor component.
pub const MINOR_VERSION_ENV: &str = "MINOR_VERSION";
/// Environment variable overriding the patch component.
pub const PATCH_VERSION_ENV: &str = "PATCH_VERSION";
/// Environment variable overriding the development stage (1 to 5).
pub const DEV_STAGE_ENV: &str = "DEV_STAGE";
/// Environment variable overriding the stage iteration.
pub const STAGE_ITERATION_ENV: &str = "STAGE_ITERATION";

/// Development stage of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevStage {
    /// Early, unstable
    Alpha = 1,
    /// Feature complete, unstable
    Beta = 2,
    /// Candidate for release
    ReleaseCandidate = 3,
    /// Released
    Release = 4,
    /// Fix on top of a release
    PostReleaseFix = 5,
}

impl DevStage {
    /// Maps the numeric stage used in `DEV_STAGE`.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(DevStage::Alpha),
            2 => Some(DevStage::Beta),
            3 => Some(DevStage::ReleaseCandidate),
            4 => Some(DevStage::Release),
            5 => Some(DevStage::PostReleaseFix),
            _ => None,
        }
    }

    /// Human readable name.
    pub fn name(&self) -> &'static str {
        match self {
            DevStage::Alpha => "Alpha",
            DevStage::Beta => "Beta",
            DevStage::ReleaseCandidate => "Release Candidate",
            DevStage::Release => "Release",
            DevStage::PostReleaseFix => "Post Release Fix",
        }
    }

    /// Pre-release qualifier, `None` for released stages.
    pub fn qualifier(&self) -> Option<&'static str> {
        match self {
            DevStage::Alpha => Some("a"),
            DevStage::Beta => Some("b"),
            DevStage::ReleaseCandidate => Some("rc"),
            DevStage::Release | DevStage::PostReleaseFix => None,
        }
    }
}

impl fmt::Display for DevStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A semantic version.
///
/// # Examples
///
/// ```
/// use mpesa_rs::version::{DevStage, Version};
///
/// let release = Version::new(2, 5, 8, DevStage::Release, 0);
/// assert_eq!(release.to_string(), "2.5.8");
///
/// let alpha = Version::new(1, 4, 8, DevStage::Alpha, 2);
/// assert_eq!(alpha.to_string(), "1.4.8-a.2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Incompatible changes
    pub major: u32,
    /// Backwards-compatible features
    pub minor: u32,
    /// Backwards-compatible fixes
    pub patch: u32,
    /// Development stage
    pub stage: DevStage,
    /// Iteration within a pre-release stage
    pub stage_iteration: u32,
}

impl Version {
    /// Creates a version from its components.
    pub const fn new(
        major: u32,
        minor: u32,
        patch: u32,
        stage: DevStage,
        stage_iteration: u32,
    ) -> Self {
        Self {
            major,
            minor,
            patch,
            stage,
            stage_iteration,
        }
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads overrides through `lookup`, falling back to the compiled-in defaults
    /// for missing, empty or invalid values.
    ///
    /// # Examples
    ///
    /// ```
    /// use mpesa_rs::version::Version;
    ///
    /// let v = Version::from_lookup(|name| match name {
    ///     "DEV_STAGE" => Some("4".to_string()),
    ///     "PATCH_VERSION" => Some("9".to_string()),
    ///     _ => None,
    /// });
    /// assert_eq!(v.to_string(), "2.5.9");
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |name: &str, default: u32| -> u32 {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => match value.trim().parse() {
                    Ok(n) => n,
                    Err(_) => {
                        tracing::warn!(
                            variable = name,
                            %value,
                            "ignoring invalid version override"
                        );
                        default
                    }
                },
                _ => default,
            }
        };

        let stage_number = number(DEV_STAGE_ENV, DEFAULT_STAGE as u32);
        let stage = DevStage::from_number(stage_number).unwrap_or_else(|| {
            tracing::warn!(
                variable = DEV_STAGE_ENV,
                stage = stage_number,
                "ignoring unknown development stage"
            );
            DEFAULT_STAGE
        });

        Self {
            major: number(MAJOR_VERSION_ENV, DEFAULT_MAJOR),
            minor: number(MINOR_VERSION_ENV, DEFAULT_MINOR),
            patch: number(PATCH_VERSION_ENV, DEFAULT_PATCH),
            stage,
            stage_iteration: number(STAGE_ITERATION_ENV, DEFAULT_STAGE_ITERATION),
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAJOR,
            DEFAULT_MINOR,
            DEFAULT_PATCH,
            DEFAULT_STAGE,
            DEFAULT_STAGE_ITERATION,
        )
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(qualifier) = self.stage.qualifier() {
            write!(f, "-{}.{}", qualifier, self.stage_iteration)?;
        }
        Ok(())
    }
}

/// Returns the semantic version for the current process environment.
pub fn version() -> String {
    Version::from_env().to_string()
}
