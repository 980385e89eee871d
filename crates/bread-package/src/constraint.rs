//! Version constraint parsing and matching
//!
//! Wally-style constraint grammar: `*` (or empty) matches anything, `^X.Y.Z`
//! has npm caret semantics including the 0.x special cases, a bare `X` or
//! `X.Y` is caret shorthand, and a full `X.Y.Z` matches that version exactly.

use semver::Version;
use std::fmt;

use crate::{PackageError, Result};

/// Version constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// `*` or empty: any version
    Any,
    /// `X.Y.Z`: exactly that version
    Exact(Version),
    /// `^X.Y.Z` (or bare `X` / `X.Y`): compatible with that version
    Caret(Version),
}

impl Constraint {
    /// Parse a constraint expression. Unknown forms are `InvalidConstraint`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Constraint::Any);
        }

        let invalid = || PackageError::InvalidConstraint(s.to_string());

        if let Some(rest) = s.strip_prefix('^') {
            let version = Version::parse(&pad_partial(rest)).map_err(|_| invalid())?;
            return Ok(Constraint::Caret(version));
        }

        // Bare major or major.minor is caret shorthand
        let dots = s.matches('.').count();
        if dots < 2 {
            let version = Version::parse(&pad_partial(s)).map_err(|_| invalid())?;
            return Ok(Constraint::Caret(version));
        }

        let version = Version::parse(s).map_err(|_| invalid())?;
        Ok(Constraint::Exact(version))
    }

    /// Check whether a version satisfies this constraint.
    ///
    /// Pre-release versions only match when the constraint itself carries a
    /// pre-release on the same `major.minor.patch`.
    pub fn matches(&self, version: &Version) -> bool {
        let base = match self {
            Constraint::Any => {
                return version.pre.is_empty();
            }
            Constraint::Exact(base) => return version == base,
            Constraint::Caret(base) => base,
        };

        if !version.pre.is_empty()
            && (base.pre.is_empty()
                || (version.major, version.minor, version.patch)
                    != (base.major, base.minor, base.patch))
        {
            return false;
        }

        if version < base {
            return false;
        }

        // ^1.2.3 := >=1.2.3 <2.0.0
        // ^0.2.3 := >=0.2.3 <0.3.0
        // ^0.0.3 := exactly 0.0.3
        if base.major > 0 {
            version.major == base.major
        } else if base.minor > 0 {
            version.major == 0 && version.minor == base.minor
        } else {
            (version.major, version.minor, version.patch)
                == (base.major, base.minor, base.patch)
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Any => f.write_str("*"),
            Constraint::Exact(v) => write!(f, "{v}"),
            Constraint::Caret(v) => write!(f, "^{v}"),
        }
    }
}

/// Pad `1` to `1.0.0` and `1.2` to `1.2.0`
fn pad_partial(s: &str) -> String {
    match s.matches('.').count() {
        0 => format!("{s}.0.0"),
        1 => format!("{s}.0"),
        _ => s.to_string(),
    }
}
