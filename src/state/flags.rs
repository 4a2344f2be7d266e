use serde::{Deserialize, Serialize};
use std::fmt;

/// Outstanding-validation flag carried by the enforcement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Flag {
    NeedsTesting,
    NeedsSecurityReview,
    NeedsDevopsReview,
}

impl Flag {
    pub const ALL: [Flag; 3] = [Flag::NeedsTesting, Flag::NeedsSecurityReview, Flag::NeedsDevopsReview];

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::NeedsTesting => "needsTesting",
            Flag::NeedsSecurityReview => "needsSecurityReview",
            Flag::NeedsDevopsReview => "needsDevopsReview",
        }
    }

    /// Name of the edit counter paired with this flag.
    pub fn counter_name(self) -> &'static str {
        match self {
            Flag::NeedsTesting => "editsSinceTest",
            Flag::NeedsSecurityReview => "editsSinceSecurityReview",
            Flag::NeedsDevopsReview => "editsSinceDevopsReview",
        }
    }

    pub fn cleared_by(self) -> ValidationKind {
        match self {
            Flag::NeedsTesting => ValidationKind::Testing,
            Flag::NeedsSecurityReview => ValidationKind::Security,
            Flag::NeedsDevopsReview => ValidationKind::DevopsReview,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of agent whose completion can clear a flag once its output shows
/// evidence of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationKind {
    Testing,
    Security,
    DevopsReview,
    Requirements,
}

impl ValidationKind {
    pub const ALL: [ValidationKind; 4] = [
        ValidationKind::Testing,
        ValidationKind::Security,
        ValidationKind::DevopsReview,
        ValidationKind::Requirements,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValidationKind::Testing => "testing",
            ValidationKind::Security => "security",
            ValidationKind::DevopsReview => "devops-review",
            ValidationKind::Requirements => "requirements",
        }
    }

    /// The flag an accepted validation of this kind clears. Requirements
    /// validation is recorded but owns no flag.
    pub fn clears(self) -> Option<Flag> {
        match self {
            ValidationKind::Testing => Some(Flag::NeedsTesting),
            ValidationKind::Security => Some(Flag::NeedsSecurityReview),
            ValidationKind::DevopsReview => Some(Flag::NeedsDevopsReview),
            ValidationKind::Requirements => None,
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
