use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::classify::FileClassification;
use crate::state::{EditRecord, EnforcementState, Flag};

/// What a recorded edit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Flags that were clear before this edit and are now set.
    pub newly_raised: Vec<Flag>,
    pub security_sensitive: bool,
}

/// Apply one edit to `state`. Callers filter exempt paths first.
///
/// Testing and devops counters always advance; the security counter and
/// `securitySensitiveEdits` only for security or hook files. Flags follow the
/// classification, so documentation edits advance counters without raising
/// anything.
pub fn record_edit(
    state: &mut EnforcementState,
    classification: &FileClassification,
    now: DateTime<Utc>,
) -> EditOutcome {
    state.bump(Flag::NeedsTesting);
    state.bump(Flag::NeedsDevopsReview);

    let security_sensitive = classification.is_security_sensitive();
    if security_sensitive {
        state.bump(Flag::NeedsSecurityReview);
        state
            .security_sensitive_edits
            .insert_unique(classification.path.clone());
    }

    let flags: BTreeSet<Flag> = classification.flags();
    let newly_raised: Vec<Flag> = flags.iter().copied().filter(|f| !state.flag(*f)).collect();
    for flag in &flags {
        state.raise(*flag);
    }

    for category in classification.categories() {
        *state.edits_by_file_type.entry(category).or_insert(0) += 1;
    }

    state.recent_edits.push(EditRecord {
        file: classification.path.clone(),
        timestamp: now,
        categories: classification.categories(),
        priority: classification.priority(),
        descriptions: classification.descriptions(),
    });
    state.last_edit_timestamp = Some(now);
    state.last_edit_file = Some(classification.path.clone());

    tracing::info!(
        file = %classification.path,
        categories = ?classification.categories(),
        raised = ?newly_raised,
        "edit recorded"
    );

    EditOutcome {
        newly_raised,
        security_sensitive,
    }
}
