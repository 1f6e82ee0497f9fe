use crate::domain::error::{DomainError, DomainResult};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_UNDER_REVIEW: &str = "under_review";
pub const STATUS_PLANNED: &str = "planned";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_REJECTED: &str = "rejected";

pub const ALL_STATUSES: [&str; 6] = [
    STATUS_PENDING,
    STATUS_UNDER_REVIEW,
    STATUS_PLANNED,
    STATUS_IN_PROGRESS,
    STATUS_COMPLETED,
    STATUS_REJECTED,
];

/// Statuses during which a feature request accepts votes.
pub const VOTABLE_STATUSES: [&str; 3] = [STATUS_PENDING, STATUS_UNDER_REVIEW, STATUS_PLANNED];

pub const PRIORITY_LOW: &str = "low";
pub const PRIORITY_MEDIUM: &str = "medium";
pub const PRIORITY_HIGH: &str = "high";
pub const PRIORITY_CRITICAL: &str = "critical";

pub const ALL_PRIORITIES: [&str; 4] = [
    PRIORITY_LOW,
    PRIORITY_MEDIUM,
    PRIORITY_HIGH,
    PRIORITY_CRITICAL,
];

pub const VOTE_UP: &str = "up";
pub const VOTE_DOWN: &str = "down";

pub fn normalize_status(value: &str) -> DomainResult<&'static str> {
    let normalized = value.trim().to_ascii_lowercase();
    ALL_STATUSES
        .iter()
        .find(|known| **known == normalized)
        .copied()
        .ok_or_else(|| DomainError::validation("status", format!("unknown status '{normalized}'")))
}

pub fn normalize_priority(value: &str) -> DomainResult<&'static str> {
    let normalized = value.trim().to_ascii_lowercase();
    ALL_PRIORITIES
        .iter()
        .find(|known| **known == normalized)
        .copied()
        .ok_or_else(|| {
            DomainError::validation("priority", format!("unknown priority '{normalized}'"))
        })
}

pub fn normalize_vote_type(value: &str) -> DomainResult<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        VOTE_UP | "upvote" | "+1" => Ok(VOTE_UP),
        VOTE_DOWN | "downvote" | "-1" => Ok(VOTE_DOWN),
        other => Err(DomainError::validation(
            "vote_type",
            format!("unknown vote type '{other}'"),
        )),
    }
}

pub fn is_votable_status(status: &str) -> bool {
    VOTABLE_STATUSES.contains(&status)
}

/// Presentation metadata for a status, sent alongside the raw value so
/// clients never maintain their own mapping.
pub fn status_display(status: &str) -> (&'static str, &'static str, &'static str) {
    match status {
        STATUS_PENDING => ("Pending", "#9ca3af", "Awaiting initial triage"),
        STATUS_UNDER_REVIEW => ("Under Review", "#f59e0b", "Being evaluated by the team"),
        STATUS_PLANNED => ("Planned", "#3b82f6", "Accepted and scheduled"),
        STATUS_IN_PROGRESS => ("In Progress", "#8b5cf6", "Actively being built"),
        STATUS_COMPLETED => ("Completed", "#22c55e", "Shipped"),
        STATUS_REJECTED => ("Rejected", "#ef4444", "Will not be implemented"),
        _ => ("Unknown", "#6b7280", "Unrecognized status"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_normalization() {
        assert_eq!(normalize_status("PENDING").unwrap(), STATUS_PENDING);
        assert_eq!(normalize_status(" under_review ").unwrap(), STATUS_UNDER_REVIEW);
        assert!(normalize_status("archived").is_err());
    }

    #[test]
    fn priority_normalization() {
        assert_eq!(normalize_priority("Critical").unwrap(), PRIORITY_CRITICAL);
        assert!(normalize_priority("urgent").is_err());
    }

    #[test]
    fn vote_type_aliases() {
        assert_eq!(normalize_vote_type("up").unwrap(), VOTE_UP);
        assert_eq!(normalize_vote_type("UPVOTE").unwrap(), VOTE_UP);
        assert_eq!(normalize_vote_type("-1").unwrap(), VOTE_DOWN);
        assert!(normalize_vote_type("sideways").is_err());
    }

    #[test]
    fn voting_window_matches_lifecycle() {
        assert!(is_votable_status(STATUS_PENDING));
        assert!(is_votable_status(STATUS_UNDER_REVIEW));
        assert!(is_votable_status(STATUS_PLANNED));
        assert!(!is_votable_status(STATUS_IN_PROGRESS));
        assert!(!is_votable_status(STATUS_COMPLETED));
        assert!(!is_votable_status(STATUS_REJECTED));
    }

    #[test]
    fn every_status_has_display_metadata() {
        for status in ALL_STATUSES {
            let (label, color, description) = status_display(status);
            assert_ne!(label, "Unknown");
            assert!(color.starts_with('#'));
            assert!(!description.is_empty());
        }
    }
}
