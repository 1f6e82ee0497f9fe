//! Access policy predicates.
//!
//! Every rule has the same shape: the resource's own author may act when
//! they hold the base capability, anyone holding the elevated manage
//! capability may act on any resource, everyone else is denied. The
//! predicates are pure; `ensure_*` wrappers turn a denial into
//! `DomainError::Forbidden` so the HTTP layer renders a 403 instead of
//! silently no-opping.

use crate::actor::Actor;
use crate::config::PermissionsConfig;
use crate::domain::error::{DomainError, DomainResult};

pub fn can_edit(actor: &Actor, author_id: Option<&str>, permissions: &PermissionsConfig) -> bool {
    actor.has_capability(&permissions.manage)
        || (actor.is_author_of(author_id) && actor.has_capability(&permissions.submit))
}

pub fn can_delete(actor: &Actor, author_id: Option<&str>, permissions: &PermissionsConfig) -> bool {
    can_edit(actor, author_id, permissions)
}

/// Non-public requests exist only for managers; everyone else gets the
/// same absence a missing id would produce, so private requests and their
/// subresources never leak.
pub fn can_view(actor: &Actor, is_public: bool, permissions: &PermissionsConfig) -> bool {
    is_public || actor.has_capability(&permissions.manage)
}

pub fn can_submit(actor: &Actor, permissions: &PermissionsConfig) -> bool {
    actor.has_capability(&permissions.submit) || actor.has_capability(&permissions.manage)
}

pub fn can_moderate(actor: &Actor, permissions: &PermissionsConfig) -> bool {
    actor.has_capability(&permissions.manage)
}

pub fn can_vote(actor: &Actor, permissions: &PermissionsConfig) -> bool {
    actor.has_capability(&permissions.vote) || actor.has_capability(&permissions.manage)
}

pub fn can_comment(actor: &Actor, permissions: &PermissionsConfig) -> bool {
    actor.has_capability(&permissions.comment) || actor.has_capability(&permissions.manage)
}

pub fn can_delete_comment(
    actor: &Actor,
    author_id: Option<&str>,
    permissions: &PermissionsConfig,
) -> bool {
    actor.has_capability(&permissions.manage)
        || (actor.is_author_of(author_id) && actor.has_capability(&permissions.comment))
}

pub fn ensure_can_edit(
    actor: &Actor,
    author_id: Option<&str>,
    permissions: &PermissionsConfig,
) -> DomainResult<()> {
    if can_edit(actor, author_id, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden(
            "not the author and missing manage capability",
        ))
    }
}

pub fn ensure_can_delete(
    actor: &Actor,
    author_id: Option<&str>,
    permissions: &PermissionsConfig,
) -> DomainResult<()> {
    ensure_can_edit(actor, author_id, permissions)
}

pub fn ensure_can_submit(actor: &Actor, permissions: &PermissionsConfig) -> DomainResult<()> {
    if can_submit(actor, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden("missing submit capability"))
    }
}

pub fn ensure_can_vote(actor: &Actor, permissions: &PermissionsConfig) -> DomainResult<()> {
    if can_vote(actor, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden("missing vote capability"))
    }
}

pub fn ensure_can_comment(actor: &Actor, permissions: &PermissionsConfig) -> DomainResult<()> {
    if can_comment(actor, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden("missing comment capability"))
    }
}

pub fn ensure_can_moderate(actor: &Actor, permissions: &PermissionsConfig) -> DomainResult<()> {
    if can_moderate(actor, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden("missing manage capability"))
    }
}

pub fn ensure_can_delete_comment(
    actor: &Actor,
    author_id: Option<&str>,
    permissions: &PermissionsConfig,
) -> DomainResult<()> {
    if can_delete_comment(actor, author_id, permissions) {
        Ok(())
    } else {
        Err(DomainError::forbidden(
            "not the comment author and missing manage capability",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn actor(id: &str, capabilities: &[&str]) -> Actor {
        Actor {
            id: Some(id.to_string()),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn permissions() -> PermissionsConfig {
        PermissionsConfig::default()
    }

    #[test]
    fn author_with_base_capability_may_edit_own() {
        let perms = permissions();
        let author = actor("user-1", &["submit_feature_requests"]);
        assert!(can_edit(&author, Some("user-1"), &perms));
        assert!(!can_edit(&author, Some("user-2"), &perms));
    }

    #[test]
    fn author_without_base_capability_is_denied() {
        let perms = permissions();
        let author = actor("user-1", &[]);
        assert!(!can_edit(&author, Some("user-1"), &perms));
    }

    #[test]
    fn manager_may_act_on_any_resource() {
        let perms = permissions();
        let admin = actor("admin", &["manage_feature_requests"]);
        assert!(can_edit(&admin, Some("user-2"), &perms));
        assert!(can_delete(&admin, Some("user-2"), &perms));
        assert!(can_moderate(&admin, &perms));
        assert!(can_vote(&admin, &perms));
        assert!(can_comment(&admin, &perms));
    }

    #[test]
    fn anonymous_is_denied_everywhere() {
        let perms = permissions();
        let anonymous = Actor {
            id: None,
            capabilities: HashSet::new(),
        };
        assert!(!can_edit(&anonymous, Some("user-1"), &perms));
        assert!(!can_moderate(&anonymous, &perms));
        assert!(ensure_can_moderate(&anonymous, &perms).is_err());
    }

    #[test]
    fn private_requests_visible_to_managers_only() {
        let perms = permissions();
        let admin = actor("admin", &["manage_feature_requests"]);
        let voter = actor("user-1", &["vote_feature_requests"]);
        let anonymous = Actor::anonymous();

        assert!(can_view(&voter, true, &perms));
        assert!(can_view(&anonymous, true, &perms));
        assert!(can_view(&admin, false, &perms));
        assert!(!can_view(&voter, false, &perms));
        assert!(!can_view(&anonymous, false, &perms));
    }

    #[test]
    fn comment_deletion_allows_author_or_moderator() {
        let perms = permissions();
        let author = actor("user-1", &["comment_feature_requests"]);
        let stranger = actor("user-2", &["comment_feature_requests"]);
        let admin = actor("admin", &["manage_feature_requests"]);
        assert!(can_delete_comment(&author, Some("user-1"), &perms));
        assert!(!can_delete_comment(&stranger, Some("user-1"), &perms));
        assert!(can_delete_comment(&admin, Some("user-1"), &perms));
    }

    #[test]
    fn denial_is_an_error_not_a_noop() {
        let perms = permissions();
        let stranger = actor("user-2", &[]);
        let err = ensure_can_edit(&stranger, Some("user-1"), &perms).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
