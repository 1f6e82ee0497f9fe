use std::collections::HashSet;

use axum::http::HeaderMap;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_CAPABILITIES_HEADER: &str = "x-actor-capabilities";

pub const MAX_ACTOR_ID_LEN: usize = 128;
pub const MAX_CAPABILITY_LEN: usize = 64;
pub const MAX_CAPABILITIES: usize = 32;

/// The current caller as resolved by the fronting identity layer. An
/// anonymous request carries no id and an empty capability set.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub id: Option<String>,
    pub capabilities: HashSet<String>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(name)
    }

    pub fn is_author_of(&self, author_id: Option<&str>) -> bool {
        match (self.id.as_deref(), author_id) {
            (Some(actor), Some(author)) => actor == author,
            _ => false,
        }
    }
}

/// Builds the actor from trusted proxy headers. Malformed values degrade to
/// anonymous rather than erroring: authorization decisions stay with the
/// policy layer.
pub fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let id = headers
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(sanitize_actor_id);

    let capabilities = headers
        .get(ACTOR_CAPABILITIES_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(parse_capabilities)
        .unwrap_or_default();

    Actor { id, capabilities }
}

pub fn sanitize_actor_id(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_ACTOR_ID_LEN {
        return None;
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':' | '.' | '@'))
    {
        return None;
    }
    Some(trimmed.to_string())
}

pub fn parse_capabilities(value: &str) -> HashSet<String> {
    let mut capabilities = HashSet::new();
    for raw in value.split(',') {
        if capabilities.len() >= MAX_CAPABILITIES {
            break;
        }
        let name = raw.trim().to_ascii_lowercase();
        if name.is_empty() || name.len() > MAX_CAPABILITY_LEN {
            continue;
        }
        capabilities.insert(name);
    }
    capabilities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_id_sanitization() {
        assert_eq!(sanitize_actor_id(" user-42 ").as_deref(), Some("user-42"));
        assert_eq!(sanitize_actor_id("a@example.com").as_deref(), Some("a@example.com"));
        assert!(sanitize_actor_id("").is_none());
        assert!(sanitize_actor_id("has space").is_none());
        let too_long = "a".repeat(MAX_ACTOR_ID_LEN + 1);
        assert!(sanitize_actor_id(&too_long).is_none());
    }

    #[test]
    fn capability_parsing() {
        let caps = parse_capabilities("Manage_Feature_Requests, vote_feature_requests ,,");
        assert!(caps.contains("manage_feature_requests"));
        assert!(caps.contains("vote_feature_requests"));
        assert_eq!(caps.len(), 2);
    }

    #[test]
    fn capability_list_bounded() {
        let many = (0..100).map(|i| format!("cap{i}")).collect::<Vec<_>>().join(",");
        let caps = parse_capabilities(&many);
        assert_eq!(caps.len(), MAX_CAPABILITIES);
    }

    #[test]
    fn authorship_requires_identity() {
        let anonymous = Actor::anonymous();
        assert!(!anonymous.is_author_of(Some("user-1")));

        let actor = Actor {
            id: Some("user-1".to_string()),
            capabilities: HashSet::new(),
        };
        assert!(actor.is_author_of(Some("user-1")));
        assert!(!actor.is_author_of(Some("user-2")));
        assert!(!actor.is_author_of(None));
    }

    #[test]
    fn headers_resolve_to_actor() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, "user-7".parse().unwrap());
        headers.insert(ACTOR_CAPABILITIES_HEADER, "vote_feature_requests".parse().unwrap());
        let actor = actor_from_headers(&headers);
        assert_eq!(actor.id.as_deref(), Some("user-7"));
        assert!(actor.has_capability("vote_feature_requests"));

        let anonymous = actor_from_headers(&HeaderMap::new());
        assert!(anonymous.is_anonymous());
    }
}
