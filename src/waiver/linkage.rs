use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkageCandidates {
    pub member_by_email: Option<Uuid>,
    pub member_by_document: Option<Uuid>,
    /// Latest registration of the participant for the event and its member link.
    pub registration: Option<(Uuid, Option<Uuid>)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Linkage {
    pub member_id: Option<Uuid>,
    pub event_registration_id: Option<Uuid>,
    /// Email and document lookups pointed at different members.
    pub ambiguous: bool,
}

/// Picks the member in order email, document id, registration's own member.
pub fn resolve_linkage(candidates: LinkageCandidates) -> Linkage {
    let ambiguous = matches!(
        (candidates.member_by_email, candidates.member_by_document),
        (Some(a), Some(b)) if a != b
    );

    let member_id = candidates
        .member_by_email
        .or(candidates.member_by_document)
        .or_else(|| candidates.registration.and_then(|(_, member)| member));

    Linkage {
        member_id,
        event_registration_id: candidates.registration.map(|(id, _)| id),
        ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_found_links_nothing() {
        assert_eq!(resolve_linkage(LinkageCandidates::default()), Linkage::default());
    }

    #[test]
    fn email_wins_and_conflict_is_flagged() {
        let by_email = Uuid::new_v4();
        let by_doc = Uuid::new_v4();
        let out = resolve_linkage(LinkageCandidates {
            member_by_email: Some(by_email),
            member_by_document: Some(by_doc),
            registration: None,
        });
        assert_eq!(out.member_id, Some(by_email));
        assert!(out.ambiguous);
    }

    #[test]
    fn falls_back_to_registration_member() {
        let reg = Uuid::new_v4();
        let member = Uuid::new_v4();
        let out = resolve_linkage(LinkageCandidates {
            member_by_email: None,
            member_by_document: None,
            registration: Some((reg, Some(member))),
        });
        assert_eq!(out.member_id, Some(member));
        assert_eq!(out.event_registration_id, Some(reg));
        assert!(!out.ambiguous);
    }
}
