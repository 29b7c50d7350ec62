use crate::catalog::Catalog;
use crate::domain::error::ServiceError;
use crate::domain::waiver::WaiverDocument;

/// Looks up the published waiver for `(event_id, version)`.
///
/// The version is only a selector: the text always comes from the catalog.
/// Unknown events are `NotFound`; a known event without that version is a
/// validation failure.
pub fn resolve_waiver_or_fail(
    catalog: &Catalog,
    event_id: &str,
    requested_version: &str,
) -> Result<WaiverDocument, ServiceError> {
    let event = catalog
        .event(event_id)
        .ok_or_else(|| ServiceError::not_found(format!("unknown event {event_id}")))?;

    let waiver = event
        .waivers
        .iter()
        .find(|w| w.version == requested_version)
        .ok_or_else(|| {
            ServiceError::validation(format!(
                "no waiver version {requested_version} published for event {event_id}"
            ))
        })?;

    Ok(WaiverDocument {
        event_id: event.id.clone(),
        event_name: event.name.clone(),
        version: waiver.version.clone(),
        text: waiver.text.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{"events":[{"id":"E1","name":"Event One","fee_minor":100,
                "waivers":[{"version":"v1","text":"Waiver one"}]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn resolves_published_version() {
        let doc = resolve_waiver_or_fail(&catalog(), "E1", "v1").unwrap();
        assert_eq!(doc.text, "Waiver one");
        assert_eq!(doc.event_name, "Event One");
    }

    #[test]
    fn unknown_event_is_not_found() {
        let err = resolve_waiver_or_fail(&catalog(), "E9", "v1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn unknown_version_is_validation_error() {
        let err = resolve_waiver_or_fail(&catalog(), "E1", "v2").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
    }
}
