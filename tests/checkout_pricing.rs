use club_portal::catalog::Catalog;
use club_portal::domain::context::{build_context, total_minor, CheckoutContext, MAX_LINE_QUANTITY};
use club_portal::domain::error::ErrorKind;
use club_portal::domain::payment::{
    CheckoutRequest, EventCheckoutRequest, MembershipCheckoutRequest, OrderCheckoutRequest, OrderItemRequest,
};

const MEMBERSHIP_FEE: i64 = 4000;

fn membership(license_code: Option<&str>) -> CheckoutRequest {
    CheckoutRequest::Membership(MembershipCheckoutRequest {
        full_name: Some("  Ana   Ruiz ".to_string()),
        email: Some("Ana@Example.com".to_string()),
        document_id: Some("12.345.678-z".to_string()),
        birth_date_iso: Some("1990-04-12".to_string()),
        phone: None,
        license_code: license_code.map(str::to_string),
    })
}

fn order(items: Vec<(&str, i64)>) -> CheckoutRequest {
    CheckoutRequest::Order(OrderCheckoutRequest {
        customer_name: Some("Luis Gil".to_string()),
        customer_email: Some("luis@example.com".to_string()),
        items: items
            .into_iter()
            .map(|(sku, quantity)| OrderItemRequest {
                sku: Some(sku.to_string()),
                quantity: Some(quantity),
            })
            .collect(),
    })
}

#[test]
fn membership_without_license_costs_the_base_fee() {
    let catalog = Catalog::builtin().unwrap();
    let ctx = build_context(membership(None), &catalog).unwrap();
    let items = ctx.line_items(MEMBERSHIP_FEE);
    assert_eq!(items.len(), 1);
    assert_eq!(total_minor(&items), 4000);

    let CheckoutContext::Membership(app) = ctx else {
        panic!("expected membership context");
    };
    assert_eq!(app.full_name, "Ana Ruiz");
    assert_eq!(app.email, "ana@example.com");
    assert_eq!(app.document_id, "12345678Z");
}

#[test]
fn membership_adds_the_catalog_license_fee() {
    let catalog = Catalog::builtin().unwrap();
    let ctx = build_context(membership(Some("b")), &catalog).unwrap();
    let items = ctx.line_items(MEMBERSHIP_FEE);
    assert_eq!(items.len(), 2);
    assert_eq!(total_minor(&items), 4000 + 5400);
}

#[test]
fn unknown_license_is_a_validation_error() {
    let catalog = Catalog::builtin().unwrap();
    let err = build_context(membership(Some("Z")), &catalog).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn event_uses_the_catalog_fee() {
    let catalog = Catalog::builtin().unwrap();
    let req = CheckoutRequest::Event(EventCheckoutRequest {
        event_id: Some("curso-escalada-iniciacion".to_string()),
        full_name: Some("Marta Sanz".to_string()),
        email: Some("marta@example.com".to_string()),
        document_id: Some("X1234567L".to_string()),
    });
    let ctx = build_context(req, &catalog).unwrap();
    assert_eq!(total_minor(&ctx.line_items(MEMBERSHIP_FEE)), 9000);
    assert_eq!(ctx.customer_email(), "marta@example.com");
}

#[test]
fn unknown_event_is_a_validation_error() {
    let catalog = Catalog::builtin().unwrap();
    let req = CheckoutRequest::Event(EventCheckoutRequest {
        event_id: Some("no-such-event".to_string()),
        full_name: Some("Marta Sanz".to_string()),
        email: Some("marta@example.com".to_string()),
        document_id: Some("X1234567L".to_string()),
    });
    let err = build_context(req, &catalog).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationError);
}

#[test]
fn order_is_priced_from_the_catalog_and_merges_skus() {
    let catalog = Catalog::builtin().unwrap();
    let ctx = build_context(order(vec![("CAM-LOGO-M", 2), ("parche", 1), ("PARCHE", 2)]), &catalog).unwrap();
    let items = ctx.line_items(MEMBERSHIP_FEE);
    assert_eq!(items.len(), 2);
    assert_eq!(total_minor(&items), 2 * 1800 + 3 * 400);
    assert_eq!(ctx.document_id(), None);
}

#[test]
fn order_rejects_bad_lines() {
    let catalog = Catalog::builtin().unwrap();
    for items in [
        vec![],
        vec![("NOPE", 1)],
        vec![("PARCHE", 0)],
        vec![("PARCHE", -3)],
        vec![("PARCHE", MAX_LINE_QUANTITY + 1)],
        vec![("PARCHE", MAX_LINE_QUANTITY), ("PARCHE", 1)],
    ] {
        let err = build_context(order(items.clone()), &catalog).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError, "{items:?}");
    }
}

#[test]
fn missing_required_fields_are_rejected() {
    let catalog = Catalog::builtin().unwrap();
    let req = CheckoutRequest::Membership(MembershipCheckoutRequest {
        full_name: Some("Ana Ruiz".to_string()),
        email: Some("not-an-email".to_string()),
        document_id: Some("12345678Z".to_string()),
        ..Default::default()
    });
    assert_eq!(build_context(req, &catalog).unwrap_err().kind, ErrorKind::ValidationError);

    let req = CheckoutRequest::Membership(MembershipCheckoutRequest {
        full_name: Some("Ana Ruiz".to_string()),
        email: Some("ana@example.com".to_string()),
        ..Default::default()
    });
    assert_eq!(build_context(req, &catalog).unwrap_err().kind, ErrorKind::ValidationError);
}
