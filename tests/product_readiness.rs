#[test]
fn config_defaults_are_usable() {
    let cfg = club_portal::config::AppConfig::from_env();
    assert!(!cfg.internal_api_key.is_empty());
    assert!(cfg.membership_fee_minor > 0);
    assert!(!cfg.public_base_url.ends_with('/'));
}

#[test]
fn builtin_catalog_loads() {
    let catalog = club_portal::catalog::Catalog::builtin().unwrap();
    assert!(!catalog.events.is_empty());
    assert!(catalog.events.iter().all(|e| !e.waivers.is_empty()));
}

#[test]
fn public_routes_are_documented_in_readme() {
    let readme = std::fs::read_to_string("README.md").unwrap_or_default();
    for route in [
        "/waiver-acceptances",
        "/waiver-acceptances/document",
        "/checkout-sessions",
        "/payments/verify",
        "/payments/cancel",
        "/payments/webhook",
        "/ops/readiness",
        "/ops/liveness",
        "/admin/payments",
    ] {
        assert!(readme.contains(route), "README is missing {route}");
    }
}
