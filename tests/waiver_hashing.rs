use club_portal::catalog::Catalog;
use club_portal::waiver::hashing::{canonicalize, fingerprint};
use club_portal::waiver::registry::resolve_waiver_or_fail;

#[test]
fn line_endings_do_not_change_the_fingerprint() {
    let unix = "Declaro que participo.\n\nEximo al Club.";
    let windows = "Declaro que participo.\r\n\r\nEximo al Club.\r\n";
    let old_mac = "  Declaro que participo.\r\rEximo al Club.\r";
    assert_eq!(fingerprint(&canonicalize(unix)), fingerprint(&canonicalize(windows)));
    assert_eq!(fingerprint(&canonicalize(unix)), fingerprint(&canonicalize(old_mac)));
}

#[test]
fn canonicalize_is_idempotent() {
    let raw = "\r\n  Texto\r\ncon\rsaltos  \n\n";
    let once = canonicalize(raw);
    assert_eq!(canonicalize(&once), once);
    assert_eq!(once, "Texto\ncon\nsaltos");
}

#[test]
fn fingerprint_is_lowercase_hex_sha256() {
    let hash = fingerprint("");
    assert_eq!(hash, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    let other = fingerprint("Texto distinto");
    assert_eq!(other.len(), 64);
    assert!(other.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn inner_whitespace_changes_are_material() {
    assert_ne!(
        fingerprint(&canonicalize("riesgo de caída")),
        fingerprint(&canonicalize("riesgo  de caída"))
    );
}

#[test]
fn builtin_waiver_with_crlf_hashes_like_its_lf_form() {
    let catalog = Catalog::builtin().unwrap();
    let waiver = resolve_waiver_or_fail(&catalog, "travesia-picos-2026", "1.0.0").unwrap();
    assert!(waiver.text.contains("\r\n"));
    let lf = waiver.text.replace("\r\n", "\n");
    assert_eq!(
        fingerprint(&canonicalize(&waiver.text)),
        fingerprint(&canonicalize(&lf))
    );
}
