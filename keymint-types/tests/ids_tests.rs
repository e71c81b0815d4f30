use keymint_types::UserId;
use std::collections::HashSet;
use std::str::FromStr;

// ── Generation ───────────────────────────────────────────────────

#[test]
fn generated_ids_have_prefix_and_suffix() {
    let id = UserId::generate();
    assert!(id.as_str().starts_with("usr_"));
    assert_eq!(id.as_str().len(), 4 + 16);
}

#[test]
fn generated_ids_do_not_collide() {
    let ids: HashSet<UserId> = (0..1000).map(|_| UserId::generate()).collect();
    assert_eq!(ids.len(), 1000);
}

#[test]
fn generated_ids_parse_back() {
    let id = UserId::generate();
    assert_eq!(UserId::parse(id.as_str()).unwrap(), id);
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parse_accepts_short_ids() {
    let id = UserId::parse("u1").unwrap();
    assert_eq!(id.to_string(), "u1");
}

#[test]
fn parse_rejects_empty() {
    assert!(UserId::parse("").is_err());
}

#[test]
fn parse_rejects_path_characters() {
    assert!(UserId::parse("../etc").is_err());
    assert!(UserId::parse("a/b").is_err());
    assert!(UserId::parse("with space").is_err());
}

#[test]
fn parse_rejects_oversized() {
    let long = "a".repeat(65);
    assert!(UserId::parse(&long).is_err());
    assert!(UserId::parse(&long[..64]).is_ok());
}

#[test]
fn from_str_matches_parse() {
    assert_eq!(UserId::from_str("acme-01").unwrap(), UserId::parse("acme-01").unwrap());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_as_plain_string() {
    let id = UserId::parse("u1").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""u1""#);
}

#[test]
fn deserialize_validates() {
    assert!(serde_json::from_str::<UserId>(r#""ok_id""#).is_ok());
    assert!(serde_json::from_str::<UserId>(r#""""#).is_err());
    assert!(serde_json::from_str::<UserId>(r#""bad/id""#).is_err());
}
