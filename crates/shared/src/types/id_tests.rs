use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_distinct() {
    assert_ne!(ScenarioId::new(), ScenarioId::new());
}

#[test]
fn test_uuid_conversions() {
    let uuid = Uuid::new_v4();
    let id = CategoryId::from(uuid);
    assert_eq!(id.into_inner(), uuid);
    assert_eq!(Uuid::from(id), uuid);
}

#[test]
fn test_display_matches_uuid() {
    let uuid = Uuid::new_v4();
    assert_eq!(ClassId::from(uuid).to_string(), uuid.to_string());
}

#[test]
fn test_from_str() {
    let uuid = Uuid::new_v4();
    let id = ScenarioId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
    assert!(ScenarioId::from_str("not-a-uuid").is_err());
}

#[test]
fn test_serde_is_transparent() {
    let uuid = Uuid::new_v4();
    let json = serde_json::to_string(&CategoryGroupId::from(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));

    let parsed: CategoryGroupId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.into_inner(), uuid);
}
