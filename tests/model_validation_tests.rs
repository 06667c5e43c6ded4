use district_portal::{
    AccessError,
    hierarchy::HierarchyLevel,
    models::{AdminLevel, ContentType, CreateUserRequest, ManagedNodeSet, UnknownAdminLevel},
};
use uuid::Uuid;

#[test]
fn test_admin_level_wire_format() {
    let json = serde_json::to_string(&AdminLevel::GeneralSecretariat).unwrap();
    assert_eq!(json, r#""GENERAL_SECRETARIAT""#);

    let parsed: AdminLevel = serde_json::from_str(r#""ADMIN_UNIT""#).unwrap();
    assert_eq!(parsed, AdminLevel::AdminUnit);

    // Stored text form round-trips through FromStr.
    assert_eq!("DISTRICT".parse::<AdminLevel>().unwrap(), AdminLevel::District);
    let err = "MAYOR".parse::<AdminLevel>().unwrap_err();
    assert_eq!(err, UnknownAdminLevel("MAYOR".to_string()));
    assert_eq!(err.to_string(), "unknown admin level MAYOR");
}

#[test]
fn test_hierarchy_level_path_format() {
    let parsed: HierarchyLevel = serde_json::from_str(r#""admin_unit""#).unwrap();
    assert_eq!(parsed, HierarchyLevel::AdminUnit);
    assert!(HierarchyLevel::Region < HierarchyLevel::District);
}

#[test]
fn test_content_type_accepts_url_segments() {
    for (segment, expected) in [
        ("bulletins", ContentType::Bulletin),
        ("survey", ContentType::Survey),
        ("voting-items", ContentType::Voting),
        ("voting_items", ContentType::Voting),
        ("reports", ContentType::Report),
    ] {
        assert_eq!(segment.parse::<ContentType>().unwrap(), expected);
    }

    let err = "announcements".parse::<ContentType>().unwrap_err();
    assert!(matches!(err, AccessError::UnsupportedEntityType(ref s) if s == "announcements"));
}

#[test]
fn test_create_user_request_admin_level_is_optional() {
    let request: CreateUserRequest =
        serde_json::from_str(r#"{"email":"a@b.test","display_name":"A"}"#).unwrap();
    assert_eq!(request.admin_level, None);

    let json = serde_json::to_string(&request).unwrap();
    assert!(!json.contains("admin_level"));
}

#[test]
fn test_managed_node_set_grants_are_deduplicated() {
    let node = Uuid::from_u128(7);
    let mut managed = ManagedNodeSet::default();
    assert!(managed.is_empty());

    managed.grant(HierarchyLevel::Locality, node);
    managed.grant(HierarchyLevel::Locality, node);

    assert_eq!(managed.managed_localities, vec![node]);
    assert_eq!(
        managed.iter().collect::<Vec<_>>(),
        vec![(HierarchyLevel::Locality, node)]
    );
}
