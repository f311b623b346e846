use show_portal::models::{Review, Role, TokenPair, UpdateSeriesRequest};
use uuid::Uuid;

// --- Tests ---

#[test]
fn test_role_serializes_as_its_claim_string() {
    // The role travels inside JWT claims as a bare string; both serde and the
    // Display/FromStr pair must agree on the spelling.
    for (role, text) in [
        (Role::User, "User"),
        (Role::Poster, "Poster"),
        (Role::Admin, "Admin"),
    ] {
        assert_eq!(serde_json::to_string(&role).unwrap(), format!("\"{text}\""));
        assert_eq!(role.to_string(), text);
        assert_eq!(text.parse::<Role>().unwrap(), role);
    }

    assert!("student".parse::<Role>().is_err());
}

#[test]
fn test_role_round_trips_through_json() {
    for role in [Role::User, Role::Poster, Role::Admin] {
        let json = serde_json::to_string(&role).unwrap();
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, role);
    }
}

#[test]
fn test_partial_update_skips_absent_fields() {
    // Partial updates must not serialize `None` fields, so the wire payload only
    // names what actually changes.
    let update = UpdateSeriesRequest {
        name: None,
        description: Some("Re-cut".to_string()),
    };

    let json = serde_json::to_value(&update).unwrap();
    assert!(json.get("name").is_none());
    assert_eq!(json["description"], "Re-cut");
}

#[test]
fn test_review_reviewer_is_nullable_on_the_wire() {
    // A frozen review (reviewer deleted) serializes with an explicit null, and a
    // null on input deserializes back to None.
    let review = Review {
        id: Uuid::from_u128(9),
        reviewer_id: None,
        ..Review::default()
    };

    let json = serde_json::to_value(&review).unwrap();
    assert!(json["reviewer_id"].is_null());

    let back: Review = serde_json::from_value(json).unwrap();
    assert!(back.reviewer_id.is_none());
}

#[test]
fn test_token_pair_wire_shape() {
    let pair = TokenPair {
        access_token: "signed".to_string(),
        refresh_token: "opaque".to_string(),
    };

    let json = serde_json::to_value(&pair).unwrap();
    assert_eq!(json["access_token"], "signed");
    assert_eq!(json["refresh_token"], "opaque");
}
