use learnshare_gateway::models::{
    Camp, LoginRequest, LoginResponse, UploadReceipt, User, UserProfile, UserRole,
};
use learnshare_gateway::response::Envelope;
use serde_json::json;

#[test]
fn login_request_uses_camel_case_keys() {
    let request: LoginRequest =
        serde_json::from_value(json!({ "openid": "teacher_test", "userType": "teacher" })).unwrap();
    assert_eq!(request.openid, "teacher_test");
    assert_eq!(request.user_type, UserRole::Teacher);
}

#[test]
fn unknown_role_fails_deserialization() {
    let result = serde_json::from_value::<LoginRequest>(
        json!({ "openid": "x", "userType": "superuser" }),
    );
    assert!(result.is_err());
}

#[test]
fn roles_serialize_lowercase() {
    assert_eq!(serde_json::to_value(UserRole::Admin).unwrap(), "admin");
    assert_eq!(serde_json::to_value(UserRole::Teacher).unwrap(), "teacher");
    assert_eq!(serde_json::to_value(UserRole::Student).unwrap(), "student");
}

#[test]
fn user_profile_fills_missing_avatar() {
    let user = User {
        id: 5,
        openid: "someone".to_string(),
        nickname: "Someone".to_string(),
        user_type: UserRole::Student,
        avatar: None,
    };
    let profile = UserProfile::from(user);
    assert!(profile.avatar.starts_with("https://"));

    let value = serde_json::to_value(&profile).unwrap();
    assert_eq!(value["userType"], "student");
    assert!(value.get("user_type").is_none());
}

#[test]
fn login_response_is_flat() {
    let response = LoginResponse {
        success: true,
        token: "abc".to_string(),
        user: UserProfile {
            id: 1,
            nickname: "Administrator".to_string(),
            user_type: UserRole::Admin,
            avatar: "https://example.com/a.png".to_string(),
        },
    };
    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["token"], "abc");
    assert_eq!(value["user"]["userType"], "admin");
    // The login payload has no data/error envelope fields.
    assert!(value.get("data").is_none());
    assert!(value.get("error").is_none());
}

#[test]
fn envelope_omits_absent_fields() {
    let camps = vec![Camp {
        id: 1,
        name: "Python Starter Camp".to_string(),
        description: "Intro".to_string(),
    }];
    let value = serde_json::to_value(Envelope::ok(camps)).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"][0]["name"], "Python Starter Camp");
    assert!(value.get("error").is_none());
    assert!(value.get("message").is_none());
}

#[test]
fn upload_receipt_shape() {
    let receipt = UploadReceipt {
        url: "/uploads/file-1-000000001.pdf".to_string(),
        filename: "report.pdf".to_string(),
        size: 1234,
        mimetype: "application/pdf".to_string(),
    };
    let value = serde_json::to_value(&receipt).unwrap();
    assert_eq!(value["url"], "/uploads/file-1-000000001.pdf");
    assert_eq!(value["filename"], "report.pdf");
    assert_eq!(value["size"], 1234);
    assert_eq!(value["mimetype"], "application/pdf");
}
