//! Integration tests: admin panel rules, listing, forms and image upload.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use ums_core::models::user::{Role, User};
use ums_core::store::UserStore;
use uuid::Uuid;

use common::*;

struct Cast {
    root: User,
    admin_a: User,
    admin_b: User,
    user_c: User,
}

async fn cast(app: &TestApp) -> Cast {
    Cast {
        root: app
            .seed("Root", SUPER_ADMIN_EMAIL, "9000000000", Role::Admin)
            .await,
        admin_a: app
            .seed("Admin A", "a@example.com", "9000000001", Role::Admin)
            .await,
        admin_b: app
            .seed("Admin B", "b@example.com", "9000000002", Role::Admin)
            .await,
        user_c: app
            .seed("User C", "c@example.com", "9000000003", Role::User)
            .await,
    }
}

fn delete(uri: String, token: &str) -> axum::http::Request<axum::body::Body> {
    empty_request(Method::DELETE, &uri, Some(token))
}

#[tokio::test]
async fn non_admin_is_rejected() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let token = app.token_for(&cast.user_c);

    let resp = app
        .send(empty_request(Method::GET, "/admin/users", Some(&token)))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.message(), "Not authorized as admin");

    let anonymous = app
        .send(empty_request(Method::GET, "/admin/users", None))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_rules() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let b = app.token_for(&cast.admin_b);

    // Role change by a non-super admin.
    let promote = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.user_c.id),
            &[("role", "admin")],
            None,
            Some(&b),
        ))
        .await;
    assert_eq!(promote.status, StatusCode::FORBIDDEN);
    assert_eq!(
        promote.message(),
        "Access denied! Only the super admin can change user roles."
    );

    // Repeating the current role is ignored.
    let same_role = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.user_c.id),
            &[("role", "user"), ("name", "User Cee")],
            None,
            Some(&b),
        ))
        .await;
    assert_eq!(same_role.status, StatusCode::OK);
    assert_eq!(same_role.message(), "User information updated successfully");

    let self_delete = app
        .send(delete(format!("/admin/delete-user/{}", cast.admin_b.id), &b))
        .await;
    assert_eq!(self_delete.status, StatusCode::BAD_REQUEST);

    let root_delete = app
        .send(delete(format!("/admin/delete-user/{}", cast.root.id), &b))
        .await;
    assert_eq!(root_delete.status, StatusCode::FORBIDDEN);
    assert_eq!(
        root_delete.message(),
        "Access denied! You cannot delete the super admin."
    );

    let admin_delete = app
        .send(delete(format!("/admin/delete-user/{}", cast.admin_a.id), &b))
        .await;
    assert_eq!(admin_delete.status, StatusCode::FORBIDDEN);

    let admin_edit = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.admin_a.id),
            &[("name", "Renamed")],
            None,
            Some(&b),
        ))
        .await;
    assert_eq!(admin_edit.status, StatusCode::FORBIDDEN);

    let root_edit = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.root.id),
            &[("name", "Renamed")],
            None,
            Some(&b),
        ))
        .await;
    assert_eq!(root_edit.status, StatusCode::FORBIDDEN);

    let user_delete = app
        .send(delete(format!("/admin/delete-user/{}", cast.user_c.id), &b))
        .await;
    assert_eq!(user_delete.status, StatusCode::OK);
    assert_eq!(user_delete.message(), "User has been permanently deleted.");
    assert!(app.store.find_by_id(cast.user_c.id).await.unwrap().is_none());
}

#[tokio::test]
async fn super_admin_powers() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let root = app.token_for(&cast.root);

    let demote = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.admin_a.id),
            &[("role", "user"), ("isBlocked", "true")],
            None,
            Some(&root),
        ))
        .await;
    assert_eq!(demote.status, StatusCode::OK);
    let a = app.store.find_by_id(cast.admin_a.id).await.unwrap().unwrap();
    assert_eq!(a.role, Role::User);
    assert!(a.is_blocked);

    let delete_admin = app
        .send(delete(format!("/admin/delete-user/{}", cast.admin_b.id), &root))
        .await;
    assert_eq!(delete_admin.status, StatusCode::OK);

    let self_edit = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.root.id),
            &[("name", "Root Renamed")],
            None,
            Some(&root),
        ))
        .await;
    assert_eq!(self_edit.status, StatusCode::OK);

    let self_delete = app
        .send(delete(format!("/admin/delete-user/{}", cast.root.id), &root))
        .await;
    assert_eq!(self_delete.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_conflicts_and_missing_targets() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let root = app.token_for(&cast.root);

    let taken = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", cast.user_c.id),
            &[("email", "B@example.com")],
            None,
            Some(&root),
        ))
        .await;
    assert_eq!(taken.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        taken.message(),
        "Email already in use. Please use a different email."
    );

    let missing = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", Uuid::now_v7()),
            &[("name", "Ghost")],
            None,
            Some(&root),
        ))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.message(), "User data not found to update");

    let bad_id = app
        .send(delete("/admin/delete-user/not-a-uuid".into(), &root))
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn soft_delete_hides_but_reserves() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let root = app.token_for(&cast.root);

    let soft = app
        .send(delete(
            format!("/admin/soft-delete-user/{}", cast.user_c.id),
            &root,
        ))
        .await;
    assert_eq!(soft.status, StatusCode::OK);
    assert_eq!(soft.message(), "User has been marked as deleted.");

    let again = app
        .send(delete(
            format!("/admin/soft-delete-user/{}", cast.user_c.id),
            &root,
        ))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.message(), "User does not exist or already deleted.");

    let list = app
        .send(empty_request(Method::GET, "/admin/users", Some(&root)))
        .await;
    assert_eq!(list.body["total"], 3);

    let reregister = app
        .send(json_request(
            Method::POST,
            "/user/register",
            register_body("New C", "c@example.com", "9111111111"),
            None,
        ))
        .await;
    assert_eq!(reregister.status, StatusCode::BAD_REQUEST);

    let hard = app
        .send(delete(format!("/admin/delete-user/{}", cast.user_c.id), &root))
        .await;
    assert_eq!(hard.status, StatusCode::OK);
}

#[tokio::test]
async fn list_paginates_and_searches() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let root = app.token_for(&cast.root);
    for i in 0..12 {
        app.seed(
            &format!("Member {i:02}"),
            &format!("member{i}@example.com"),
            &format!("91000000{i:02}"),
            Role::User,
        )
        .await;
    }

    let first = app
        .send(empty_request(
            Method::GET,
            "/admin/users?page=1&limit=5",
            Some(&root),
        ))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["users"].as_array().unwrap().len(), 5);
    assert_eq!(first.body["total"], 16);
    assert_eq!(first.body["page"], 1);
    assert_eq!(first.body["totalPages"], 4);

    let search = app
        .send(empty_request(
            Method::GET,
            "/admin/users?search=MEMBER%200",
            Some(&root),
        ))
        .await;
    assert_eq!(search.body["total"], 10);
    assert_eq!(search.body["totalPages"], 1);

    let bad = app
        .send(empty_request(
            Method::GET,
            "/admin/users?page=abc",
            Some(&root),
        ))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_user_with_image() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let b = app.token_for(&cast.admin_b);
    let root = app.token_for(&cast.root);

    let png = [0x89u8, b'P', b'N', b'G', 0, 1, 2, 3];
    let created = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "Dev"),
                ("email", "dev@example.com"),
                ("mobile", "9222222222"),
            ],
            Some(FilePart {
                content_type: "image/png",
                bytes: &png,
            }),
            Some(&b),
        ))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.message(), "New user account created successfully.");
    let user = &created.body["newUserData"];
    assert_eq!(user["role"], "user");
    let pic = user["profilePic"].as_str().expect("profile pic url");
    assert!(pic.starts_with("http://localhost:5000/uploads/user-images/"));
    assert!(pic.ends_with(".png"));
    let stored = std::fs::read_dir(app.uploads.path().join("user-images"))
        .expect("image dir")
        .count();
    assert_eq!(stored, 1);

    // The new account logs in with the default password.
    let login = app
        .send(json_request(
            Method::POST,
            "/user/login",
            json!({ "email": "dev@example.com", "password": "HelloWorld@123" }),
            None,
        ))
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let admin_by_admin = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "Ops"),
                ("email", "ops@example.com"),
                ("mobile", "9333333333"),
                ("role", "admin"),
            ],
            None,
            Some(&b),
        ))
        .await;
    assert_eq!(admin_by_admin.status, StatusCode::FORBIDDEN);

    let admin_by_root = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "Ops"),
                ("email", "ops@example.com"),
                ("mobile", "9333333333"),
                ("role", "admin"),
            ],
            None,
            Some(&root),
        ))
        .await;
    assert_eq!(admin_by_root.status, StatusCode::CREATED);
    assert_eq!(admin_by_root.body["newUserData"]["role"], "admin");

    let text_file = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "Txt"),
                ("email", "txt@example.com"),
                ("mobile", "9444444444"),
            ],
            Some(FilePart {
                content_type: "text/plain",
                bytes: b"hello",
            }),
            Some(&root),
        ))
        .await;
    assert_eq!(text_file.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_and_uploads_are_served() {
    let app = TestApp::new();
    let cast = cast(&app).await;
    let token = app.token_for(&cast.user_c);

    let conflict = app
        .send(multipart_request(
            Method::PUT,
            "/user/profile",
            &[("email", "a@example.com")],
            None,
            Some(&token),
        ))
        .await;
    assert_eq!(conflict.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        conflict.message(),
        "Email already in use. Please use a different email or login."
    );

    let gif = b"GIF89a-test";
    let updated = app
        .send(multipart_request(
            Method::PUT,
            "/user/profile",
            &[
                ("name", "Cee"),
                ("email", "cee@example.com"),
                ("mobile", "9000000003"),
                ("role", "admin"),
            ],
            Some(FilePart {
                content_type: "image/gif",
                bytes: gif,
            }),
            Some(&token),
        ))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["email"], "cee@example.com");
    assert_eq!(updated.body["role"], "user");

    let profile = app
        .send(empty_request(Method::GET, "/user/profile", Some(&token)))
        .await;
    assert_eq!(profile.body["name"], "Cee");

    let url = updated.body["profilePic"].as_str().expect("pic");
    let path = url
        .strip_prefix("http://localhost:5000")
        .expect("local url")
        .to_string();
    let (status, bytes) = send_raw(&app.router, empty_request(Method::GET, &path, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, gif.to_vec());
}

#[tokio::test]
async fn register_block_and_role_escalation_scenario() {
    let app = TestApp::new();

    let root = app
        .send(json_request(
            Method::POST,
            "/user/register",
            register_body("Root", SUPER_ADMIN_EMAIL, "9000000000"),
            None,
        ))
        .await;
    assert_eq!(root.status, StatusCode::CREATED);
    let root_token = root.body["accessToken"].as_str().unwrap().to_string();

    let a = app
        .send(json_request(
            Method::POST,
            "/user/register",
            json!({
                "name": "A",
                "email": "a@x.com",
                "mobile": "9876543210",
                "password": "Aa1!aaaa",
            }),
            None,
        ))
        .await;
    assert_eq!(a.status, StatusCode::CREATED);
    assert!(a.body["accessToken"].is_string());
    let a_id = a.body["userData"]["_id"].as_str().unwrap().to_string();

    let login_a = |password: &'static str| {
        json_request(
            Method::POST,
            "/user/login",
            json!({ "email": "a@x.com", "password": password }),
            None,
        )
    };

    let wrong = app.send(login_a("Aa1!aaab")).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.message(), "Incorrect password!");

    let blocked = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{a_id}"),
            &[("isBlocked", "true")],
            None,
            Some(&root_token),
        ))
        .await;
    assert_eq!(blocked.status, StatusCode::OK);
    assert_eq!(app.send(login_a("Aa1!aaaa")).await.status, StatusCode::FORBIDDEN);

    let b = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "B"),
                ("email", "b@x.com"),
                ("mobile", "9123456780"),
                ("role", "admin"),
            ],
            None,
            Some(&root_token),
        ))
        .await;
    assert_eq!(b.status, StatusCode::CREATED);
    assert_eq!(b.body["newUserData"]["role"], "admin");

    let b_login = app
        .send(json_request(
            Method::POST,
            "/user/login",
            json!({ "email": "b@x.com", "password": "HelloWorld@123" }),
            None,
        ))
        .await;
    assert_eq!(b_login.status, StatusCode::OK);
    let b_token = b_login.body["accessToken"].as_str().unwrap().to_string();

    let escalate = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{a_id}"),
            &[("role", "admin")],
            None,
            Some(&b_token),
        ))
        .await;
    assert_eq!(escalate.status, StatusCode::FORBIDDEN);
    assert_eq!(
        escalate.message(),
        "Access denied! Only the super admin can change user roles."
    );

    let a_record = app
        .store
        .find_by_id(a_id.parse::<Uuid>().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(a_record.role, Role::User);
}

#[tokio::test]
async fn super_admin_address_cannot_be_claimed_before_registration() {
    let app = TestApp::new();
    let admin = app
        .seed("Admin A", "a@example.com", "9000000001", Role::Admin)
        .await;
    let user = app
        .seed("User C", "c@example.com", "9000000003", Role::User)
        .await;
    let admin_token = app.token_for(&admin);
    let user_token = app.token_for(&user);
    const RESERVED: &str = "Access denied! This email address is reserved.";

    let own_profile = app
        .send(multipart_request(
            Method::PUT,
            "/user/profile",
            &[("email", "ROOT@example.com")],
            None,
            Some(&user_token),
        ))
        .await;
    assert_eq!(own_profile.status, StatusCode::FORBIDDEN);
    assert_eq!(own_profile.message(), RESERVED);

    let admin_self = app
        .send(multipart_request(
            Method::PUT,
            &format!("/admin/update-user/{}", admin.id),
            &[("email", SUPER_ADMIN_EMAIL)],
            None,
            Some(&admin_token),
        ))
        .await;
    assert_eq!(admin_self.status, StatusCode::FORBIDDEN);
    assert_eq!(admin_self.message(), RESERVED);

    let created = app
        .send(multipart_request(
            Method::POST,
            "/admin/create-user",
            &[
                ("name", "Root"),
                ("email", SUPER_ADMIN_EMAIL),
                ("mobile", "9000000009"),
            ],
            None,
            Some(&admin_token),
        ))
        .await;
    assert_eq!(created.status, StatusCode::FORBIDDEN);
    assert_eq!(created.message(), RESERVED);

    assert!(app
        .store
        .find_by_email(SUPER_ADMIN_EMAIL)
        .await
        .unwrap()
        .is_none());
    let admin_after = app.store.find_by_id(admin.id).await.unwrap().unwrap();
    assert_eq!(admin_after.email, "a@example.com");

    // Registering with the address is still how the super-admin comes to be.
    let root = app
        .send(json_request(
            Method::POST,
            "/user/register",
            register_body("Root", SUPER_ADMIN_EMAIL, "9000000000"),
            None,
        ))
        .await;
    assert_eq!(root.status, StatusCode::CREATED);
    assert_eq!(root.body["userData"]["role"], "admin");
}
