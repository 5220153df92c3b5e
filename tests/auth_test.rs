//! Integration tests for registration and login.

mod common;

use common::TestLedger;
use ledgerdesk::auth;
use ledgerdesk::db::queries::users;
use ledgerdesk::error::AppError;
use ledgerdesk::models::NewUser;

fn new_user(email: &str, password: &str) -> NewUser {
    NewUser {
        name: "Ana".into(),
        email: email.into(),
        password: password.into(),
    }
}

#[test]
fn test_register_then_authenticate() {
    let db = TestLedger::new();
    let conn = db.conn();

    let id = auth::register_user(&conn, &new_user("ana@example.com", "testpass123")).unwrap();

    let user = auth::authenticate(&conn, "ana@example.com", "testpass123")
        .unwrap()
        .unwrap();
    assert_eq!(user.id, id);
    assert_ne!(user.password_hash, "testpass123");
    assert!(user.password_hash.starts_with("$argon2"));
}

#[test]
fn test_wrong_password_or_unknown_email() {
    let db = TestLedger::new();
    let conn = db.conn();
    auth::register_user(&conn, &new_user("ana@example.com", "testpass123")).unwrap();

    assert!(auth::authenticate(&conn, "ana@example.com", "wrongpass")
        .unwrap()
        .is_none());
    assert!(auth::authenticate(&conn, "bob@example.com", "testpass123")
        .unwrap()
        .is_none());
}

#[test]
fn test_email_is_case_insensitive() {
    let db = TestLedger::new();
    let conn = db.conn();
    auth::register_user(&conn, &new_user("Ana@Example.com", "testpass123")).unwrap();

    assert!(auth::authenticate(&conn, "ana@example.com", "testpass123")
        .unwrap()
        .is_some());
    let duplicate = auth::register_user(&conn, &new_user("ANA@EXAMPLE.COM", "otherpass"));
    assert!(matches!(duplicate, Err(AppError::Validation(_))));
}

#[test]
fn test_invalid_registration_is_rejected() {
    let db = TestLedger::new();
    let conn = db.conn();

    assert!(auth::register_user(&conn, &new_user("not-an-email", "testpass123")).is_err());
    assert!(auth::register_user(&conn, &new_user("ana@example.com", "123")).is_err());
    assert!(users::list_user_ids(&conn).unwrap().is_empty());
}

#[test]
fn test_list_and_delete_users() {
    let db = TestLedger::new();
    let alice = db.user("Alice");
    let bob = db.user("Bob");
    let conn = db.conn();

    assert_eq!(users::list_user_ids(&conn).unwrap(), vec![alice, bob]);
    assert!(users::delete_user(&conn, alice).unwrap());
    assert!(!users::delete_user(&conn, alice).unwrap());
    assert!(users::get_user(&conn, alice).unwrap().is_none());
    assert_eq!(users::list_user_ids(&conn).unwrap(), vec![bob]);
}
