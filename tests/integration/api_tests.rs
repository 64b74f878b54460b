//! API integration tests
//!
//! These tests run against a live server with a migrated database.
//! Run with: cargo test -- --ignored

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

static PATRON_SEQ: AtomicU32 = AtomicU32::new(0);

/// Create a patron with a unique national id and return its id
async fn create_patron(client: &Client) -> i64 {
    let seq = PATRON_SEQ.fetch_add(1, Ordering::SeqCst);
    let suffix = (std::process::id() % 100_000) * 100 + seq;
    let response = client
        .post(format!("{}/patrons", BASE_URL))
        .json(&json!({
            "first_name": "Juan",
            "last_name": "García López",
            "national_id": format!("{:08}A", suffix),
            "email": "juan@example.org",
            "patron_type": "Student"
        }))
        .send()
        .await
        .expect("Failed to create patron");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse patron");
    body["id"].as_i64().expect("No patron ID")
}

/// Create a book with one copy, returning (book_id, copy_id)
async fn create_book_with_copy(client: &Client) -> (i64, i64) {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": "Don Quijote de la Mancha",
            "author": "Miguel de Cervantes"
        }))
        .send()
        .await
        .expect("Failed to create book");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book");
    let book_id = body["id"].as_i64().expect("No book ID");

    let response = client
        .post(format!("{}/books/{}/copies", BASE_URL, book_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to create copy");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse copy");
    let copy_id = body["id"].as_i64().expect("No copy ID");

    (book_id, copy_id)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_list_books() {
    let client = Client::new();

    let response = client
        .get(format!("{}/books", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());
}

#[tokio::test]
#[ignore]
async fn test_create_patron_validation() {
    let client = Client::new();

    // Malformed national id must be rejected up front
    let response = client
        .post(format!("{}/patrons", BASE_URL))
        .json(&json!({
            "first_name": "Ana",
            "last_name": "Martínez Ruiz",
            "national_id": "not-a-dni"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_loan_roundtrip_on_time() {
    let client = Client::new();

    let patron_id = create_patron(&client).await;
    let (_, copy_id) = create_book_with_copy(&client).await;

    // Borrow
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to create loan");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["id"].as_i64().expect("No loan ID");

    // The copy is no longer borrowable
    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // Return on time
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to return loan");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse return");
    assert_eq!(body["status"], "returned");
    assert_eq!(body["fine_issued"], false);

    // No fines were created
    let response = client
        .get(format!("{}/patrons/{}/fines", BASE_URL, patron_id))
        .send()
        .await
        .expect("Failed to list fines");
    let fines: Value = response.json().await.expect("Failed to parse fines");
    assert_eq!(fines.as_array().map(|a| a.len()), Some(0));

    // A second return is rejected
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_late_return_creates_fine() {
    let client = Client::new();

    let patron_id = create_patron(&client).await;
    let (_, copy_id) = create_book_with_copy(&client).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["id"].as_i64().expect("No loan ID");

    // Return 20 days from now, well past the 15-day period
    let returned_at = Utc::now() + Duration::days(20);
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .json(&json!({ "returned_at": returned_at.to_rfc3339() }))
        .send()
        .await
        .expect("Failed to return loan");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse return");
    assert_eq!(body["fine_issued"], true);

    // Exactly one open fine; a further loan is blocked until it is settled
    let response = client
        .get(format!("{}/patrons/{}/fines", BASE_URL, patron_id))
        .send()
        .await
        .expect("Failed to list fines");
    let fines: Value = response.json().await.expect("Failed to parse fines");
    let fines = fines.as_array().expect("Fines not an array");
    assert_eq!(fines.len(), 1);
    let fine_id = fines[0]["id"].as_i64().expect("No fine ID");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    // Settle and borrow again
    let response = client
        .post(format!("{}/fines/{}/settle", BASE_URL, fine_id))
        .send()
        .await
        .expect("Failed to settle fine");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_renewal_limit() {
    let client = Client::new();

    let patron_id = create_patron(&client).await;
    let (_, copy_id) = create_book_with_copy(&client).await;

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "patron_id": patron_id, "copy_ids": [copy_id] }))
        .send()
        .await
        .expect("Failed to create loan");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse loan");
    let loan_id = body["id"].as_i64().expect("No loan ID");
    let mut last_due: DateTime<Utc> = body["due_date"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("No due date");

    // Two renewals succeed, each pushing the due date out by 15 days
    for expected_renewals in 1..=2 {
        let response = client
            .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
            .send()
            .await
            .expect("Failed to renew loan");
        assert!(response.status().is_success());
        let body: Value = response.json().await.expect("Failed to parse renewal");
        assert_eq!(body["nb_renewals"].as_i64(), Some(expected_renewals));
        let due: DateTime<Utc> = body["due_date"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .expect("No due date");
        assert_eq!(due - last_due, Duration::days(15));
        last_due = due;
    }

    // The third is refused
    let response = client
        .post(format!("{}/loans/{}/renew", BASE_URL, loan_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_unknown_loan_returns_404() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans/999999/renew", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    let response = client
        .post(format!("{}/loans/999999/return", BASE_URL))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);
}
