//! Invoice lifecycle integration tests: preview, create, download and the
//! failure paths around artifact storage and number collisions.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use aargon_invoicing::models::{BillingMonth, CreateAssignment, CreateInvoiceRequest};
use common::{date, FailingArtifactStore, ScriptedNumbers, TestApp};
use uuid::Uuid;

fn month(s: &str) -> BillingMonth {
    s.parse().unwrap()
}

async fn seed_assignment(app: &TestApp, client_id: Uuid, rate: &str, start: (i32, u32, u32)) {
    use aargon_invoicing::services::AssignmentRepository;
    app.store
        .create_assignment(&CreateAssignment {
            client_id,
            service_id: Uuid::new_v4(),
            service_name: "Dedicated Internet".into(),
            description: None,
            link_capacity: Some("100 Mbps".into()),
            rate: Some(rate.parse().unwrap()),
            billing_start_date: date(start.0, start.1, start.2),
            service_stop_date: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn preview_computes_proration_and_persists_nothing() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 4, 16)).await;

    let previews = app
        .service
        .preview(client.client_id, &[month("2025-04")])
        .await
        .unwrap();

    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].line_items.len(), 1);
    assert_eq!(previews[0].line_items[0].prorated_days, 15);
    assert_eq!(previews[0].month_total, "1500.00".parse().unwrap());

    // Previewing twice creates no invoices and no artifacts.
    app.service
        .preview(client.client_id, &[month("2025-04")])
        .await
        .unwrap();
    assert!(app.service.list().await.unwrap().is_empty());
    let entries: Vec<_> = std::fs::read_dir(app.artifact_dir.path())
        .unwrap()
        .collect();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn preview_of_empty_month_set_is_empty() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();

    let previews = app.service.preview(client.client_id, &[]).await.unwrap();
    assert!(previews.is_empty());
}

#[tokio::test]
async fn preview_for_unknown_client_is_not_found() {
    let app = TestApp::spawn().await;
    let err = app
        .service
        .preview(Uuid::new_v4(), &[month("2025-04")])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn create_then_download_round_trips_the_document() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let invoice = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![month("2025-01"), month("2025-02")],
        })
        .await
        .unwrap();

    assert!(invoice.invoice_number.starts_with("INV-"));
    assert_eq!(invoice.months_label, "January 2025, February 2025");

    let (fetched, bytes) = app.service.download(invoice.invoice_id).await.unwrap();
    assert_eq!(fetched.invoice_number, invoice.invoice_number);
    assert!(bytes.starts_with(b"%PDF"));

    let on_disk = std::fs::read(&invoice.artifact_path).unwrap();
    assert_eq!(bytes, on_disk);
}

#[tokio::test]
async fn create_with_empty_months_is_rejected() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();

    let err = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
    assert!(app.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_artifact_write_leaves_no_invoice_row() {
    let app = TestApp::spawn_with(None, Some(Arc::new(FailingArtifactStore))).await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let err = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![month("2025-01")],
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage_failure");
    assert!(app.service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn number_collision_retries_with_a_fresh_number() {
    // The second create is scripted to propose the first one's number before
    // falling back to a distinct candidate.
    let numbers = Arc::new(ScriptedNumbers::new(vec![
        "INV-20250201-AAAAAAAA",
        "INV-20250201-AAAAAAAA",
        "INV-20250201-BBBBBBBB",
    ]));
    let app = TestApp::spawn_with(Some(numbers), None).await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let request = CreateInvoiceRequest {
        client_id: client.client_id,
        months: vec![month("2025-01")],
    };
    let first = app.service.create(&request).await.unwrap();
    let second = app.service.create(&request).await.unwrap();

    assert_eq!(first.invoice_number, "INV-20250201-AAAAAAAA");
    assert_eq!(second.invoice_number, "INV-20250201-BBBBBBBB");
    assert_eq!(app.service.list().await.unwrap().len(), 2);

    // The losing attempt must not have touched the first invoice's document:
    // both invoices stay downloadable and no stray files are left behind.
    let (_, first_bytes) = app.service.download(first.invoice_id).await.unwrap();
    let (_, second_bytes) = app.service.download(second.invoice_id).await.unwrap();
    assert!(first_bytes.starts_with(b"%PDF"));
    assert!(second_bytes.starts_with(b"%PDF"));

    let mut files: Vec<String> = std::fs::read_dir(app.artifact_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(
        files,
        vec!["INV-20250201-AAAAAAAA.pdf", "INV-20250201-BBBBBBBB.pdf"]
    );
}

#[tokio::test]
async fn row_collision_cleans_up_its_own_artifact_and_retries() {
    // A row already holds the first candidate number but no document exists
    // under that name, so the collision surfaces at the insert rather than
    // the artifact write.
    use aargon_invoicing::models::NewInvoice;
    use aargon_invoicing::services::InvoiceRepository;

    let numbers = Arc::new(ScriptedNumbers::new(vec![
        "INV-20250201-CCCCCCCC",
        "INV-20250201-DDDDDDDD",
    ]));
    let app = TestApp::spawn_with(Some(numbers), None).await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    app.store
        .insert_invoice(&NewInvoice {
            invoice_number: "INV-20250201-CCCCCCCC".into(),
            client_id: client.client_id,
            months_label: "January 2025".into(),
            created_date: date(2025, 2, 1),
            artifact_path: "unused".into(),
        })
        .await
        .unwrap();

    let invoice = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![month("2025-01")],
        })
        .await
        .unwrap();

    assert_eq!(invoice.invoice_number, "INV-20250201-DDDDDDDD");

    // The colliding attempt's artifact was cleaned up.
    let files: Vec<String> = std::fs::read_dir(app.artifact_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, vec!["INV-20250201-DDDDDDDD.pdf"]);
}

#[tokio::test]
async fn concurrent_creates_yield_distinct_invoice_numbers() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = app.service.clone();
        let client_id = client.client_id;
        handles.push(tokio::spawn(async move {
            service
                .create(&CreateInvoiceRequest {
                    client_id,
                    months: vec!["2025-01".parse().unwrap()],
                })
                .await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let invoice = handle.await.unwrap().unwrap();
        numbers.insert(invoice.invoice_number);
    }
    assert_eq!(numbers.len(), 50);
    assert_eq!(app.service.list().await.unwrap().len(), 50);
}

#[tokio::test]
async fn download_reports_missing_artifact_distinctly() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let invoice = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![month("2025-01")],
        })
        .await
        .unwrap();

    // Simulate artifact loss behind the metadata's back.
    std::fs::remove_file(&invoice.artifact_path).unwrap();

    let err = app.service.download(invoice.invoice_id).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert!(err.to_string().contains("missing from storage"));

    // The metadata row itself is still there.
    assert!(app.service.get(invoice.invoice_id).await.is_ok());
}

#[tokio::test]
async fn download_of_unknown_invoice_is_not_found() {
    let app = TestApp::spawn().await;
    let err = app.service.download(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), "not_found");
    assert!(!err.to_string().contains("missing from storage"));
}

#[tokio::test]
async fn duplicate_months_in_request_are_collapsed() {
    let app = TestApp::spawn().await;
    let client = app.seed_client();
    seed_assignment(&app, client.client_id, "3000.00", (2025, 1, 1)).await;

    let invoice = app
        .service
        .create(&CreateInvoiceRequest {
            client_id: client.client_id,
            months: vec![month("2025-02"), month("2025-01"), month("2025-01")],
        })
        .await
        .unwrap();
    assert_eq!(invoice.months_label, "January 2025, February 2025");
}
