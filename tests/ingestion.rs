//! Integration tests for spreadsheet ingestion
//!
//! Exercises the upload endpoints end to end:
//! - Diff-based reconciliation (delete removed, insert added, keep unchanged)
//! - Idempotent re-upload
//! - Transactional rollback on bad references and bad input

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use progdata::store::Record;
use progdata::{AppState, Server, ServerConfig};

const ALT_SUB_HEADER: &str = "Plnt,Model,Type Code,Primary Material,Replacement Part,\
Next Higher Assembly,Alternate or Substitute Code,Sub Code,WBS Element,RevLev,\
Reason For Change,Item Text Line 1,Created by,Created";

const ROW_A: &str = "2010,AP-1,ZALT,MAT-1,MAT-2,NHA-1,A,1,WBS-100,B,initial,line,jsmith,03/15/2024";
const ROW_B: &str = "2010,AP-1,ZALT,MAT-2,MAT-3,NHA-2,S,2,WBS-200,C,initial,line,jsmith,03/16/2024";
const ROW_C: &str = "2010,AP-1,ZALT,MAT-3,MAT-1,NHA-3,A,3,WBS-300,D,revision,line,jsmith,03/17/2024";

fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

async fn seeded_app() -> (AppState, Router) {
    let state = AppState::new().expect("registry must validate");

    state
        .store
        .insert("sectors", record(&[("name", json!("Space"))]))
        .await
        .unwrap();
    state
        .store
        .insert(
            "programs",
            record(&[("name", json!("Apollo")), ("model_code", json!("AP-1"))]),
        )
        .await
        .unwrap();
    for name in ["MAT-1", "MAT-2", "MAT-3"] {
        state
            .store
            .insert("material_masters", record(&[("name", json!(name))]))
            .await
            .unwrap();
    }

    let router = Server::with_state(ServerConfig::default(), state.clone()).build_router();
    (state, router)
}

fn csv_of(rows: &[&str]) -> String {
    let mut out = String::from(ALT_SUB_HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.push('\n');
    out
}

const BOUNDARY: &str = "ingest-test-boundary";

fn multipart_body(sector: &str, csv: &str) -> Body {
    let body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"sector\"\r\n\r\n\
         {sector}\r\n\
         --{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"data_file\"; filename=\"report.csv\"\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    );
    Body::from(body)
}

async fn upload(router: &Router, uri: &str, sector: &str, csv: &str, user: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(user) = user {
        builder = builder.header("x-progdata-user", user);
    }
    let response = router
        .clone()
        .oneshot(builder.body(multipart_body(sector, csv)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn list(router: &Router, uri: &str) -> Vec<Value> {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice::<Value>(&bytes)
        .unwrap()
        .as_array()
        .cloned()
        .unwrap()
}

#[tokio::test]
async fn test_initial_upload_creates_items() {
    let (_, router) = seeded_app().await;
    let (status, body) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &csv_of(&[ROW_A, ROW_B]),
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sector_id"], json!(1));
    assert_eq!(body["data_file"], json!("report.csv"));
    assert_eq!(body["uploaded_by"], json!("jsmith"));
    assert!(body["created"].is_string());

    let items = list(&router, "/api/v1/alt_subs").await;
    assert_eq!(items.len(), 2);
    // Default ordering is by primary material.
    assert_eq!(items[0]["primary_material"], json!("MAT-1"));
    assert_eq!(items[1]["primary_material"], json!("MAT-2"));
    // The detail shape resolves the model reference to a program summary.
    assert_eq!(items[0]["model"]["model_code"], json!("AP-1"));
}

#[tokio::test]
async fn test_reupload_diffs_against_existing_items() {
    let (_, router) = seeded_app().await;
    upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &csv_of(&[ROW_A, ROW_B]),
        Some("jsmith"),
    )
    .await;
    let kept_id = list(&router, "/api/v1/alt_subs").await[0]["id"].clone();

    // Second file drops row B and adds row C.
    let (status, _) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &csv_of(&[ROW_A, ROW_C]),
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let items = list(&router, "/api/v1/alt_subs").await;
    assert_eq!(items.len(), 2);
    let primaries: Vec<&Value> = items.iter().map(|i| &i["primary_material"]).collect();
    assert_eq!(primaries, [&json!("MAT-1"), &json!("MAT-3")]);
    // The unchanged row survives the diff with its identity intact.
    assert_eq!(items[0]["id"], kept_id);
}

#[tokio::test]
async fn test_reupload_of_identical_file_changes_nothing() {
    let (_, router) = seeded_app().await;
    let csv = csv_of(&[ROW_A, ROW_B]);
    upload(&router, "/api/v1/alt_sub_uploads", "1", &csv, Some("jsmith")).await;
    let before = list(&router, "/api/v1/alt_subs").await;

    let (status, _) =
        upload(&router, "/api/v1/alt_sub_uploads", "1", &csv, Some("jsmith")).await;
    assert_eq!(status, StatusCode::CREATED);

    let after = list(&router, "/api/v1/alt_subs").await;
    assert_eq!(before, after);
    // Both uploads were recorded even though the item set did not move.
    assert_eq!(list(&router, "/api/v1/alt_sub_uploads").await.len(), 2);
}

#[tokio::test]
async fn test_unknown_model_rolls_back_the_whole_upload() {
    let (_, router) = seeded_app().await;
    let bad_row =
        "2010,NO-SUCH,ZALT,MAT-1,MAT-2,NHA-1,A,1,WBS-100,B,initial,line,jsmith,03/15/2024";
    let (status, body) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &csv_of(&[ROW_A, bad_row]),
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("REFERENTIAL_INTEGRITY"));
    assert!(body["error"].as_str().unwrap().contains("NO-SUCH"));

    // Neither the good row nor the upload record was persisted.
    assert!(list(&router, "/api/v1/alt_subs").await.is_empty());
    assert!(list(&router, "/api/v1/alt_sub_uploads").await.is_empty());
}

#[tokio::test]
async fn test_unparseable_file_is_rejected_without_side_effects() {
    let (_, router) = seeded_app().await;
    let garbage = format!("{ALT_SUB_HEADER}\n\"unterminated");
    let (status, body) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &garbage,
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INGESTION_INPUT"));
    assert!(list(&router, "/api/v1/alt_sub_uploads").await.is_empty());
}

#[tokio::test]
async fn test_upload_without_principal_is_rejected() {
    let (_, router) = seeded_app().await;
    let (status, body) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "1",
        &csv_of(&[ROW_A]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("uploaded_by"));
    assert!(list(&router, "/api/v1/alt_subs").await.is_empty());
}

#[tokio::test]
async fn test_unknown_sector_is_a_referential_error() {
    let (_, router) = seeded_app().await;
    let (status, body) = upload(
        &router,
        "/api/v1/alt_sub_uploads",
        "99",
        &csv_of(&[ROW_A]),
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("REFERENTIAL_INTEGRITY"));
}

#[tokio::test]
async fn test_material_master_then_inventory_pipeline() {
    let (_, router) = seeded_app().await;

    let mm_csv = "Material,Material Description,Plnt,Matl Type,Base Unit of Measure,\
Procurement Type,Goods Receipt Time,Planned Delivery Time,Storage Condition,\
Base Drawing,Electrical Flag\n\
MAT-9,widget assembly,2010,MAKE,EA,F,2,30,AMB,DWG-9,N\n";
    let (status, _) = upload(
        &router,
        "/api/v1/material_master_uploads",
        "1",
        mm_csv,
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let materials = list(&router, "/api/v1/material_masters?name=MAT-9").await;
    assert_eq!(materials.len(), 1);

    let inv_csv = "Material,Plnt,Storage Location,Matl Type,WBS Element,Batch,\
Lot Date Code,Base Unit of Measure,Unrestricted,QM Lot,Restricted,Blocked,\
SLED,Discard Date,On Hand\n\
MAT-9,2010,0001,MAKE,WBS-100,B001,2024A,EA,5,0,0,0,12/31/2026,,5\n";
    let (status, _) = upload(
        &router,
        "/api/v1/inventory_uploads",
        "1",
        inv_csv,
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let items = list(&router, "/api/v1/inventory_items").await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["material_master"], json!("MAT-9"));
    assert_eq!(items[0]["on_hand_inventory"].as_f64(), Some(5.0));
}

#[tokio::test]
async fn test_inventory_for_unknown_material_is_rejected() {
    let (_, router) = seeded_app().await;
    let inv_csv = "Material,Plnt,Storage Location,Matl Type,WBS Element,Batch,\
Lot Date Code,Base Unit of Measure,Unrestricted,QM Lot,Restricted,Blocked,\
SLED,Discard Date,On Hand\n\
GHOST-1,2010,0001,MAKE,WBS-100,B001,2024A,EA,1,0,0,0,,,1\n";
    let (status, body) = upload(
        &router,
        "/api/v1/inventory_uploads",
        "1",
        inv_csv,
        Some("jsmith"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("GHOST-1"));
    assert!(list(&router, "/api/v1/inventory_items").await.is_empty());
}
