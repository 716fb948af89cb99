use axum::body::Body;
use axum::http::{Request, StatusCode};
use backend::domain::{a001_user, a002_group, a003_point_of_sale, a005_contract};
use backend::routes::{build_router, AppState};
use backend::shared::config::ImportConfig;
use backend::shared::data::db::{get_connection, initialize_database};
use backend::system::auth::jwt;
use backend::usecases::u501_file_import::{ImportError, ImportExecutor, ProgressTracker};
use contracts::domain::a001_user::aggregate::UserRole;
use contracts::domain::a005_contract::status::ContractStatus;
use contracts::system::auth::{TokenClaims, PERM_IMPORTS_EXECUTE, PERM_IMPORTS_HISTORY};
use contracts::usecases::u501_file_import::{
    ColumnMappingRequest, ConfirmImportRequest, ImportOptions,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use std::sync::Arc;
use tower::ServiceExt;

fn claims(role: &str, perms: &[&str]) -> TokenClaims {
    TokenClaims {
        sub: format!("{}-id", role),
        username: role.to_string(),
        role: role.to_string(),
        perms: perms.iter().map(|p| p.to_string()).collect(),
        exp: 0,
        iat: 0,
    }
}

async fn seed_user(email: &str, active: bool) -> String {
    let user = a001_user::repository::insert(
        get_connection(),
        a001_user::repository::NewUser {
            name: "Seed".to_string(),
            surname: None,
            email: email.to_string(),
            role: UserRole::User,
            parent_user_id: None,
            password_hash: "x".to_string(),
            import_session_id: None,
        },
    )
    .await
    .unwrap();
    if !active {
        get_connection()
            .execute_unprepared(&format!(
                "UPDATE users SET is_active = 0 WHERE id = '{}'",
                user.id
            ))
            .await
            .unwrap();
    }
    user.id
}

async fn count(sql: &str) -> i64 {
    let row = get_connection()
        .query_one(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

/// upload -> mappings (suggested) -> confirm
async fn run_import(
    executor: &ImportExecutor,
    caller: &TokenClaims,
    file_name: &str,
    content: &str,
    template_id: Option<i32>,
    options: ImportOptions,
) -> (String, contracts::usecases::u501_file_import::ImportResultDto) {
    let preview = executor
        .upload(file_name, content.as_bytes(), template_id, caller)
        .await
        .unwrap();
    assert!(preview.is_template_match, "{:?}", preview.match_message);

    let status = executor
        .configure_mappings(
            &preview.upload_id,
            ColumnMappingRequest {
                mappings: preview.suggested_mappings.clone(),
                options,
            },
        )
        .await
        .unwrap();
    assert_eq!(status.status, "ready");

    let result = executor
        .confirm(&preview.upload_id, ConfirmImportRequest::default())
        .await
        .unwrap();
    (preview.upload_id, result)
}

#[tokio::test(flavor = "multi_thread")]
async fn import_workflow_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    jwt::configure_secret("test-secret");
    initialize_database(&dir.path().join("salesapp.db"))
        .await
        .unwrap();

    seed_user("seller@example.com", true).await;
    seed_user("inactive@example.com", false).await;
    let seed_group = a002_group::repository::insert(get_connection(), "Equipe Norte", None)
        .await
        .unwrap();

    let tracker = Arc::new(ProgressTracker::new());
    let executor = Arc::new(ImportExecutor::new(ImportConfig::default(), tracker.clone()));
    let superadmin = claims("superadmin", &[]);
    let admin = claims("admin", &[PERM_IMPORTS_EXECUTE]);

    // --- Contracts template: row failures, group auto-create, amounts ---
    let csv = "ContractNumber,UserEmail,TotalAmount,GroupId,Status\n\
               C-100,seller@example.com,150050,Equipe Norte,\n\
               C-101,seller@example.com,abc,,active\n\
               ,seller@example.com,10,,\n\
               C-102,inactive@example.com,10,,\n\
               C-103,seller@example.com,\"1.500,00\",Nova Equipe,NCONT 1 AT\n";

    let preview = executor
        .upload("contracts.csv", csv.as_bytes(), Some(2), &superadmin)
        .await
        .unwrap();
    assert_eq!(preview.total_rows, 5);
    assert_eq!(preview.template_name, "Contracts");
    assert_eq!(preview.suggested_mappings["UserEmail"], "UserEmail");

    let advisory = executor
        .configure_mappings(
            &preview.upload_id,
            ColumnMappingRequest {
                mappings: preview.suggested_mappings.clone(),
                options: ImportOptions {
                    allow_auto_create_groups: true,
                    ..Default::default()
                },
            },
        )
        .await
        .unwrap();
    assert_eq!(advisory.status, "ready");
    assert_eq!(advisory.failed_rows, 2);
    assert!(advisory
        .errors
        .contains(&"Row 2: Invalid total amount format: abc".to_string()));

    let contracts_upload = preview.upload_id.clone();
    let result = executor
        .confirm(&contracts_upload, ConfirmImportRequest::default())
        .await
        .unwrap();
    assert_eq!(result.status, "completed_with_errors");
    assert_eq!(result.processed_rows, 2);
    assert_eq!(result.failed_rows, 3);
    assert_eq!(result.created_contracts, 2);
    assert_eq!(result.created_groups, vec!["Nova Equipe".to_string()]);
    assert!(result
        .errors
        .contains(&"Row 2: Invalid total amount: abc".to_string()));
    assert!(result
        .errors
        .contains(&"Row 3: Missing required fields".to_string()));
    assert!(result
        .errors
        .contains(&"Row 4: User not found or inactive: inactive@example.com".to_string()));

    let c100 = a005_contract::repository::find_by_number("C-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c100.total_amount, 150050.0);
    assert_eq!(c100.status, ContractStatus::Active);
    assert_eq!(c100.group_id, Some(seed_group.id));
    let c103 = a005_contract::repository::find_by_number("C-103")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c103.total_amount, 1500.0);
    assert_eq!(c103.status, ContractStatus::Late1);

    let again = executor
        .confirm(&contracts_upload, ConfirmImportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(again, ImportError::BadRequest(ref m) if m == "Import session is not ready."));

    // --- Upsert by contract number keeps the original upload id ---
    let csv = "ContractNumber;UserEmail;TotalAmount;GroupId;Status\n\
               C-100;seller@example.com;5000;0;late1\n";
    let (_, result) = run_import(
        &executor,
        &superadmin,
        "update.csv",
        csv,
        Some(2),
        ImportOptions::default(),
    )
    .await;
    assert_eq!(result.status, "completed");
    assert_eq!(result.updated_contracts, 1);
    let c100 = a005_contract::repository::find_by_number("C-100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(c100.total_amount, 5000.0);
    assert_eq!(c100.status, ContractStatus::Late1);
    assert_eq!(c100.group_id, None);
    assert_eq!(c100.upload_id.as_deref(), Some(contracts_upload.as_str()));

    // --- contractDashboard: Cota split, PV handling, metadata ---
    let dashboard = "Cota,Valor,Dt Venda,CodPV,PV,Categoria\n\
                     \"12153;001;0;MARIA SILVA;X;D-1\",1500,2024-03-15,77,Loja Centro,Premium\n\
                     \"12153;002;0;JOAO SOUZA;X;D-2\",\"2.000,50\",2024-03-16,78,,Premium\n";

    let (dashboard_upload, result) = run_import(
        &executor,
        &admin,
        "dashboard.csv",
        dashboard,
        None,
        ImportOptions {
            allow_auto_create_groups: true,
            ..Default::default()
        },
    )
    .await;
    assert_eq!(result.status, "completed", "{:?}", result.errors);
    assert_eq!(result.created_contracts, 2);
    assert_eq!(result.created_groups, vec!["12153".to_string()]);
    assert!(result.created_pvs.is_empty());
    let d1 = a005_contract::repository::find_by_number("D-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d1.pv_id, None);
    assert_eq!(d1.quota.as_deref(), Some("001"));
    assert_eq!(d1.customer_name.as_deref(), Some("MARIA SILVA"));
    assert!(d1.category_id.is_some());

    let (_, result) = run_import(
        &executor,
        &admin,
        "dashboard.csv",
        dashboard,
        None,
        ImportOptions {
            allow_auto_create_groups: true,
            allow_auto_create_pvs: true,
            ..Default::default()
        },
    )
    .await;
    assert_eq!(result.updated_contracts, 2);
    assert_eq!(
        result.created_pvs,
        vec!["Loja Centro".to_string(), "PV 78".to_string()]
    );
    let pv = a003_point_of_sale::repository::get_by_id(get_connection(), 77)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pv.name, "Loja Centro");
    let d2 = a005_contract::repository::find_by_number("D-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(d2.total_amount, 2000.5);
    assert_eq!(d2.pv_id, Some(78));

    // non-superadmins cannot pick other templates
    let forbidden = executor
        .upload("x.csv", b"a,b\n1,2\n", Some(2), &admin)
        .await
        .unwrap_err();
    assert!(matches!(forbidden, ImportError::Forbidden(_)));

    // --- Users: matricula ownership, welcome emails ---
    let users = "Name,Email,Role,ParentEmail,Matricula,IsMatriculaOwner,SendEmail\n\
                 Ana,ana@example.com,admin,seller@example.com,M-1,true,SIM\n\
                 Bruno,bruno@example.com,,,M-1,yes,\n\
                 Caio,caio@example.com,,,M-1,no,no\n";
    let (users_upload, result) = run_import(
        &executor,
        &superadmin,
        "users.csv",
        users,
        Some(1),
        ImportOptions::default(),
    )
    .await;
    assert_eq!(result.created_users, 2);
    assert_eq!(
        result.errors,
        vec!["Row 2: Matricula M-1 already has an owner".to_string()]
    );
    assert_eq!(count("SELECT COUNT(*) AS n FROM sys_email_outbox").await, 1);
    let ana = a001_user::repository::find_active_by_email(get_connection(), "ANA@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ana.role, UserRole::Admin);
    assert!(ana.parent_user_id.is_some());

    // --- Undo ---
    let users_session = executor
        .status(&users_upload)
        .await
        .unwrap();
    assert_eq!(users_session.status, "completed_with_errors");
    let history = executor.history().await.unwrap();
    let users_session_id = history
        .iter()
        .find(|s| s.upload_id == users_upload)
        .unwrap()
        .id;

    let undone = executor.undo(&users_session_id.to_string()).await.unwrap();
    assert_eq!(undone.deleted_matriculas, 2);
    assert_eq!(undone.deactivated_users, 2);
    assert!(a001_user::repository::find_active_by_email(get_connection(), "ana@example.com")
        .await
        .unwrap()
        .is_none());
    let twice = executor.undo(&users_upload).await.unwrap_err();
    assert!(matches!(twice, ImportError::BadRequest(ref m) if m == "This import has already been undone"));

    let undone = executor.undo(&contracts_upload).await.unwrap();
    assert_eq!(undone.deleted_contracts, 2);
    assert_eq!(undone.deleted_groups, 1);
    assert!(a005_contract::repository::find_by_number("C-103")
        .await
        .unwrap()
        .is_none());
    assert!(a002_group::repository::find_active_by_name(get_connection(), "nova equipe")
        .await
        .unwrap()
        .is_none());

    // a session that was never confirmed
    let pending = executor
        .upload("pending.csv", b"ContractNumber,UserEmail,TotalAmount\nP-1,seller@example.com,1\n", Some(2), &superadmin)
        .await
        .unwrap();
    let not_done = executor.undo(&pending.upload_id).await.unwrap_err();
    assert!(matches!(not_done, ImportError::BadRequest(ref m) if m == "Only completed or failed imports can be undone"));
    let not_ready = executor
        .confirm(&pending.upload_id, ConfirmImportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(not_ready, ImportError::BadRequest(_)));

    executor
        .configure_mappings(
            &pending.upload_id,
            ColumnMappingRequest {
                mappings: pending.suggested_mappings.clone(),
                options: ImportOptions::default(),
            },
        )
        .await
        .unwrap();
    assert!(tracker.try_start(&pending.upload_id, 1));
    let busy = executor
        .confirm(&pending.upload_id, ConfirmImportRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(busy, ImportError::Conflict(_)));
    tracker.finish(&pending.upload_id);

    let missing = executor.undo("no-such-upload").await.unwrap_err();
    assert!(matches!(missing, ImportError::NotFound(_)));

    // --- Soft delete by upload ---
    let deactivated = executor.delete_by_upload(&dashboard_upload).await.unwrap();
    assert_eq!(deactivated.deactivated_contracts, 2);
    let d1 = a005_contract::repository::find_by_number("D-1")
        .await
        .unwrap()
        .unwrap();
    assert!(!d1.is_active);
    let none = executor.delete_by_upload("nothing-here").await.unwrap_err();
    assert!(matches!(none, ImportError::NotFound(ref m) if m == "No contracts found for this upload ID"));

    // --- HTTP surface ---
    let app = build_router(AppState {
        import: executor.clone(),
    });

    let token = jwt::generate_access_token("u-1", "viewer", "admin", vec![PERM_IMPORTS_HISTORY.to_string()])
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/imports/history")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert!(json["data"].as_array().unwrap().len() >= 3);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/imports/templates")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/imports/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
