use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

use crate::pager::PageSource;
use crate::wizard::{DraftPatch, PhotoUpload, RegistrationDraft, RegistrationGateway};

use super::*;

async fn spawn_server(router: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn session() -> Session {
    Session::new("tok-1", Role::Admin)
}

fn sample_draft() -> RegistrationDraft {
    let mut draft = RegistrationDraft::default();
    draft.merge(DraftPatch {
        name: Some("Ana".to_string()),
        phone_number: Some("1234567890".to_string()),
        gender: Some(shared::domain::Gender::Male),
        country: Some("1".to_string()),
        state: Some("2".to_string()),
        skills: Some(vec!["rust".to_string(), "go".to_string()]),
        email: Some("ana@example.com".to_string()),
        password: Some("secret".to_string()),
        confirm_password: Some("secret".to_string()),
        photo: Some(PhotoUpload {
            filename: "avatar.png".to_string(),
            mime_type: Some("image/png".to_string()),
            bytes: vec![1, 2, 3],
        }),
    });
    draft
}

struct CaptureState<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for CaptureState<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

fn capture_state<T>() -> (CaptureState<T>, oneshot::Receiver<T>) {
    let (tx, rx) = oneshot::channel();
    (
        CaptureState {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        rx,
    )
}

impl<T> CaptureState<T> {
    async fn capture(&self, value: T) {
        if let Some(tx) = self.tx.lock().await.take() {
            let _ = tx.send(value);
        }
    }
}

#[tokio::test]
async fn login_returns_session_with_token_and_role() {
    let (state, rx) = capture_state::<LoginRequest>();
    let app = Router::new()
        .route(
            "/login",
            post(
                |State(state): State<CaptureState<LoginRequest>>,
                 Json(payload): Json<LoginRequest>| async move {
                    state.capture(payload).await;
                    Json(serde_json::json!({
                        "success": true,
                        "token": "tok-1",
                        "role": "Admin"
                    }))
                },
            ),
        )
        .with_state(state);
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let session = api.login("admin@example.com", "pw").await.expect("login");
    assert_eq!(session.token(), "tok-1");
    assert_eq!(session.role, Role::Admin);

    let request = rx.await.expect("captured request");
    assert_eq!(request.email, "admin@example.com");
    assert_eq!(request.password, "pw");
}

#[tokio::test]
async fn login_surfaces_server_message_and_flags_reauth() {
    let app = Router::new().route(
        "/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"message": "Invalid credentials"})),
            )
        }),
    );
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let err = api.login("a@b.c", "bad").await.expect_err("must fail");
    assert_eq!(err.to_string(), "Invalid credentials");
    assert!(err.requires_reauth());
}

#[tokio::test]
async fn login_with_success_false_is_rejected() {
    let app = Router::new().route(
        "/login",
        post(|| async {
            Json(serde_json::json!({
                "success": false,
                "message": "Account disabled"
            }))
        }),
    );
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let err = api.login("a@b.c", "pw").await.expect_err("must fail");
    assert_eq!(err.to_string(), "Account disabled");
}

#[tokio::test]
async fn user_list_sends_bearer_token_and_page_query() {
    let (state, rx) = capture_state::<(Option<String>, HashMap<String, String>)>();
    let app = Router::new()
        .route(
            "/user-list",
            get(
                |State(state): State<CaptureState<(Option<String>, HashMap<String, String>)>>,
                 headers: HeaderMap,
                 Query(query): Query<HashMap<String, String>>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string);
                    state.capture((auth, query)).await;
                    Json(serde_json::json!({
                        "data": [{
                            "id": 7,
                            "name": "Ana",
                            "email": "ana@example.com",
                            "phoneNumber": "1234567890",
                            "gender": "female"
                        }],
                        "lastPage": 4
                    }))
                },
            ),
        )
        .with_state(state);
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let page = api
        .list_users(&session(), PageQuery { page: 2, per_page: 10 })
        .await
        .expect("fetch");
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.last_page, 4);

    let (auth, query) = rx.await.expect("captured request");
    assert_eq!(auth.as_deref(), Some("Bearer tok-1"));
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
    assert_eq!(query.get("perPage").map(String::as_str), Some("10"));
}

#[tokio::test]
async fn malformed_list_payload_is_a_format_error_not_an_empty_page() {
    let app = Router::new().route(
        "/user-list",
        get(|| async { Json(serde_json::json!({"data": "nope"})) }),
    );
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let err = api
        .list_users(&session(), PageQuery { page: 1, per_page: 10 })
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiClientError::Format(_)), "got: {err:?}");
}

#[tokio::test]
async fn delete_user_posts_to_the_id_path() {
    let (state, rx) = capture_state::<i64>();
    let app = Router::new()
        .route(
            "/user-delete/:id",
            post(
                |State(state): State<CaptureState<i64>>, Path(id): Path<i64>| async move {
                    state.capture(id).await;
                    StatusCode::OK
                },
            ),
        )
        .with_state(state);
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    api.delete_user(&session(), UserId(42)).await.expect("delete");
    assert_eq!(rx.await.expect("captured id"), 42);
}

#[derive(Debug)]
struct MultipartCapture {
    fields: HashMap<String, String>,
    file_name: Option<String>,
    file_bytes: Vec<u8>,
}

async fn read_multipart(mut multipart: Multipart, file_field: &str) -> MultipartCapture {
    let mut capture = MultipartCapture {
        fields: HashMap::new(),
        file_name: None,
        file_bytes: Vec::new(),
    };
    while let Some(field) = multipart.next_field().await.expect("field") {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            capture.file_name = field.file_name().map(str::to_string);
            capture.file_bytes = field.bytes().await.expect("bytes").to_vec();
        } else {
            capture
                .fields
                .insert(name, field.text().await.expect("text"));
        }
    }
    capture
}

#[tokio::test]
async fn register_sends_the_expected_multipart_fields() {
    let (state, rx) = capture_state::<MultipartCapture>();
    let app = Router::new()
        .route(
            "/register",
            post(
                |State(state): State<CaptureState<MultipartCapture>>,
                 multipart: Multipart| async move {
                    state.capture(read_multipart(multipart, "photo").await).await;
                    StatusCode::CREATED
                },
            ),
        )
        .with_state(state);
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    api.register(&session(), &sample_draft())
        .await
        .expect("register");

    let capture = rx.await.expect("captured form");
    let field = |name: &str| capture.fields.get(name).map(String::as_str);
    assert_eq!(field("name"), Some("Ana"));
    assert_eq!(field("email"), Some("ana@example.com"));
    assert_eq!(field("password"), Some("secret"));
    assert_eq!(field("password_confirmation"), Some("secret"));
    assert_eq!(field("phoneNumber"), Some("1234567890"));
    assert_eq!(field("gender"), Some("male"));
    assert_eq!(field("countryId"), Some("1"));
    assert_eq!(field("stateId"), Some("2"));
    assert_eq!(field("skills"), Some("rust,go"));
    assert_eq!(capture.file_name.as_deref(), Some("avatar.png"));
    assert_eq!(capture.file_bytes, vec![1, 2, 3]);
}

#[tokio::test]
async fn register_rejects_an_invalid_draft_before_any_request() {
    // Port 9 is not listening; a request would fail loudly as a transport
    // error instead of the expected local validation error.
    let api = AdminApi::new("http://127.0.0.1:9").expect("api");

    let err = api
        .register(&session(), &RegistrationDraft::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiClientError::Validation(_)), "got: {err:?}");
}

#[tokio::test]
async fn register_joins_server_validation_messages() {
    let app = Router::new().route(
        "/register",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({
                    "message": ["The email has already been taken.", "The phoneNumber is invalid."]
                })),
            )
        }),
    );
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let err = api
        .register(&session(), &sample_draft())
        .await
        .expect_err("must fail");
    assert_eq!(
        err.to_string(),
        "The email has already been taken., The phoneNumber is invalid."
    );
}

#[tokio::test]
async fn add_product_sends_the_expected_multipart_fields() {
    let (state, rx) = capture_state::<MultipartCapture>();
    let app = Router::new()
        .route(
            "/add-product",
            post(
                |State(state): State<CaptureState<MultipartCapture>>,
                 multipart: Multipart| async move {
                    state.capture(read_multipart(multipart, "image").await).await;
                    StatusCode::CREATED
                },
            ),
        )
        .with_state(state);
    let api = AdminApi::new(&spawn_server(app).await).expect("api");

    let product = NewProduct {
        name: "Widget".to_string(),
        description: "A widget.".to_string(),
        price: "19.99".to_string(),
        image: PhotoUpload {
            filename: "widget.jpg".to_string(),
            mime_type: Some("image/jpeg".to_string()),
            bytes: vec![4, 5],
        },
    };
    api.add_product(&session(), &product).await.expect("add");

    let capture = rx.await.expect("captured form");
    assert_eq!(capture.fields.get("name").map(String::as_str), Some("Widget"));
    assert_eq!(
        capture.fields.get("description").map(String::as_str),
        Some("A widget.")
    );
    assert_eq!(capture.fields.get("price").map(String::as_str), Some("19.99"));
    assert_eq!(capture.file_name.as_deref(), Some("widget.jpg"));
    assert_eq!(capture.file_bytes, vec![4, 5]);
}

#[tokio::test]
async fn product_pager_end_to_end_resets_page_on_size_change() {
    let (state, rx) = capture_state::<HashMap<String, String>>();
    let app = Router::new()
        .route(
            "/product-list",
            get(
                |State(state): State<CaptureState<HashMap<String, String>>>,
                 Query(query): Query<HashMap<String, String>>| async move {
                    state.capture(query).await;
                    Json(serde_json::json!({
                        "data": [{
                            "id": 1,
                            "name": "Widget",
                            "description": "A widget.",
                            "price": 19.99,
                            "image": "/uploads/widget.jpg"
                        }],
                        "lastPage": 2
                    }))
                },
            ),
        )
        .with_state(state);
    let api = Arc::new(AdminApi::new(&spawn_server(app).await).expect("api"));

    let pager = pager::PagedListController::new(api.products(), session());
    let page = pager.set_page_size(25).await;

    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 25);
    assert_eq!(page.items[0].name, "Widget");

    let query = rx.await.expect("captured query");
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
    assert_eq!(query.get("perPage").map(String::as_str), Some("25"));
}

#[tokio::test]
async fn base_url_must_be_http_or_https() {
    assert!(AdminApi::new("ftp://example.com").is_err());
    assert!(AdminApi::new("not a url").is_err());
}

#[tokio::test]
async fn product_delete_is_unsupported() {
    let api = Arc::new(AdminApi::new("http://127.0.0.1:9").expect("api"));
    let err = api
        .products()
        .delete_row(&session(), 1)
        .await
        .expect_err("must fail");
    assert!(matches!(err, ApiClientError::DeleteUnsupported("product")));
}
