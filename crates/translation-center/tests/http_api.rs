use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use tower::ServiceExt;
use translation_center::{
    Catalog,
    config::SeedSection,
    web::http::{self, HttpState},
};

fn test_runtime() -> Runtime {
    Runtime::new().expect("create tokio runtime")
}

fn make_router(token: Option<&str>) -> Router {
    let seed = SeedSection { tag_count: 2, translation_count: 6, batch_size: 4 };
    let state =
        HttpState::new(Catalog::in_memory(), seed, http::HttpAuth::new(token.map(String::from)));
    http::build_router(state)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", "Bearer secret");
    let body = match body {
        Some(payload) => {
            builder = builder.header("content-type", "application/json");
            Body::from(payload.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[test]
fn http_api_tag_and_translation_lifecycle() {
    test_runtime().block_on(async {
        let router = make_router(Some("secret"));

        let (status, tags) = call(
            &router,
            Method::POST,
            "/api/tags",
            Some(json!([{ "name": "en-team" }, { "name": "ui" }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tags.as_array().unwrap().len(), 2);
        let ui_id = tags[1]["id"].as_str().unwrap().to_string();
        assert_eq!(tags[1]["name"], "ui");

        let (status, created) = call(
            &router,
            Method::POST,
            "/api/translations",
            Some(json!([{
                "key": "login.title",
                "locale": "en",
                "value": "Login",
                "tagIds": [ui_id],
            }])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created[0]["tags"], json!(["ui"]));
        let translation_id = created[0]["id"].as_str().unwrap().to_string();
        assert!(created[0]["createdAt"].is_string());

        let (status, page) = call(
            &router,
            Method::POST,
            "/api/translations/search",
            Some(json!({ "locales": ["en"], "tags": ["ui"], "page": 0, "size": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalElements"], 1);
        assert_eq!(page["hasMore"], false);
        assert_eq!(page["content"][0]["key"], "login.title");
        assert_eq!(page["content"][0]["tags"], json!(["ui"]));

        let uri = format!("/api/translations/{translation_id}");
        let (status, updated) = call(
            &router,
            Method::PUT,
            &uri,
            Some(json!({ "key": "login.title", "locale": "en", "value": "Sign in", "tagIds": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["value"], "Sign in");
        assert_eq!(updated["tags"], json!([]));

        let (status, fetched) = call(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["tags"], json!([]));

        let (status, _) = call(&router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&router, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("translation"));
    });
}

#[test]
fn http_api_tag_delete_and_rename() {
    test_runtime().block_on(async {
        let router = make_router(Some("secret"));
        let (_, tags) = call(
            &router,
            Method::POST,
            "/api/tags",
            Some(json!([{ "name": "ui" }, { "name": "web" }])),
        )
        .await;
        let ui = tags[0]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/tags/{ui}");

        let (status, renamed) =
            call(&router, Method::PUT, &uri, Some(json!({ "name": "frontend" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "frontend");

        let (status, body) = call(&router, Method::PUT, &uri, Some(json!({ "name": "web" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());

        let (status, _) = call(&router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, listed) = call(&router, Method::GET, "/api/tags", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed, json!([{ "id": tags[1]["id"], "name": "web" }]));
    });
}

#[test]
fn http_api_rejects_bad_input() {
    test_runtime().block_on(async {
        let router = make_router(Some("secret"));

        let (status, _) =
            call(&router, Method::GET, "/api/translations?page=-1&size=10", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            Method::POST,
            "/api/translations/search",
            Some(json!({ "size": 1001 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("1000"));

        let (status, _) = call(&router, Method::GET, "/api/tags/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let row = json!([{ "key": "a", "locale": "en", "value": "A" }]);
        let (status, _) = call(&router, Method::POST, "/api/translations", Some(row.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&router, Method::POST, "/api/translations", Some(row)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    });
}

#[test]
fn http_api_requires_token_when_configured() {
    test_runtime().block_on(async {
        let router = make_router(Some("secret"));
        let response = router
            .clone()
            .oneshot(Request::builder().uri("/api/tags").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/tags")
                    .header("x-api-token", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let open = make_router(None);
        let response = open
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    });
}

#[test]
fn http_api_list_export_status_and_seed() {
    test_runtime().block_on(async {
        let router = make_router(Some("secret"));

        let (status, report) = call(&router, Method::POST, "/api/seeder/seed", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report, json!({ "skipped": false, "tagsCreated": 2, "translationsCreated": 6 }));

        let (_, report) = call(&router, Method::POST, "/api/seeder/seed", None).await;
        assert_eq!(report["skipped"], true);

        let (status, page) = call(&router, Method::GET, "/api/translations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["pageSize"], 10);
        assert_eq!(page["totalElements"], 6);
        assert_eq!(page["content"].as_array().unwrap().len(), 6);

        let (_, page) = call(&router, Method::GET, "/api/translations?page=1&size=4", None).await;
        assert_eq!(page["content"].as_array().unwrap().len(), 2);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["hasMore"], false);

        let (status, export) = call(&router, Method::GET, "/api/translations/export", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(export["en"]["key2"], "value2");
        assert_eq!(export["fr"]["key1"], "value1");

        let (status, body) = call(&router, Method::GET, "/api/translations/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("working...".into()));
    });
}
