//! End-to-end tests: the builder talking to the mock server over real
//! sockets, both as a separately spawned listener and as a backing `App`.

use std::time::Duration;

use fluently::{AttachOptions, AuthType, FetchError, Fluently, HttpMethod};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Serve the mock app on an ephemeral port and return its base URL.
async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

async fn client() -> Fluently {
    Fluently::new(&spawn_server().await).unwrap()
}

fn app_client() -> Fluently {
    Fluently::from_app(mock_server::app()).unwrap()
}

// ---------------------------------------------------------------------------
// Methods, headers and query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_verb_reaches_the_server() {
    let client = client().await;
    for (req, method) in [
        (client.get("/echo"), "GET"),
        (client.post("/echo"), "POST"),
        (client.put("/echo"), "PUT"),
        (client.patch("/echo"), "PATCH"),
        (client.del("/echo"), "DELETE"),
        (client.options("/echo"), "OPTIONS"),
    ] {
        let echoed: Value = req.await.unwrap().json().unwrap();
        assert_eq!(echoed["method"], method);
    }

    let res = client.head("/echo").await.unwrap();
    assert_eq!(res.status, 200);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn headers_are_sent_case_insensitively() {
    let client = client().await;
    let echoed: Value = client
        .get("/echo")
        .set_header("X-Uuid", "1")
        .unwrap()
        .set_headers([("x-uuid", "2"), ("X-Other", "3")])
        .unwrap()
        .accept("json")
        .unwrap()
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["headers"]["x-uuid"], "2");
    assert_eq!(echoed["headers"]["x-other"], "3");
    assert_eq!(echoed["headers"]["accept"], "application/json");
}

#[tokio::test]
async fn query_is_merged_and_sorted() {
    let client = client().await;
    let echoed: Value = client
        .get("/echo")
        .set_query("c=3&a=1")
        .set_query([("b", "2"), ("a", "9")])
        .sort_query()
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["url"], "/echo?a=9&b=2&c=3");
    assert_eq!(echoed["query"], json!({"a": "9", "b": "2", "c": "3"}));
}

#[tokio::test]
async fn query_sorts_with_custom_comparator() {
    let client = client().await;
    let echoed: Value = client
        .get("/echo")
        .set_query("a=1&b=2&c=3")
        .sort_query_by(|x, y| y.0.cmp(&x.0))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["url"], "/echo?c=3&b=2&a=1");
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_objects_merge() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo")
        .send(json!({"name": "jobi", "job": "none"}))
        .send(json!({"job": "jobin' around"}))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["headers"]["content-type"], "application/json");
    assert_eq!(echoed["body"], json!({"name": "jobi", "job": "jobin' around"}));
}

#[tokio::test]
async fn json_arrays_concatenate() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo")
        .send(json!([1, 2]))
        .send(json!([3]))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["body"], json!([1, 2, 3]));
}

#[tokio::test]
async fn strings_join_as_urlencoded() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo")
        .send("hey=paul")
        .send("name=jobi")
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(
        echoed["headers"]["content-type"],
        "application/x-www-form-urlencoded"
    );
    assert_eq!(echoed["body"], json!({"hey": "paul", "name": "jobi"}));
}

#[tokio::test]
async fn explicit_type_is_kept() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo")
        .set_type("text/plain")
        .unwrap()
        .send("just text")
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["headers"]["content-type"], "text/plain");
    assert_eq!(echoed["body"], "just text");
}

#[tokio::test]
async fn content_type_follows_a_replaced_body() {
    let echoed: Value = app_client()
        .post("/echo")
        .send("a=1")
        .send(json!({"b": 2}))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["headers"]["content-type"], "application/json");
    assert_eq!(echoed["body"], json!({"b": 2}));
}

#[derive(serde::Serialize)]
struct Profile<'a> {
    name: &'a str,
    age: u8,
}

#[tokio::test]
async fn serializable_values_are_sent_as_json() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo")
        .add_json(&Profile { name: "jobi", age: 7 })
        .unwrap()
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["body"], json!({"name": "jobi", "age": 7}));
}

#[tokio::test]
async fn fields_and_attachments_are_multipart() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo-form")
        .set_field("name", "jobi")
        .set_fields([("job", "none")])
        .attach(
            "avatar",
            &b"\x89PNG fake"[..],
            AttachOptions::default()
                .filename("me.png")
                .content_type("image/png"),
        )
        .attach("blob", vec![1u8, 2, 3], AttachOptions::default())
        .await
        .unwrap()
        .json()
        .unwrap();

    let content_type = echoed["headers"]["content-type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(echoed["body"], json!({"name": "jobi", "job": "none"}));
    assert_eq!(
        echoed["files"],
        json!([
            {"field": "avatar", "name": "me.png", "type": "image/png", "size": 9},
            {"field": "blob", "name": "blob", "type": "application/octet-stream", "size": 3},
        ])
    );
}

#[tokio::test]
async fn fields_absorb_an_earlier_json_object() {
    let client = client().await;
    let echoed: Value = client
        .post("/echo-form")
        .send(json!({"name": "jobi"}))
        .set_field("job", "none")
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["body"], json!({"name": "jobi", "job": "none"}));
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[tokio::test]
async fn basic_auth_is_accepted() {
    let client = client().await;
    let res = client
        .get("/auth/shaggy/farOutMan")
        .set_auth("shaggy", Some("farOutMan"))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(res.status, 200);

    let res = client.get("/auth/shaggy/farOutMan").await.unwrap();
    assert_eq!(res.status, 401);

    let res = client
        .get("/auth/shaggy/farOutMan")
        .set_auth("scooby", Some("snacks"))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(res.status, 403);
}

#[tokio::test]
async fn url_credentials_are_sent_as_basic_auth() {
    let client = client().await;
    let res = client
        .get("/auth/shaggy/farOutMan")
        .set_auth_with("shaggy", Some("farOutMan"), AuthType::Auto)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(res.status, 200);
}

#[tokio::test]
async fn omitted_credentials_drop_url_userinfo() {
    let client = client().await;
    let res = client
        .get("/auth/shaggy/farOutMan")
        .set_auth_with("shaggy", Some("farOutMan"), AuthType::Auto)
        .unwrap()
        .clone_with(fluently::RequestInit {
            credentials: Some(fluently::Credentials::Omit),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(res.status, 401);
}

#[tokio::test]
async fn bearer_tokens_are_sent_verbatim() {
    let client = client().await;
    let echoed: Value = client
        .get("/echo")
        .set_auth("t0ken", None)
        .unwrap()
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(echoed["headers"]["authorization"], "Bearer t0ken");
}

// ---------------------------------------------------------------------------
// Timeouts, ok-checks and plugins
// ---------------------------------------------------------------------------

#[tokio::test]
async fn slow_responses_time_out() {
    let client = client().await;
    let err = client
        .get("/delay/500")
        .set_timeout(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.to_string(), "timeout after 50 ms");
}

#[tokio::test]
async fn fast_responses_beat_the_timeout() {
    let client = client().await;
    let res = client
        .get("/delay/1")
        .set_timeout(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(res.text(), "ok");
}

#[tokio::test]
async fn error_statuses_resolve_without_an_ok_check() {
    let client = client().await;
    let res = client.get("/error").await.unwrap();
    assert_eq!(res.status, 500);
    assert!(!res.is_success());
}

#[tokio::test]
async fn ok_check_rejects_error_statuses() {
    let client = client().await;
    let err = client
        .get("/status/404")
        .ok(|res| res.is_success())
        .await
        .unwrap_err();

    let response = err.response().unwrap();
    assert_eq!(response.status, 404);
    assert!(matches!(err, FetchError::ResponseRejected { .. }));
    assert!(err.to_string().contains("Not Found"));
    assert!(err.to_string().contains("/status/404"));
}

#[tokio::test]
async fn ok_checks_run_in_order() {
    let client = client().await;
    let err = client
        .get("/status/201")
        .add_ok_check(|res| res.status < 300)
        .add_async_ok_check(|res| async move { res.status == 200 })
        .await
        .unwrap_err();
    assert_eq!(err.response().unwrap().status, 201);
}

#[tokio::test]
async fn plugins_can_configure_the_request() {
    let client = client().await;
    let echoed: Value = client
        .get("/nope")
        .use_plugin(|req| req.set_method_and_path(HttpMethod::Post, "/echo"))
        .use_plugin(|req| req.send(json!({"via": "plugin"})))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], json!({"via": "plugin"}));
}

#[tokio::test]
async fn templates_are_reusable_after_cloning() {
    let client = client().await;
    let template = client
        .post("/echo")
        .set_header("x-template", "yes")
        .unwrap()
        .send(json!({"a": 1}));

    let first: Value = template
        .clone()
        .send(json!({"b": 2}))
        .await
        .unwrap()
        .json()
        .unwrap();
    let second: Value = template.await.unwrap().json().unwrap();

    assert_eq!(first["body"], json!({"a": 1, "b": 2}));
    assert_eq!(second["body"], json!({"a": 1}));
    assert_eq!(second["headers"]["x-template"], "yes");
}

// ---------------------------------------------------------------------------
// Backing app
// ---------------------------------------------------------------------------

#[tokio::test]
async fn app_requests_use_a_short_lived_listener() {
    let res = app_client()
        .post("/echo")
        .set_query("from=app")
        .send(json!({"name": "jobi"}))
        .await
        .unwrap();
    assert_eq!(res.status, 200);

    let echoed: Value = res.json().unwrap();
    assert_eq!(echoed["body"], json!({"name": "jobi"}));

    let served_from = url::Url::parse(&res.url).unwrap();
    let addr = served_from.socket_addrs(|| None).unwrap()[0];
    assert!(addr.ip().is_loopback());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn app_listener_closes_after_errors() {
    let err = app_client()
        .get("/delay/500")
        .set_timeout(Duration::from_millis(20))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let rejected = app_client()
        .get("/status/500")
        .ok(|res| res.is_success())
        .await
        .unwrap_err();
    let url = url::Url::parse(&rejected.response().unwrap().url).unwrap();
    let addr = url.socket_addrs(|| None).unwrap()[0];
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn each_dispatch_of_an_app_request_gets_its_own_listener() {
    let template = app_client().get("/echo");
    let a = template.clone().await.unwrap();
    let b = template.await.unwrap();
    assert_eq!(a.status, 200);
    assert_eq!(b.status, 200);
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn free_functions_build_requests_from_absolute_urls() {
    let base = spawn_server().await;
    let echoed: Value = fluently::post(&format!("{base}/echo?x=1"))
        .unwrap()
        .send("k=v")
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["url"], "/echo?x=1");
    assert_eq!(echoed["body"], json!({"k": "v"}));
}

#[tokio::test]
async fn connection_failures_surface_as_transport_errors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fluently::get(&format!("http://{addr}/echo"))
        .unwrap()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn del_is_delete() {
    let base = spawn_server().await;
    let echoed: Value = fluently::del(&format!("{base}/echo"))
        .unwrap()
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(echoed["method"], "DELETE");
}

#[tokio::test]
async fn free_app_requests_are_served_in_process() {
    let echoed: Value = fluently::app(mock_server::app())
        .unwrap()
        .put("/echo")
        .send(json!({"from": "app"}))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(echoed["method"], "PUT");
    assert_eq!(echoed["body"], json!({"from": "app"}));
}
