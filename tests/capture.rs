mod common;

use std::sync::Arc;

use serde_json::json;

use offline_sync::{
    api::{AuthOutcome, BackendApi, Credentials, NotificationRequest, RegisterRequest},
    capture::{ApiClient, ApiError, WriteOutcome},
    connectivity::Connectivity,
    core::queue::{IdPolicy, MemoryQueue},
    persist::{PersistError, PersistResult, QueueStore, StoreHandle, session::SessionStore},
    record::{QueueDraft, QueueRecord},
    transport::Method,
    types::{DeleteOutcome, RecordId},
};

use common::{Reply, ScriptedTransport, register_payload};

struct BrokenStore;

impl QueueStore for BrokenStore {
    fn add(&mut self, _draft: QueueDraft) -> PersistResult<RecordId> {
        Err(PersistError::Message("disk full".to_string()))
    }

    fn list_all(&self) -> PersistResult<Vec<QueueRecord>> {
        Ok(Vec::new())
    }

    fn delete_by_id(&mut self, _id: RecordId) -> PersistResult<DeleteOutcome> {
        Ok(DeleteOutcome::NotFound)
    }
}

fn client(transport: Arc<ScriptedTransport>, online: bool) -> ApiClient {
    ApiClient::new(
        transport,
        StoreHandle::new(MemoryQueue::with_policy(IdPolicy::Sequential)),
        Connectivity::new(online),
    )
}

#[tokio::test]
async fn offline_write_is_queued_with_its_payload() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let client = client(transport, false);

    let outcome = client
        .write("/register", register_payload())
        .await
        .expect("queued outcome");
    assert_eq!(outcome, WriteOutcome::Queued { id: 1 });
    assert!(outcome.is_queued());

    let records = client.store().list_all().await.expect("list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint, "/register");
    assert_eq!(records[0].data, register_payload());
}

#[tokio::test]
async fn each_failed_call_gets_its_own_record() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let client = client(transport, false);

    for _ in 0..3 {
        client
            .write("/register", register_payload())
            .await
            .expect("queued");
    }
    assert_eq!(client.store().len().await.expect("len"), 3);
}

#[tokio::test]
async fn online_network_failure_surfaces_and_is_not_queued() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let client = client(transport, true);

    let err = client
        .write("/register", register_payload())
        .await
        .expect_err("network error");
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(client.store().len().await.expect("len"), 0);
}

#[tokio::test]
async fn application_errors_are_never_queued() {
    let transport = Arc::new(ScriptedTransport::new(Reply::Status(
        401,
        json!({ "status": "error", "message": "bad credentials" }),
    )));

    for online in [true, false] {
        let client = client(Arc::clone(&transport), online);
        let err = client
            .write("/login", json!({ "email": "a@b.c", "password": "x" }))
            .await
            .expect_err("application error");
        match err {
            ApiError::Application { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.store().len().await.expect("len"), 0);
    }
}

#[tokio::test]
async fn delivered_write_returns_the_response_body() {
    let transport = Arc::new(ScriptedTransport::new(Reply::Status(
        201,
        json!({ "status": "success", "id": 7 }),
    )));
    let client = client(Arc::clone(&transport), true);

    let outcome = client
        .write("/custom", json!({ "x": 1 }))
        .await
        .expect("delivered");
    assert_eq!(outcome, WriteOutcome::Delivered(json!({ "status": "success", "id": 7 })));

    let calls = transport.calls();
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].body, Some(json!({ "x": 1 })));
}

#[tokio::test]
async fn reads_are_never_queued() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let client = client(transport, false);

    let err = client.fetch("/users").await.expect_err("offline read");
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(client.store().len().await.expect("len"), 0);
}

#[tokio::test]
async fn store_failure_while_offline_is_reported_not_swallowed() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let client = ApiClient::new(transport, StoreHandle::new(BrokenStore), Connectivity::new(false));

    let err = client
        .write("/register", register_payload())
        .await
        .expect_err("not durably queued");
    assert!(matches!(err, ApiError::NotDurablyQueued { .. }));
}

#[tokio::test]
async fn login_remembers_the_user_and_logout_forgets_it() {
    let transport = Arc::new(ScriptedTransport::new(Reply::Status(
        200,
        json!({ "status": "success", "user": { "id": "u1", "name": "Test User" } }),
    )));
    let session = SessionStore::open_in_memory().expect("session");
    let api = BackendApi::new(client(transport, true)).with_session(session);

    let outcome = api
        .login(&Credentials {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await
        .expect("login");
    let AuthOutcome::Answered(response) = outcome else {
        panic!("expected an answer");
    };
    assert!(response.is_success());

    let restored = api.restore_session().await.expect("restore");
    assert_eq!(restored, Some(json!({ "id": "u1", "name": "Test User" })));

    api.logout().await.expect("logout");
    assert_eq!(api.restore_session().await.expect("restore"), None);
}

#[tokio::test]
async fn offline_register_is_queued_through_the_api() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let api = BackendApi::new(client(transport, false));

    let outcome = api
        .register(&RegisterRequest {
            name: "Test User".to_string(),
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            phone: "123456789".to_string(),
        })
        .await
        .expect("register");
    assert_eq!(outcome, AuthOutcome::Queued { id: 1 });

    let records = api.client().store().list_all().await.expect("list");
    assert_eq!(records[0].data, register_payload());
}

#[tokio::test]
async fn read_and_notification_endpoints() {
    let transport = Arc::new(ScriptedTransport::ok());
    transport.script(
        "/notifications/public-key",
        Reply::Status(200, json!({ "publicKey": "BEl62iUYgUivxIkv69yViEuiBIa" })),
    );
    transport.script("/users", Reply::Status(200, json!([{ "id": "u1" }, { "id": "u2" }])));
    let api = BackendApi::new(client(Arc::clone(&transport), true));

    assert_eq!(
        api.notification_public_key().await.expect("key"),
        "BEl62iUYgUivxIkv69yViEuiBIa"
    );
    assert_eq!(api.users().await.expect("users").len(), 2);

    api.send_notification_to_user(&NotificationRequest {
        user_id: "u1".to_string(),
        title: "Hello".to_string(),
        body: "World".to_string(),
        icon: "/icon.png".to_string(),
        url: "/".to_string(),
    })
    .await
    .expect("send");

    let last = transport.calls().pop().expect("call");
    assert_eq!(last.path, "/notifications/send-to-user");
    assert_eq!(last.body.expect("body")["userId"], "u1");
}

#[tokio::test]
async fn notification_posts_are_not_queued_offline() {
    let transport = Arc::new(ScriptedTransport::unreachable());
    let api = BackendApi::new(client(transport, false));

    let err = api
        .subscribe_notifications("u1", json!({ "endpoint": "https://push.example" }))
        .await
        .expect_err("offline subscribe");
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(api.client().store().len().await.expect("len"), 0);
}
