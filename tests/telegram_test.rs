//! Tests for the Telegram client using mock servers.

use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;
use walkout_bot::bot::telegram::TelegramClient;
use walkout_bot::notifier::Menu;
use walkout_bot::notifier::MenuButton;
use walkout_bot::notifier::Notifier;
use walkout_bot::notifier::NotifyError;
use walkout_bot::notifier::OutgoingMessage;

const TOKEN: &str = "123:abc";

fn client(server: &MockServer) -> TelegramClient {
    TelegramClient::new(server.base_url(), TOKEN).expect("Failed to build client")
}

#[tokio::test]
async fn test_send_message_posts_keyboard() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/bot{TOKEN}/sendMessage"))
            .json_body(json!({
                "chat_id": 42,
                "text": "Pick one",
                "reply_markup": {
                    "inline_keyboard": [[{ "text": "A vs B", "callback_data": "1|2|A vs B" }]]
                }
            }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"ok": true, "result": {"message_id": 9, "chat": {"id": 42}}}"#);
    });

    let message = OutgoingMessage::text("Pick one")
        .with_menu(Menu::single_column([MenuButton::new("A vs B", "1|2|A vs B")]));
    client(&server)
        .send(42, message)
        .await
        .expect("Failed to send message");

    mock.assert();
}

#[tokio::test]
async fn test_send_rejected_by_api() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("/bot{TOKEN}/sendMessage"));
        then.status(403)
            .header("content-type", "application/json")
            .body(r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"}"#);
    });

    let res = client(&server).send(42, OutgoingMessage::text("hi")).await;

    match res {
        Err(NotifyError::Rejected {
            recipient,
            description,
        }) => {
            assert_eq!(recipient, 42);
            assert!(description.contains("blocked"));
        }
        other => panic!("Expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_with_garbage_response_is_delivery_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("/bot{TOKEN}/sendMessage"));
        then.status(502).body("Bad Gateway");
    });

    let res = client(&server).send(42, OutgoingMessage::text("hi")).await;

    assert!(
        matches!(res, Err(NotifyError::DeliveryFailed { recipient: 42, .. })),
        "got {res:?}"
    );
}

#[tokio::test]
async fn test_get_updates() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/bot{TOKEN}/getUpdates"))
            .json_body_partial(r#"{"offset": 100, "timeout": 0}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(
                json!({
                    "ok": true,
                    "result": [
                        {
                            "update_id": 100,
                            "message": {
                                "message_id": 1,
                                "chat": { "id": 42, "type": "private" },
                                "from": { "id": 42, "is_bot": false, "first_name": "Dana" },
                                "text": "/start"
                            }
                        },
                        {
                            "update_id": 101,
                            "callback_query": {
                                "id": "cb1",
                                "from": { "id": 42, "is_bot": false, "first_name": "Dana" },
                                "message": { "message_id": 2, "chat": { "id": 42 } },
                                "data": "action_view"
                            }
                        }
                    ]
                })
                .to_string(),
            );
    });

    let updates = client(&server)
        .get_updates(Some(100), 0)
        .await
        .expect("Failed to get updates");

    mock.assert();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].message.as_ref().unwrap().command(), Some("start"));
    let query = updates[1].callback_query.as_ref().unwrap();
    assert_eq!(query.data.as_deref(), Some("action_view"));
    assert_eq!(query.message.as_ref().unwrap().chat.id, 42);
}

#[tokio::test]
async fn test_answer_callback_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("/bot{TOKEN}/answerCallbackQuery"))
            .json_body(json!({ "callback_query_id": "cb1" }));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"ok": true, "result": true}"#);
    });

    client(&server)
        .answer_callback_query("cb1")
        .await
        .expect("Failed to answer callback");

    mock.assert();
}
