#![allow(clippy::unwrap_used)]
// Integration tests for `AvyconClient` using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Method;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{header, header_regex, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use avycon_api::{
    AvyconClient, Challenge, ClientConfig, Credentials, DigestHandshake, Error, ResponseBody,
};

const LOGIN: &str = "/API/Web/Login";
const CHALLENGE: &str = r#"Digest realm="DVR Web", qop="auth", nonce="5f1c3a9e0b7d4e2a""#;

// ── Helpers ─────────────────────────────────────────────────────────

fn password() -> SecretString {
    SecretString::from("hunter2")
}

async fn setup() -> (MockServer, AvyconClient) {
    let server = MockServer::start().await;
    let client = AvyconClient::new(Url::parse(&server.uri()).unwrap(), ClientConfig::default());
    (server, client)
}

/// Mount the two-step login: 401 + challenge for the priming POST, 200 with
/// `answer` for the POST carrying a Digest header.
async fn mount_login(server: &MockServer, answer: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .and(header_regex("authorization", "^Digest "))
        .respond_with(answer)
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("www-authenticate", CHALLENGE)
                .set_body_string("Unauthorized"),
        )
        .mount(server)
        .await;
}

fn login_ok() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("set-cookie", "session=abc123; path=/")
        .insert_header("x-csrftoken", "tok-1")
        .set_body_json(json!({ "result": "success", "data": {} }))
}

async fn logged_in() -> (MockServer, AvyconClient) {
    let (server, client) = setup().await;
    mount_login(&server, login_ok()).await;
    client.authenticate("admin", &password()).await.unwrap();
    (server, client)
}

async fn requests_to(server: &MockServer, p: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == p)
        .collect()
}

fn header_value<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.headers.get(name).map(|v| v.to_str().unwrap())
}

/// Pull `key=value` or `key="value"` out of a Digest header.
fn digest_param(authorization: &str, key: &str) -> String {
    authorization
        .trim_start_matches("Digest ")
        .split(", ")
        .find_map(|part| part.strip_prefix(&format!("{key}=")))
        .map(|v| v.trim_matches('"').to_owned())
        .unwrap()
}

fn digest_headers(reqs: &[Request]) -> Vec<String> {
    reqs.iter()
        .filter_map(|r| header_value(r, "authorization"))
        .filter(|v| v.starts_with("Digest "))
        .map(String::from)
        .collect()
}

fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn channel_payload(id: &str) -> Value {
    json!({
        "channel": id,
        "connect_status": "Online",
        "channel_name": format!("Camera {id}"),
        "channel_alias": id,
        "ability": ["ptz"],
    })
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_cookie_and_token() {
    let (server, client) = setup().await;
    mount_login(&server, login_ok()).await;

    let envelope = client.authenticate("admin", &password()).await.unwrap();

    assert_eq!(envelope["result"], "success");
    let session = client.session();
    assert_eq!(session.cookie(), Some("abc123"));
    assert_eq!(session.csrf_token(), Some("tok-1"));
    assert_eq!(session.nonce_count(), 2);
    assert!(session.is_authenticated());
    assert_eq!(session.credentials().unwrap().username(), "admin");

    let logins = requests_to(&server, LOGIN).await;
    assert_eq!(logins.len(), 2);
    assert!(header_value(&logins[0], "authorization").is_none());
    let body: Value = serde_json::from_slice(&logins[1].body).unwrap();
    assert_eq!(body, json!({ "data": { "remote_terminal_info": "WEB,firefox" } }));
}

#[tokio::test]
async fn test_login_digest_response_is_correct() {
    let (server, client) = setup().await;
    mount_login(&server, login_ok()).await;
    client.authenticate("admin", &password()).await.unwrap();

    let auth = digest_headers(&requests_to(&server, LOGIN).await)
        .pop()
        .unwrap();

    assert_eq!(digest_param(&auth, "username"), "admin");
    assert_eq!(digest_param(&auth, "realm"), "DVR Web");
    assert_eq!(digest_param(&auth, "uri"), LOGIN);
    assert_eq!(digest_param(&auth, "qop"), "auth");
    assert_eq!(digest_param(&auth, "nc"), "1");

    let cnonce = digest_param(&auth, "cnonce");
    assert_eq!(cnonce.len(), 43);
    let challenge = Challenge::parse(CHALLENGE).unwrap();
    let credentials = Credentials::new("admin", password());
    let expected = DigestHandshake {
        method: "POST",
        uri: LOGIN,
        challenge: &challenge,
        credentials: &credentials,
        cnonce: &cnonce,
        nonce_count: 1,
        entity_body: b"Unauthorized",
    }
    .response();
    assert_eq!(digest_param(&auth, "response"), expected);
}

#[tokio::test]
async fn test_nonce_count_advances_once_per_login() {
    let (server, client) = setup().await;
    mount_login(&server, login_ok()).await;

    client.authenticate("admin", &password()).await.unwrap();
    client.authenticate("admin", &password()).await.unwrap();

    assert_eq!(client.session().nonce_count(), 3);
    let ncs: Vec<String> = digest_headers(&requests_to(&server, LOGIN).await)
        .iter()
        .map(|h| digest_param(h, "nc"))
        .collect();
    assert_eq!(ncs, vec!["1", "2"]);
}

#[tokio::test]
async fn test_login_without_cookie_or_token_sets_neither() {
    let (server, client) = setup().await;
    mount_login(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "result": "success" })),
    )
    .await;

    client.authenticate("admin", &password()).await.unwrap();

    let session = client.session();
    assert!(session.cookie().is_none());
    assert!(session.csrf_token().is_none());
    assert!(session.is_authenticated());
}

#[tokio::test]
async fn test_missing_challenge_is_protocol_error() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path(LOGIN))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.authenticate("admin", &password()).await;

    assert!(
        matches!(result, Err(Error::Protocol { .. })),
        "expected Protocol error, got: {result:?}"
    );
    assert!(!client.is_open(), "failed login must release the connection");
    assert_eq!(client.session().nonce_count(), 1);
}

#[tokio::test]
async fn test_rejected_login_is_authentication_error() {
    let (server, client) = setup().await;
    mount_login(&server, ResponseTemplate::new(401).set_body_string("bad password")).await;

    let result = client.authenticate("admin", &password()).await;

    match result {
        Err(Error::Authentication { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad password");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.session().is_authenticated());
    assert!(!client.is_open(), "failed login must release the connection");
    assert_eq!(client.session().nonce_count(), 1);
}

#[tokio::test]
async fn test_failed_login_keeps_connection_opened_by_caller() {
    let (server, client) = setup().await;
    mount_login(&server, ResponseTemplate::new(401)).await;
    client.open().unwrap();

    let result = client.authenticate("admin", &password()).await;

    assert!(matches!(result, Err(Error::Authentication { .. })));
    assert!(client.is_open());
    client.close();
    assert!(!client.is_open());
}

// ── Request tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_request_before_open_is_state_error() {
    let (_server, client) = setup().await;

    let result = client.request(Method::POST, "/API/Login/Heartbeat", None).await;

    assert!(
        matches!(result, Err(Error::State(_))),
        "expected State error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_request_after_close_is_state_error() {
    let (_server, client) = logged_in().await;
    client.close();

    let result = client.channel_info().await;

    assert!(matches!(result, Err(Error::State(_))));
    assert!(client.session().cookie().is_none());
    assert_eq!(client.session().nonce_count(), 2);
}

#[tokio::test]
async fn test_bodiless_post_sends_empty_object_and_session_headers() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Login/Heartbeat"))
        .and(header("authorization", "Basic Og=="))
        .and(header("cookie", "session=abc123"))
        .and(header("x-csrftoken", "tok-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "success" })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .request(Method::POST, "/API/Login/Heartbeat", None)
        .await
        .unwrap();

    let reqs = requests_to(&server, "/API/Login/Heartbeat").await;
    assert_eq!(reqs[0].body, b"{}");

    let query = reqs[0].url.query().unwrap();
    let key = query.strip_suffix('=').unwrap();
    assert!(NaiveDateTime::parse_from_str(key, "%Y-%m-%d@%H:%M:%S").is_ok());
}

#[tokio::test]
async fn test_json_body_is_sent_verbatim() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Custom"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "success" })))
        .mount(&server)
        .await;

    let body = json!({ "version": "1.0", "data": { "z": [1, 2, 3], "a": "ü" } });
    client
        .request(Method::POST, "/API/Custom", Some(&body))
        .await
        .unwrap();

    let reqs = requests_to(&server, "/API/Custom").await;
    assert_eq!(reqs[0].body, serde_json::to_vec(&body).unwrap());
}

#[tokio::test]
async fn test_playback_mutex_is_api_error() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/GetDashPlaybackUrl"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "result": "failed", "reason": "playback_mutex" })),
        )
        .mount(&server)
        .await;

    let err = client.playback_url().await.unwrap_err();

    assert!(err.is_busy(), "expected busy error, got: {err:?}");
    match err {
        Error::Api { status, body, .. } => {
            assert_eq!(status, 401);
            assert_eq!(body.reason(), Some("playback_mutex"));
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_envelope_on_200_is_api_error() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Web/Get_Private_Key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "version": "1.0", "error_code": "no_permission" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/API/Login/Heartbeat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": "failed", "reason": "session_invalid" })),
        )
        .mount(&server)
        .await;

    let err = client.heartbeat().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 200, .. }), "got: {err:?}");

    // An error_code envelope without result=failed is still a success.
    let envelope = client.private_key().await.unwrap();
    assert_eq!(envelope["error_code"], "no_permission");
}

#[tokio::test]
async fn test_error_status_keeps_raw_text_body() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Login/ChannelInfo/Get"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = client.channel_info().await.unwrap_err();

    match err {
        Error::Api { status, body, message } => {
            assert_eq!(status, 500);
            assert_eq!(body, ResponseBody::Raw(b"internal error".to_vec()));
            assert!(message.is_none());
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_success_is_protocol_error_unless_passthrough() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/PlayBack/Dash/index.mpd"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<MPD/>", "application/dash+xml"),
        )
        .mount(&server)
        .await;

    let result = client
        .request(Method::POST, "/API/PlayBack/Dash/index.mpd", None)
        .await;
    assert!(
        matches!(result, Err(Error::Protocol { .. })),
        "expected Protocol error, got: {result:?}"
    );

    let body = client
        .request_passthrough(Method::POST, "/API/PlayBack/Dash/index.mpd", None)
        .await
        .unwrap();
    assert_eq!(body, ResponseBody::Raw(b"<MPD/>".to_vec()));
}

// ── Endpoint tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_channels() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Login/ChannelInfo/Get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "data": {
                "channel_param": {
                    "items": [
                        channel_payload("CH1"),
                        {
                            "channel": "CH2",
                            "connect_status": "Offline",
                            "channel_name": "Yard",
                            "channel_alias": "CH2",
                            "videoloss": true
                        }
                    ]
                }
            }
        })))
        .mount(&server)
        .await;

    let channels = client.fetch_channels().await.unwrap();

    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].id, "CH1");
    assert!(channels[0].status.is_online());
    assert!(channels[0].abilities.contains("ptz"));
    assert!(channels[1].abilities.is_empty());
    assert!(channels[1].intelligent_abilities.is_empty());
    assert!(channels[1].video_loss);
}

#[tokio::test]
async fn test_fetch_channels_without_items_is_validation_error() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Login/ChannelInfo/Get"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": "success", "data": {} })),
        )
        .mount(&server)
        .await;

    let result = client.fetch_channels().await;

    assert!(matches!(result, Err(Error::Validation { .. })), "got: {result:?}");
}

#[tokio::test]
async fn test_search_records() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Playback/SearchRecord/Search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "data": {
                "record": [[{
                    "channel": "CH1",
                    "stream_mode": "Substream",
                    "record_type": 1,
                    "start_date": "01/02/2024",
                    "start_time": "03:04:05",
                    "end_date": "01/02/2024",
                    "end_time": "03:06:05",
                    "record_id": 9,
                    "disk_event_id": 0,
                    "size": 2048
                }]]
            }
        })))
        .mount(&server)
        .await;

    let channel = Arc::new(avycon_api::Channel::from_value(&channel_payload("CH1")).unwrap());
    let channels = vec![Arc::clone(&channel)];
    let records = client
        .search_records(&channels, ts(3, 0, 0), ts(3, 10, 0))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].start, ts(3, 4, 5));
    assert!(Arc::ptr_eq(&records[0].channel, &channel));
    assert_eq!(records[0].event_id, None);

    let reqs = requests_to(&server, "/API/Playback/SearchRecord/Search").await;
    let body: Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(body["data"]["channel"], json!(["CH1"]));
    assert_eq!(body["data"]["start_date"], "01/02/2024");
    assert_eq!(body["data"]["start_time"], "03:00:00");
    assert_eq!(body["data"]["end_time"], "03:10:00");
}

#[tokio::test]
async fn test_search_records_empty() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Playback/SearchRecord/Search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": "success", "data": { "record": [] } })),
        )
        .mount(&server)
        .await;

    let records = client
        .search_records_raw(&["CH1"], ts(3, 0, 0), ts(3, 10, 0))
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_playback_url_returns_data() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/GetDashPlaybackUrl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "success",
            "data": {
                "mpd": "/API/PlayBack/Dash/index.mpd?id=4",
                "keepalive": "/API/PlayBack/Dash/KeepAlive?id=4",
                "stop": "/API/PlayBack/Dash/Stop?id=4"
            }
        })))
        .mount(&server)
        .await;

    let data = client.playback_url().await.unwrap();
    let urls = avycon_api::PlaybackUrls::from_value(&data).unwrap();
    assert_eq!(urls.keepalive, "/API/PlayBack/Dash/KeepAlive?id=4");

    let reqs = requests_to(&server, "/API/GetDashPlaybackUrl").await;
    let query = reqs[0].url.query().unwrap();
    let (millis, rest) = query.split_once("=&").unwrap();
    assert!(millis.parse::<i64>().is_ok());
    assert!(rest.ends_with('='));
}

#[tokio::test]
async fn test_logout_body() {
    let (server, client) = logged_in().await;
    Mock::given(method("POST"))
        .and(path("/API/Web/Logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "success" })))
        .mount(&server)
        .await;

    client.logout().await.unwrap();

    let reqs = requests_to(&server, "/API/Web/Logout").await;
    let body: Value = serde_json::from_slice(&reqs[0].body).unwrap();
    assert_eq!(body, json!({ "data": {}, "version": "1.0" }));
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_close_on_never_authenticated_client() {
    let (_server, client) = setup().await;
    client.close();
    client.close();
    assert!(!client.is_open());
    assert_eq!(client.session().nonce_count(), 1);
}

#[tokio::test]
async fn test_oneshot_closes_after_success() {
    let (server, _) = setup().await;
    mount_login(&server, login_ok()).await;
    Mock::given(method("POST"))
        .and(path("/API/Login/Heartbeat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "success" })))
        .mount(&server)
        .await;

    let client = AvyconClient::oneshot(
        Url::parse(&server.uri()).unwrap(),
        ClientConfig::default(),
        "admin",
        &password(),
        |c| async move {
            assert_eq!(c.session().cookie(), Some("abc123"));
            c.heartbeat().await?;
            Ok::<_, Error>(c)
        },
    )
    .await
    .unwrap();

    assert!(!client.is_open());
    assert!(client.session().cookie().is_none());
    assert!(client.session().csrf_token().is_none());
}

#[tokio::test]
async fn test_oneshot_closes_after_failed_login() {
    let (server, _) = setup().await;
    mount_login(&server, ResponseTemplate::new(403)).await;
    let called = Arc::new(AtomicBool::new(false));

    let flag = Arc::clone(&called);
    let result = AvyconClient::oneshot(
        Url::parse(&server.uri()).unwrap(),
        ClientConfig::default(),
        "admin",
        &password(),
        |_c| async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, Error>(())
        },
    )
    .await;

    assert!(matches!(result, Err(Error::Authentication { status: 403, .. })));
    assert!(!called.load(Ordering::SeqCst));
}
