use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tunelink_api::error::ApiServiceError;
use tunelink_api::spotify::session::Session;

use crate::helpers::StaticTokenProvider;

fn session(provider: &StaticTokenProvider, base_url: &str) -> Session<StaticTokenProvider> {
    Session::with_base_url(Client::new(), provider.clone(), base_url)
}

fn track_uris(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("spotify:track:{i}")).collect()
}

// ── get_current_identity ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_attach_bearer_token_and_map_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "spotify-user",
            "display_name": "Ada",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let identity = session(&provider, &server.uri())
        .get_current_identity()
        .await
        .unwrap();

    assert_eq!(identity.id, "spotify-user");
    assert_eq!(identity.display_name.as_deref(), Some("Ada"));
    assert_eq!(provider.refresh_count(), 0);
}

// ── 401 refresh-and-retry ────────────────────────────────────────────────────

#[tokio::test]
async fn should_refresh_and_retry_once_on_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "spotify-user",
            "display_name": null,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("stale-token", "fresh-token");
    let identity = session(&provider, &server.uri())
        .get_current_identity()
        .await
        .unwrap();

    assert_eq!(identity.id, "spotify-user");
    assert_eq!(identity.display_name, None);
    assert_eq!(provider.refresh_count(), 1);
}

#[tokio::test]
async fn should_propagate_second_unauthorized_without_looping() {
    let server = MockServer::start().await;
    // Rejects every token — the session must give up after one retry.
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("bad-token", "still-bad-token");
    let result = session(&provider, &server.uri()).get_current_identity().await;

    assert!(
        matches!(result, Err(ApiServiceError::Upstream { status: 401 })),
        "expected Upstream 401, got {result:?}"
    );
    assert_eq!(provider.refresh_count(), 1, "refresh happens exactly once");
}

// ── list_paginated ───────────────────────────────────────────────────────────

async fn mount_three_pages(server: &MockServer) {
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (0..10).collect::<Vec<i32>>(),
            "next": format!("{uri}/page2"),
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (10..20).collect::<Vec<i32>>(),
            "next": format!("{uri}/page3"),
        })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (20..30).collect::<Vec<i32>>(),
            "next": null,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn should_truncate_paginated_listing_at_max_count() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let items: Vec<i32> = session(&provider, &server.uri())
        .list_paginated(&format!("{}/page1", server.uri()), Some(25))
        .await
        .unwrap();

    // Exactly 25 items, original order, page 1 fetched once (mock expectations
    // verify no duplicate fetches when the server drops).
    assert_eq!(items, (0..25).collect::<Vec<i32>>());
}

#[tokio::test]
async fn should_fetch_every_page_without_max_count() {
    let server = MockServer::start().await;
    mount_three_pages(&server).await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let items: Vec<i32> = session(&provider, &server.uri())
        .list_paginated(&format!("{}/page1", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(items, (0..30).collect::<Vec<i32>>());
}

#[tokio::test]
async fn should_stop_following_cursor_once_max_count_is_reached() {
    let server = MockServer::start().await;
    let uri = server.uri();
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": (0..10).collect::<Vec<i32>>(),
            "next": format!("{uri}/page2"),
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The cursor points onward, but max_count is already satisfied.
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let items: Vec<i32> = session(&provider, &server.uri())
        .list_paginated(&format!("{}/page1", server.uri()), Some(5))
        .await
        .unwrap();

    assert_eq!(items, (0..5).collect::<Vec<i32>>());
}

// ── playlist mutations ───────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_playlist() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/u1/playlists"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "p1",
            "name": "road trip",
            "public": false,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let playlist = session(&provider, &server.uri())
        .create_playlist("u1", "road trip", false)
        .await
        .unwrap();

    assert_eq!(playlist.id, "p1");
    assert_eq!(playlist.name, "road trip");
    assert_eq!(playlist.public, Some(false));
}

#[tokio::test]
async fn should_add_tracks_below_batch_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/playlists/p1/tracks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "snapshot_id": "snap" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    session(&provider, &server.uri())
        .add_tracks("p1", &track_uris(99))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_reject_add_tracks_at_batch_limit_before_any_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let result = session(&provider, &server.uri())
        .add_tracks("p1", &track_uris(100))
        .await;

    assert!(
        matches!(result, Err(ApiServiceError::BatchTooLarge)),
        "expected BatchTooLarge, got {result:?}"
    );
}

#[tokio::test]
async fn should_remove_tracks_below_batch_limit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/playlists/p1/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "snapshot_id": "snap" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    session(&provider, &server.uri())
        .remove_tracks("p1", &track_uris(99))
        .await
        .unwrap();
}

#[tokio::test]
async fn should_reject_remove_tracks_at_batch_limit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = StaticTokenProvider::new("token-1", "token-2");
    let result = session(&provider, &server.uri())
        .remove_tracks("p1", &track_uris(100))
        .await;

    assert!(
        matches!(result, Err(ApiServiceError::BatchTooLarge)),
        "expected BatchTooLarge, got {result:?}"
    );
}
