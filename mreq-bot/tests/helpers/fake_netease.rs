//! Local stand-in for a NeteaseCloudMusicApi service
//!
//! Serves canned JSON on an ephemeral port. Song 186016 is playable only at
//! `higher` (Standard) and only with the cookie `MUSIC_U=vip`; the keyword
//! `boom` makes /search fail with 500.

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::collections::HashMap;

pub const VIP_COOKIE: &str = "MUSIC_U=vip";

async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("keywords").map(String::as_str) == Some("boom") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    if params.get("type").map(String::as_str) != Some("1") {
        return (StatusCode::BAD_REQUEST, "type must be 1").into_response();
    }

    let limit: usize = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(30);

    let songs: Vec<_> = [
        json!({
            "id": 186016,
            "name": "晴天",
            "artists": [{"id": 6452, "name": "周杰伦"}],
            "album": {"id": 18905, "name": "叶惠美"},
            "duration": 269000
        }),
        json!({
            "id": 29822014,
            "name": "晴天 (Live)",
            "artists": [{"name": "周杰伦"}, {"name": "五月天"}],
            "album": null,
            "duration": 301000
        }),
    ]
    .into_iter()
    .take(limit)
    .collect();

    Json(json!({ "result": { "songs": songs, "songCount": 2 }, "code": 200 })).into_response()
}

async fn song_detail(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    match params.get("ids").map(String::as_str) {
        Some("186016") => Json(json!({
            "songs": [{
                "id": 186016,
                "name": "晴天",
                "ar": [{"name": "周杰伦"}],
                "al": {"name": "叶惠美", "picUrl": "https://p2.music.126.net/qingtian.jpg"},
                "dt": 269000
            }],
            "code": 200
        })),
        _ => Json(json!({ "songs": [], "code": 200 })),
    }
}

async fn song_url(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let vip = params.get("cookie").map(String::as_str) == Some(VIP_COOKIE);
    let standard = params.get("level").map(String::as_str) == Some("higher");
    let playable = params.get("id").map(String::as_str) == Some("186016") && vip && standard;

    let url = playable.then(|| "https://m701.music.126.net/186016.mp3".to_string());
    let code = if playable { 200 } else { 404 };
    Json(json!({ "data": [{ "id": 186016, "url": url, "code": code }] }))
}

/// Start the fake service; returns its base URL
pub async fn spawn_fake_netease() -> String {
    let app = Router::new()
        .route("/search", get(search))
        .route("/song/detail", get(song_detail))
        .route("/song/url/v1", get(song_url));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake catalogue");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fake catalogue failed");
    });

    format!("http://{}", addr)
}
