//! HTTP round trips against a router served on an ephemeral port.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use reqwest::{Client, Method, StatusCode};
use rstest::rstest;
use serde_json::{Value, json};
use shinobi_config::DatabaseLocation;
use shinobid::http::{AppState, REQUEST_ID_HEADER, router};
use shinobid::store::Store;

struct TestServer {
    address: SocketAddr,
    client: Client,
}

impl TestServer {
    async fn start() -> Result<Self> {
        Self::start_with_prefix("/api/v1").await
    }

    async fn start_with_prefix(prefix: &str) -> Result<Self> {
        let store = Store::open(&DatabaseLocation::Memory)?;
        store.migrate()?;
        let app = router(AppState::new(Arc::new(store), "Shinobi Registry"), prefix);
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server failed");
        });
        Ok(Self {
            address,
            client: Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.address)
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };
        Ok((status, value))
    }

    async fn create_character(&self, name: &str, village: &str) -> Result<i64> {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/characters/",
                Some(json!({ "name": name, "village": village })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().ok_or_else(|| anyhow::anyhow!("missing id in {body}"))
    }
}

#[tokio::test]
async fn root_and_health_endpoints_report_status() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = server.send(Method::GET, "/", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "app_name": "Shinobi Registry", "version": "1.0.0" }));

    let (status, body) = server.send(Method::GET, "/health", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert!(body["system"]["cpu_usage"].is_number());
    assert!(body["system"]["memory_usage"].is_number());

    let (status, body) = server.send(Method::GET, "/health/db", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy", "database": "connected" }));
    Ok(())
}

#[tokio::test]
async fn character_lifecycle() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, created) = server
        .send(
            Method::POST,
            "/api/v1/characters",
            Some(json!({ "name": "Naruto Uzumaki", "village": "Konoha", "rank": "Genin" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["rank"], "Genin");

    let path = format!("/api/v1/characters/{id}");
    let (status, patched) = server
        .send(Method::PATCH, &path, Some(json!({ "rank": "Hokage" })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["rank"], "Hokage");
    assert_eq!(patched["name"], "Naruto Uzumaki");

    let (status, cleared) = server
        .send(Method::PATCH, &path, Some(json!({ "rank": null })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["rank"], Value::Null);

    let (status, _) = server.send(Method::DELETE, &path, None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = server.send(Method::GET, &path, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Character not found", "request_id": null }));
    Ok(())
}

#[tokio::test]
async fn listing_paginates_and_searches() -> Result<()> {
    let server = TestServer::start().await?;
    for (name, village) in [
        ("Sasuke", "Konoha"),
        ("Gaara", "Suna"),
        ("Sakura", "Konoha"),
        ("Kankuro", "Suna"),
        ("Temari", "Suna"),
    ] {
        server.create_character(name, village).await?;
    }

    let (status, page) = server
        .send(Method::GET, "/api/v1/characters/?page=2&size=2", None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["pages"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["has_next"], true);
    assert_eq!(page["has_prev"], true);
    let names: Vec<&str> = page["items"]
        .as_array()
        .expect("items")
        .iter()
        .filter_map(|item| item["name"].as_str())
        .collect();
    assert_eq!(names, ["Sakura", "Kankuro"]);

    let (status, page) = server
        .send(Method::GET, "/api/v1/characters?search=suna", None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    Ok(())
}

#[rstest]
#[case("/api/v1/characters/?page=0", "page")]
#[case("/api/v1/characters/?size=101", "size")]
#[case("/api/v1/characters/?search=ab", "search")]
#[case("/api/v1/characters/abc", "character_id")]
#[case("/api/v1/jutsus/0", "jutsu_id")]
#[tokio::test]
async fn invalid_requests_use_the_validation_envelope(
    #[case] path: &str,
    #[case] field: &str,
) -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server.send(Method::GET, path, None).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errors"][0]["field"], field);
    assert!(body["errors"][0]["type"].is_string());
    assert_eq!(body["path"], path.split('?').next().unwrap_or(path));
    Ok(())
}

#[tokio::test]
async fn invalid_bodies_report_every_field() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server
        .send(
            Method::POST,
            "/api/v1/jutsus/",
            Some(json!({ "name": "", "chakra_cost": -5 })),
        )
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|error| error["field"].as_str())
        .collect();
    assert_eq!(fields, ["name", "type", "chakra_cost"]);
    Ok(())
}

#[tokio::test]
async fn jutsus_attach_filter_and_orphan() -> Result<()> {
    let server = TestServer::start().await?;
    let itachi = server.create_character("Itachi", "Konoha").await?;
    let kisame = server.create_character("Kisame", "Kiri").await?;

    let (status, fireball) = server
        .send(
            Method::POST,
            &format!("/api/v1/characters/{itachi}/jutsus"),
            Some(json!({ "name": "Fireball", "type": "Ninjutsu", "chakra_cost": 20 })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(fireball["character_id"], itachi);
    assert_eq!(fireball["type"], "Ninjutsu");

    let (status, _) = server
        .send(
            Method::POST,
            "/api/v1/jutsus",
            Some(json!({
                "name": "Water Shark Bomb",
                "type": "Ninjutsu",
                "chakra_cost": 40,
                "character_id": kisame,
            })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = server
        .send(
            Method::GET,
            &format!("/api/v1/jutsus/?character_id={itachi}"),
            None,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Fireball");

    let (status, _) = server
        .send(Method::DELETE, &format!("/api/v1/characters/{itachi}"), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let fireball_id = fireball["id"].as_i64().expect("id");
    let (status, orphan) = server
        .send(Method::GET, &format!("/api/v1/jutsus/{fireball_id}"), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orphan["character_id"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn unknown_owners_are_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let jutsu = json!({ "name": "Rasengan", "type": "Ninjutsu", "chakra_cost": 30 });

    let (status, body) = server
        .send(Method::POST, "/api/v1/characters/99/jutsus", Some(jutsu.clone()))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Character not found");

    let mut orphaned = jutsu.clone();
    orphaned["character_id"] = json!(99);
    let (status, body) = server
        .send(Method::POST, "/api/v1/jutsus/", Some(orphaned))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Could not create jutsu");

    let (status, created) = server
        .send(Method::POST, "/api/v1/jutsus/", Some(jutsu))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("id");
    let (status, body) = server
        .send(
            Method::PATCH,
            &format!("/api/v1/jutsus/{id}"),
            Some(json!({ "character_id": 99 })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Character not found");

    let (status, body) = server
        .send(Method::DELETE, "/api/v1/jutsus/12345", None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Jutsu not found");
    Ok(())
}

#[tokio::test]
async fn request_ids_are_echoed_or_generated() -> Result<()> {
    let server = TestServer::start().await?;

    let response = server
        .client
        .get(server.url("/api/v1/characters/7"))
        .header(REQUEST_ID_HEADER, "trace-42")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42");
    let body: Value = response.json().await?;
    assert_eq!(body["request_id"], "trace-42");

    let response = server.client.get(server.url("/")).send().await?;
    let generated = response.headers()[REQUEST_ID_HEADER].to_str()?;
    assert!(!generated.is_empty());
    Ok(())
}

#[tokio::test]
async fn preflight_requests_are_answered_with_cors_grants() -> Result<()> {
    let server = TestServer::start().await?;
    let response = server
        .client
        .request(Method::OPTIONS, server.url("/api/v1/characters/"))
        .header("origin", "https://konoha.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://konoha.example"
    );
    assert_eq!(headers["access-control-allow-headers"], "content-type");
    assert!(headers.contains_key("access-control-allow-methods"));
    Ok(())
}

#[tokio::test]
async fn unknown_routes_return_not_found() -> Result<()> {
    let server = TestServer::start().await?;
    let (status, body) = server.send(Method::GET, "/api/v2/scrolls", None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn empty_prefix_mounts_resources_at_the_root() -> Result<()> {
    let server = TestServer::start_with_prefix("").await?;
    let (status, body) = server
        .send(
            Method::POST,
            "/characters",
            Some(json!({ "name": "Rock Lee", "village": "Konoha" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Rock Lee");
    Ok(())
}
