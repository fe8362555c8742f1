#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

/// Secret the spawned server signs and verifies tokens with
pub const JWT_SECRET: &str = "kanban-integration-secret";

/// Request body limit the spawned server runs with
pub const MAX_BODY_BYTES: usize = 64 * 1024;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_kanban-api"));
        cmd.env("KANBAN_API_PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("JWT_SECRET", JWT_SECRET)
            .env("SCHEDULER_ENABLED", "false")
            .env("DATABASE_CONNECTION_TIMEOUT", "3")
            .env("DATABASE_RUN_MIGRATIONS", "true")
            .env("API_MAX_REQUEST_SIZE_BYTES", MAX_BODY_BYTES.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // DATABASE_URL is inherited when present; without it every database
        // route answers 503 and the tests below still hold
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/v1/status", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(20)).await?;
    Ok(server)
}

/// HS256 token for `user_id`, signed with the server's secret
pub fn token_for(user_id: uuid::Uuid, expires_in_secs: i64) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": user_id,
        "email": "integration@example.com",
        "user_type": "staff",
        "iat": now,
        "exp": now + expires_in_secs,
    });
    let key = jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes());
    Ok(jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &key)?)
}

/// Postgres URL the spawned server inherits, if any (`.env` included)
pub fn database_url() -> Option<String> {
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

/// Server for tests that need Postgres; `None` (with a note) when no database is configured
pub async fn db_server() -> Result<Option<&'static TestServer>> {
    if database_url().is_none() {
        eprintln!("DATABASE_URL not set, skipping database-backed test");
        return Ok(None);
    }
    Ok(Some(ensure_server().await?))
}

/// Authenticated client for one freshly registered user
pub struct Api {
    client: reqwest::Client,
    base_url: String,
    token: String,
    pub user_id: Uuid,
}

impl Api {
    pub async fn register(server: &TestServer, name: &str) -> Result<Self> {
        let client = reqwest::Client::new();
        let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4().simple());
        let res = client
            .post(server.url("/v1/auth/register"))
            .json(&json!({"name": name, "email": email, "password": "secret123"}))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED, "register failed");
        let body = res.json::<Value>().await?;

        let user_id = body["data"]["user"]["id"]
            .as_str()
            .context("register response missing user id")?
            .parse()?;
        let token = body["data"]["token"]
            .as_str()
            .context("register response missing token")?
            .to_string();

        Ok(Self { client, base_url: server.base_url.clone(), token, user_id })
    }

    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.send(Method::DELETE, path, None).await
    }

    /// `data.id` of a successful create
    pub async fn create(&self, path: &str, body: Value) -> Result<Uuid> {
        let (status, body) = self.post(path, body).await?;
        assert!(status.is_success(), "POST {} failed with {}: {}", path, status, body);
        Ok(body["data"]["id"].as_str().context("create response missing id")?.parse()?)
    }

    pub async fn board(&self, title: &str) -> Result<Uuid> {
        self.create("/v1/boards", json!({"title": title})).await
    }

    pub async fn list(&self, board_id: Uuid, title: &str) -> Result<Uuid> {
        self.create("/v1/lists", json!({"boardId": board_id, "title": title})).await
    }

    pub async fn card(&self, list_id: Uuid, body: Value) -> Result<Uuid> {
        let mut body = body;
        body["listId"] = json!(list_id);
        self.create("/v1/cards", body).await
    }

    /// Board detail `data`, asserting 200
    pub async fn board_detail(&self, board_id: Uuid) -> Result<Value> {
        let (status, body) = self.get(&format!("/v1/boards/{}", board_id)).await?;
        assert_eq!(status, StatusCode::OK, "board detail: {}", body);
        Ok(body["data"].clone())
    }

    /// Promote this user to admin directly in the database
    pub async fn make_admin(&self) -> Result<()> {
        let url = database_url().context("DATABASE_URL not set")?;
        let pool = sqlx::PgPool::connect(&url).await?;
        sqlx::query("UPDATE users SET user_type = 'admin' WHERE id = $1")
            .bind(self.user_id)
            .execute(&pool)
            .await?;
        pool.close().await;
        Ok(())
    }
}

/// Ids of a JSON array of objects, in order
pub fn ids(items: &Value) -> Vec<Uuid> {
    items
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["id"].as_str().and_then(|id| id.parse().ok()))
                .collect()
        })
        .unwrap_or_default()
}

/// Uuids of a JSON array of id strings, in order
pub fn uuid_list(items: &Value) -> Vec<Uuid> {
    items
        .as_array()
        .map(|items| items.iter().filter_map(|id| id.as_str().and_then(|id| id.parse().ok())).collect())
        .unwrap_or_default()
}

/// True when no id appears twice
pub fn distinct(ids: &[Uuid]) -> bool {
    let set: std::collections::HashSet<&Uuid> = ids.iter().collect();
    set.len() == ids.len()
}

/// The list with `list_id` inside a board detail
pub fn detail_list(detail: &Value, list_id: Uuid) -> Value {
    detail["lists"]
        .as_array()
        .and_then(|lists| lists.iter().find(|l| l["id"] == json!(list_id)).cloned())
        .unwrap_or(Value::Null)
}
