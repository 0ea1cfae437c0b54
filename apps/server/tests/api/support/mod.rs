
use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use carebase::{api::create_router, db::MemoryRecordStore, AppState, Config};
use futures::FutureExt as _;
use sqlx::Connection as _;
use std::sync::Arc;
use tower::ServiceExt as _;
use url::Url;
use uuid::Uuid;

// Re-export commonly used items
pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mailbox::RecordingMailer;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailbox: Arc<RecordingMailer>,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {}).await
    }

    pub async fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let shared = shared::shared().await?;
        let mut config = shared.base_config.clone();
        configure(&mut config);

        let mailbox = Arc::new(RecordingMailer::default());
        let state = AppState::with_store(
            config,
            Arc::new(MemoryRecordStore::new()),
            mailbox.clone(),
        );
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            mailbox,
        })
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request_with_extra_headers(method, path_and_query, body, &[])
            .await
    }

    pub async fn request_with_extra_headers(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Bytes>,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .body(match body {
                Some(bytes) => Body::from(bytes),
                None => Body::empty(),
            })
            .context("build request")?;

        let mut request = request;
        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }

    /// Send a JSON body and decode the JSON reply.
    pub async fn json(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> anyhow::Result<(StatusCode, serde_json::Value)> {
        let body = body.map(to_json_body).transpose()?;
        let (status, _headers, bytes) = self.request(method, path, body).await?;
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).context("decode response JSON")?
        };
        Ok((status, value))
    }

    /// Register a patient and return its id and medical record number.
    pub async fn register(&self, email: &str) -> anyhow::Result<RegisteredPatient> {
        let (status, body) = self
            .json(Method::POST, "/api/register", Some(&registration(email)))
            .await?;
        assert_status(status, StatusCode::CREATED, "register");

        let user = &assert_success(&body)["user"];
        Ok(RegisteredPatient {
            id: user["id"].as_str().context("user.id")?.to_string(),
            medical_record_number: user["medicalRecordNumber"]
                .as_str()
                .context("user.medicalRecordNumber")?
                .to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RegisteredPatient {
    pub id: String,
    pub medical_record_number: String,
}

pub async fn with_test_app<F>(f: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    with_test_app_with_config(|_| {}, f).await
}

pub async fn with_test_app_with_config<C, F>(configure: C, f: F) -> anyhow::Result<()>
where
    C: FnOnce(&mut Config),
    F: for<'a> FnOnce(
        &'a TestApp,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let app = TestApp::new_with_config(configure).await?;
    f(&app).await
}

/// A throwaway PostgreSQL schema, dropped by [`with_test_schema`].
pub struct TestSchema {
    pub database_url: String,
    schema: String,
    admin_database_url: String,
}

impl TestSchema {
    async fn create(admin_database_url: &str) -> anyhow::Result<Self> {
        let schema = format!("test_{}", Uuid::new_v4().simple());
        let mut admin_conn = sqlx::PgConnection::connect(admin_database_url)
            .await
            .context("connect admin db for schema create")?;
        sqlx::query(&format!(r#"CREATE SCHEMA "{}""#, schema))
            .execute(&mut admin_conn)
            .await
            .context("create test schema")?;

        Ok(Self {
            database_url: with_search_path(admin_database_url, &schema)?,
            schema,
            admin_database_url: admin_database_url.to_string(),
        })
    }

    async fn cleanup(self) -> anyhow::Result<()> {
        let mut admin_conn = sqlx::PgConnection::connect(&self.admin_database_url)
            .await
            .context("connect admin db for schema drop")?;
        sqlx::query(&format!(r#"DROP SCHEMA "{}" CASCADE"#, self.schema))
            .execute(&mut admin_conn)
            .await
            .context("drop test schema")?;
        Ok(())
    }
}

/// Run `f` against a fresh schema when `database.test_database_url` is set.
///
/// Returns `Ok(false)` without running anything otherwise.
pub async fn with_test_schema<F>(f: F) -> anyhow::Result<bool>
where
    F: for<'a> FnOnce(
        &'a TestSchema,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + 'a>,
    >,
{
    let shared = shared::shared().await?;
    let Some(admin_url) = shared.base_config.database.test_database_url.clone() else {
        eprintln!("database.test_database_url not set; skipping PostgreSQL test");
        return Ok(false);
    };

    let schema = TestSchema::create(&admin_url).await?;
    let result = std::panic::AssertUnwindSafe(f(&schema)).catch_unwind().await;
    let cleanup_result = schema.cleanup().await;

    if let Err(e) = cleanup_result {
        eprintln!("test schema cleanup failed: {e:?}");
    }

    match result {
        Ok(r) => r.map(|()| true),
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

fn with_search_path(database_url: &str, schema: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(database_url).context("parse database URL")?;
    url.query_pairs_mut()
        .append_pair("options", &format!("-c search_path={}", schema));
    Ok(url.to_string())
}
