use crate::models::{
    InstallableTool, InstallableToolsResponse, MountPointCheck, NavTree, ProjectContext,
};
use crate::nav::{GroupingThreshold, MountOrder};
use crate::session::{SessionCredential, DEFAULT_SESSION_COOKIE};
use futures::future::{select, Either};
use leptos::logging::warn;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Timeout,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn timeout(ms: u32) -> Self {
        Self {
            kind: ApiErrorKind::Timeout,
            message: format!("Request timed out after {ms} ms"),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    /// Only transport-level failures are worth repeating.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::Network | ApiErrorKind::Timeout)
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

pub(crate) const DEFAULT_HELP_URL: &str = "/nf/markdown_syntax_dialog";
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u32 = 10_000;
pub(crate) const DEFAULT_RENDER_RETRIES: u32 = 2;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub session_cookie: String,
    /// Fixed credential; when set the cookie is not consulted.
    pub session_token: Option<String>,
    pub help_url: String,
    pub request_timeout_ms: u32,
    pub render_retries: u32,
}

fn env_string(env: &wasm_bindgen::JsValue, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        js_sys::Reflect::get(env, &(*k).into())
            .ok()
            .and_then(|v| v.as_string())
            .filter(|s| !s.trim().is_empty())
    })
}

fn env_u32(env: &wasm_bindgen::JsValue, keys: &[&str]) -> Option<u32> {
    keys.iter().find_map(|k| {
        let v = js_sys::Reflect::get(env, &(*k).into()).ok()?;
        v.as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u32)
            .or_else(|| v.as_string().and_then(|s| s.trim().parse().ok()))
    })
}

impl EnvConfig {
    pub fn with_origin(origin: &str) -> Self {
        Self {
            api_url: origin.trim_end_matches('/').to_string(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            session_token: None,
            help_url: DEFAULT_HELP_URL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            render_retries: DEFAULT_RENDER_RETRIES,
        }
    }

    /// Read `window.ENV`, falling back to the page origin and built-in defaults.
    ///
    /// Both `API_URL` and `api_url` spellings are accepted.
    pub fn new() -> Self {
        let Some(window) = web_sys::window() else {
            return Self::with_origin("http://localhost:8080");
        };

        let origin = window
            .location()
            .origin()
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let mut cfg = Self::with_origin(&origin);

        let Some(env) = window.get("ENV") else {
            return cfg;
        };
        if env.is_undefined() || !env.is_object() {
            return cfg;
        }
        let env: wasm_bindgen::JsValue = env.into();

        if let Some(url) = env_string(&env, &["API_URL", "api_url"]) {
            cfg.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(name) = env_string(&env, &["SESSION_COOKIE", "session_cookie"]) {
            cfg.session_cookie = name;
        }
        if let Some(token) = env_string(&env, &["SESSION_TOKEN", "session_token"]) {
            cfg.session_token = Some(token);
        }
        if let Some(url) = env_string(&env, &["HELP_URL", "help_url"]) {
            cfg.help_url = url;
        }
        if let Some(ms) = env_u32(&env, &["REQUEST_TIMEOUT_MS", "request_timeout_ms"]) {
            cfg.request_timeout_ms = ms.max(1);
        }
        if let Some(n) = env_u32(&env, &["RENDER_RETRIES", "render_retries"]) {
            cfg.render_retries = n;
        }
        cfg
    }

    /// Help URLs may be given relative to the API origin.
    pub fn absolute_help_url(&self) -> String {
        if self.help_url.starts_with("http://") || self.help_url.starts_with("https://") {
            self.help_url.clone()
        } else {
            format!("{}/{}", self.api_url, self.help_url.trim_start_matches('/'))
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `{base}/{neighborhood}/{project}/`
pub(crate) fn project_url(base: &str, ctx: &ProjectContext) -> String {
    format!("{}/{}/{}/", base, ctx.neighborhood, ctx.project)
}

/// `{base}/rest/{neighborhood}/{project}/`
pub(crate) fn project_rest_url(base: &str, ctx: &ProjectContext) -> String {
    format!("{}/rest/{}/{}/", base, ctx.neighborhood, ctx.project)
}

pub(crate) fn backoff_ms(attempt: u32) -> u64 {
    let exp = attempt.saturating_sub(1).min(8);
    (250u64 << exp).min(2_000)
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MarkdownRenderRequest {
    #[serde(rename = "_session_id")]
    pub session_id: String,
    pub markdown: String,
    pub project: String,
    pub neighborhood: String,
    pub app: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct GroupingThresholdRequest {
    #[serde(rename = "_session_id")]
    pub session_id: String,
    pub grouping_threshold: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct MountPointRequest {
    #[serde(rename = "_session_id")]
    pub session_id: String,
    pub mount_point: String,
}

/// Form body for `admin/mount_order`: the credential plus `"<index>": "<mount point>"`.
pub(crate) fn mount_order_form(session_id: &str, order: &MountOrder) -> Vec<(String, String)> {
    let mut form = Vec::with_capacity(order.names.len() + 1);
    form.push(("_session_id".to_string(), session_id.to_string()));
    form.extend(order.entries());
    form
}

async fn with_timeout<T>(fut: impl Future<Output = ApiResult<T>>, timeout_ms: u32) -> ApiResult<T> {
    let timer = gloo_timers::future::TimeoutFuture::new(timeout_ms);
    futures::pin_mut!(fut);
    futures::pin_mut!(timer);
    match select(fut, timer).await {
        Either::Left((res, _)) => res,
        Either::Right(((), _)) => Err(ApiError::timeout(timeout_ms)),
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) session: SessionCredential,
    pub(crate) help_url: String,
    pub(crate) timeout_ms: u32,
    pub(crate) retries: u32,
}

impl ApiClient {
    pub fn from_config(cfg: &EnvConfig) -> Self {
        Self {
            base_url: cfg.api_url.clone(),
            session: match &cfg.session_token {
                Some(token) => SessionCredential::Fixed(token.clone()),
                None => SessionCredential::from_cookie(cfg.session_cookie.clone()),
            },
            help_url: cfg.absolute_help_url(),
            timeout_ms: cfg.request_timeout_ms,
            retries: cfg.render_retries,
        }
    }

    pub fn session_id(&self) -> String {
        self.session.resolve()
    }

    pub fn project_url(&self, ctx: &ProjectContext) -> String {
        project_url(&self.base_url, ctx)
    }

    fn rest_url(&self, ctx: &ProjectContext, path: &str) -> String {
        format!("{}{}", project_rest_url(&self.base_url, ctx), path)
    }

    /// Send one request and return its body as text.
    async fn execute(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<String> {
        let fut = async move {
            let res = req.send().await.map_err(ApiError::network)?;
            let status = res.status();
            let body = res.text().await.map_err(ApiError::network)?;

            if status.is_success() {
                Ok(body)
            } else if status.as_u16() == 401 || status.as_u16() == 403 {
                Err(ApiError::unauthorized())
            } else {
                Err(ApiError::http(status, body, ctx))
            }
        };
        with_timeout(fut, self.timeout_ms).await
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    warn!("{what} failed (attempt {attempt}): {e}");
                    gloo_timers::future::sleep(Duration::from_millis(backoff_ms(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String, ctx: &str) -> ApiResult<T> {
        let body = self
            .with_retry(ctx, || {
                let req = reqwest::Client::new().get(url.clone());
                self.execute(req, ctx)
            })
            .await?;
        serde_json::from_str(&body).map_err(ApiError::parse)
    }

    async fn post_form(&self, url: String, form: &impl Serialize, ctx: &str) -> ApiResult<String> {
        let req = reqwest::Client::new().post(url).form(form);
        self.execute(req, ctx).await
    }

    pub async fn get_nav(&self, ctx: &ProjectContext) -> ApiResult<NavTree> {
        let url = format!("{}_nav.json", self.project_url(ctx));
        self.get_json(url, "Loading navigation failed").await
    }

    pub async fn save_mount_order(&self, ctx: &ProjectContext, order: &MountOrder) -> ApiResult<()> {
        let form = mount_order_form(&self.session_id(), order);
        self.post_form(
            self.rest_url(ctx, "admin/mount_order"),
            &form,
            "Saving tool order failed",
        )
        .await
        .map(|_| ())
    }

    pub async fn configure_tool_grouping(
        &self,
        ctx: &ProjectContext,
        threshold: GroupingThreshold,
    ) -> ApiResult<()> {
        let form = GroupingThresholdRequest {
            session_id: self.session_id(),
            grouping_threshold: threshold.get(),
        };
        self.post_form(
            self.rest_url(ctx, "admin/configure_tool_grouping"),
            &form,
            "Saving grouping threshold failed",
        )
        .await
        .map(|_| ())
    }

    pub async fn check_mount_point(
        &self,
        ctx: &ProjectContext,
        mount_point: &str,
    ) -> ApiResult<MountPointCheck> {
        let form = MountPointRequest {
            session_id: self.session_id(),
            mount_point: mount_point.to_string(),
        };
        let body = self
            .post_form(
                self.rest_url(ctx, "admin/mount_point/"),
                &form,
                "Checking mount point failed",
            )
            .await?;
        serde_json::from_str(&body).map_err(ApiError::parse)
    }

    pub async fn installable_tools(&self, ctx: &ProjectContext) -> ApiResult<Vec<InstallableTool>> {
        let resp: InstallableToolsResponse = self
            .get_json(
                self.rest_url(ctx, "admin/installable_tools/"),
                "Loading installable tools failed",
            )
            .await?;
        Ok(resp.tools)
    }

    /// Render markdown server-side. The returned HTML is used as-is.
    pub async fn markdown_to_html(
        &self,
        markdown: &str,
        neighborhood: &str,
        project: &str,
        app: &str,
    ) -> ApiResult<String> {
        let form = MarkdownRenderRequest {
            session_id: self.session_id(),
            markdown: markdown.to_string(),
            project: project.to_string(),
            neighborhood: neighborhood.to_string(),
            app: app.to_string(),
        };
        let url = format!("{}/nf/markdown_to_html", self.base_url);
        self.with_retry("Rendering preview", || {
            let req = reqwest::Client::new().post(url.clone()).form(&form);
            self.execute(req, "Rendering preview failed")
        })
        .await
    }

    pub async fn help_html(&self) -> ApiResult<String> {
        self.with_retry("Loading help", || {
            let req = reqwest::Client::new().get(self.help_url.clone());
            self.execute(req, "Loading help failed")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProjectContext {
        ProjectContext {
            neighborhood: "p".to_string(),
            project: "demo".to_string(),
        }
    }

    fn client() -> ApiClient {
        let mut cfg = EnvConfig::with_origin("https://forge.example/");
        cfg.session_token = Some("sess".to_string());
        ApiClient::from_config(&cfg)
    }

    #[test]
    fn test_session_source_from_config() {
        assert_eq!(client().session, SessionCredential::Fixed("sess".to_string()));
        let c = ApiClient::from_config(&EnvConfig::with_origin("https://forge.example"));
        assert_eq!(c.session, SessionCredential::Cookie("_session_id".to_string()));
    }

    #[test]
    fn test_env_config_defaults() {
        let cfg = EnvConfig::with_origin("https://forge.example/");
        assert_eq!(cfg.api_url, "https://forge.example");
        assert_eq!(cfg.session_cookie, "_session_id");
        assert_eq!(cfg.request_timeout_ms, DEFAULT_REQUEST_TIMEOUT_MS);
        assert_eq!(
            cfg.absolute_help_url(),
            "https://forge.example/nf/markdown_syntax_dialog"
        );
    }

    #[test]
    fn test_absolute_help_url_kept() {
        let mut cfg = EnvConfig::with_origin("https://forge.example");
        cfg.help_url = "https://cdn.example/help.html".to_string();
        assert_eq!(cfg.absolute_help_url(), "https://cdn.example/help.html");
    }

    #[test]
    fn test_project_urls() {
        let c = client();
        assert_eq!(c.project_url(&ctx()), "https://forge.example/p/demo/");
        assert_eq!(
            c.rest_url(&ctx(), "admin/mount_order"),
            "https://forge.example/rest/p/demo/admin/mount_order"
        );
        assert_eq!(
            project_rest_url("https://forge.example", &ctx()),
            "https://forge.example/rest/p/demo/"
        );
    }

    #[test]
    fn test_mount_order_form_has_session_and_positions() {
        let order = MountOrder {
            level: None,
            names: vec!["B".to_string(), "A".to_string()],
        };
        let form = mount_order_form("sess", &order);
        assert_eq!(
            form,
            vec![
                ("_session_id".to_string(), "sess".to_string()),
                ("0".to_string(), "B".to_string()),
                ("1".to_string(), "A".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_request_serialization_includes_context() {
        let req = MarkdownRenderRequest {
            session_id: "sess".to_string(),
            markdown: "**hi**".to_string(),
            project: "demo".to_string(),
            neighborhood: "p".to_string(),
            app: "wiki".to_string(),
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert_eq!(v["_session_id"], "sess");
        assert_eq!(v["markdown"], "**hi**");
        assert_eq!(v["neighborhood"], "p");
        assert_eq!(v["app"], "wiki");
    }

    #[test]
    fn test_threshold_and_mount_point_requests_carry_session() {
        let t = GroupingThresholdRequest {
            session_id: "sess".to_string(),
            grouping_threshold: 4,
        };
        let v = serde_json::to_value(t).unwrap();
        assert_eq!(v, serde_json::json!({"_session_id": "sess", "grouping_threshold": 4}));

        let m = MountPointRequest {
            session_id: "sess".to_string(),
            mount_point: "wiki".to_string(),
        };
        let v = serde_json::to_value(m).unwrap();
        assert_eq!(v, serde_json::json!({"_session_id": "sess", "mount_point": "wiki"}));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert_eq!(backoff_ms(1), 250);
        assert_eq!(backoff_ms(2), 500);
        assert_eq!(backoff_ms(3), 1000);
        assert_eq!(backoff_ms(4), 2000);
        assert_eq!(backoff_ms(30), 2000);
    }

    #[test]
    fn test_retryable_kinds() {
        let e = ApiError::timeout(5);
        assert!(e.is_retryable());
        assert_eq!(e.to_string(), "Request timed out after 5 ms");
        assert!(!ApiError::unauthorized().is_retryable());
        assert!(!ApiError::parse("bad json").is_retryable());
    }
}
