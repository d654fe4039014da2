use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Credentials, DashboardApi, LoginResponse};
use crate::config::Settings;
use crate::error::{DashboardError, Result};
use crate::session::SessionContext;
use crate::types::{Bot, BotId, LogEntry, ManualOrder, MarketPoint, NewBot, Trade};

/// REST client for the bot backend.
///
/// Every call carries the client-wide deadline. Authenticated calls send the
/// session token as a bearer credential and fail locally when there is none.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    session: SessionContext,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration, session: SessionContext) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_settings(settings: &Settings, session: SessionContext) -> Result<Self> {
        Self::new(settings.api_url.clone(), settings.request_timeout(), session)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn public(&self, method: Method, path: &str) -> RequestBuilder {
        debug!("{} {}", method, path);
        self.client.request(method, self.url(path))
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self
            .session
            .token()
            .await
            .ok_or(DashboardError::Unauthenticated)?;
        Ok(self.public(method, path).bearer_auth(token))
    }

    /// Sends the request and turns any non-success status into an error.
    /// A 401 on an authenticated call means the token expired.
    async fn execute(&self, request: RequestBuilder, authenticated: bool) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = DashboardError::status(status, body);

        if authenticated && err.is_unauthorized() {
            warn!("Server rejected the session token, clearing it");
            if let Err(e) = self.session.clear().await {
                warn!("Failed to clear session: {}", e);
            }
        }
        Err(err)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.authorized(Method::GET, path).await?;
        let response = self.execute(request, true).await?;
        Self::read_json(response).await
    }

    /// Body of a mutation whose status already signalled success
    async fn read_optional_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
        let bytes = response.bytes().await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!("Ignoring unexpected mutation response body: {}", e);
                Ok(None)
            }
        }
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let request = self.authorized(Method::POST, path).await?;
        let response = self.execute(request, true).await?;
        Self::read_optional_json(response).await
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
        let request = self.public(Method::POST, "/login").json(credentials);
        let response = self.execute(request, false).await?;
        Self::read_json(response).await
    }

    async fn list_bots(&self) -> Result<Vec<Bot>> {
        self.get_json("/bots/").await
    }

    async fn get_bot(&self, id: BotId) -> Result<Bot> {
        self.get_json(&format!("/bots/{}", id)).await
    }

    async fn create_bot(&self, bot: &NewBot) -> Result<Option<Bot>> {
        let request = self.authorized(Method::POST, "/bots/").await?.json(bot);
        let response = self.execute(request, true).await?;
        Self::read_optional_json(response).await
    }

    async fn update_bot(&self, id: BotId, bot: &NewBot) -> Result<Option<Bot>> {
        let request = self
            .authorized(Method::PUT, &format!("/bots/{}", id))
            .await?
            .json(bot);
        let response = self.execute(request, true).await?;
        Self::read_optional_json(response).await
    }

    async fn delete_bot(&self, id: BotId) -> Result<()> {
        let request = self.authorized(Method::DELETE, &format!("/bots/{}", id)).await?;
        self.execute(request, true).await?;
        Ok(())
    }

    async fn start_bot(&self, id: BotId) -> Result<Option<Bot>> {
        self.post_empty(&format!("/bots/{}/start", id)).await
    }

    async fn pause_bot(&self, id: BotId) -> Result<Option<Bot>> {
        self.post_empty(&format!("/bots/{}/pause", id)).await
    }

    async fn manual_trade(&self, id: BotId, order: &ManualOrder) -> Result<serde_json::Value> {
        let request = self
            .authorized(Method::POST, &format!("/bots/{}/manual_trade", id))
            .await?
            .json(order);
        let response = self.execute(request, true).await?;
        Ok(Self::read_optional_json(response)
            .await?
            .unwrap_or(serde_json::Value::Null))
    }

    async fn list_trades(&self) -> Result<Vec<Trade>> {
        self.get_json("/trades").await
    }

    async fn list_logs(&self) -> Result<Vec<LogEntry>> {
        self.get_json("/logs").await
    }

    async fn market_history(&self) -> Result<Vec<MarketPoint>> {
        let response = self.execute(self.public(Method::GET, "/market/history"), false).await?;
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode as AxumStatus};
    use axum::response::{IntoResponse, Response as AxumResponse};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tokio_test::{assert_err, assert_ok};

    const TOKEN: &str = "abc";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }

    async fn login(Json(body): Json<Value>) -> AxumResponse {
        if body["username"] == "admin" && body["password"] == "secret" {
            Json(json!({ "token": TOKEN })).into_response()
        } else {
            AxumStatus::UNAUTHORIZED.into_response()
        }
    }

    async fn list_bots(headers: HeaderMap) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!([
            { "id": 1, "name": "BTC-Scalper", "description": "scalps", "status": "running" },
            { "id": 2, "name": "ETH-Grid", "description": null, "status": "paused" }
        ]))
        .into_response()
    }

    async fn create_bot(headers: HeaderMap, Json(body): Json<Value>) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        let bot = json!({
            "id": 3,
            "name": body["name"],
            "description": body["description"],
            "status": "paused"
        });
        (AxumStatus::CREATED, Json(bot)).into_response()
    }

    async fn delete_bot(headers: HeaderMap, Path(id): Path<u64>) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        if id == 404 {
            return (AxumStatus::NOT_FOUND, "Bot not found").into_response();
        }
        AxumStatus::NO_CONTENT.into_response()
    }

    async fn start_bot(headers: HeaderMap, Path(id): Path<u64>) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({ "id": id, "name": "BTC-Scalper", "status": "running" })).into_response()
    }

    async fn pause_bot(headers: HeaderMap) -> AxumResponse {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({ "ok": true })).into_response()
    }

    async fn logs() -> &'static str {
        "this is not json"
    }

    async fn market_history() -> Json<Value> {
        Json(json!([
            { "time": "10:00", "close": 100.0, "volume": 5.0, "rsi": null, "macd": null },
            { "time": "10:01", "close": 101.0, "volume": 7.0, "rsi": 51.2, "macd": 0.4 }
        ]))
    }

    async fn spawn_backend() -> String {
        let app = Router::new()
            .route("/login", post(login))
            .route("/bots/", get(list_bots).post(create_bot))
            .route("/bots/:id", delete(delete_bot))
            .route("/bots/:id/start", post(start_bot))
            .route("/bots/:id/pause", post(pause_bot))
            .route("/logs", get(logs))
            .route("/market/history", get(market_history));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn client(base_url: &str, token: Option<&str>) -> (HttpApi, SessionContext) {
        let session = SessionContext::in_memory();
        if let Some(token) = token {
            session.set(token.to_string()).await.unwrap();
        }
        let api = HttpApi::new(base_url, Duration::from_secs(5), session.clone()).unwrap();
        (api, session)
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, None).await;

        let response = api
            .login(&Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            })
            .await;

        assert_eq!(assert_ok!(response).token.as_deref(), Some(TOKEN));
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, None).await;

        let response = api
            .login(&Credentials {
                username: "admin".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(response, Err(DashboardError::Status { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_authenticated_call_sends_bearer_token() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;

        let bots = assert_ok!(api.list_bots().await);
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].name, "BTC-Scalper");
    }

    #[tokio::test]
    async fn test_missing_session_fails_locally() {
        let (api, _) = client("http://127.0.0.1:1", None).await;
        assert!(matches!(api.list_bots().await, Err(DashboardError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_rejected_token_clears_session() {
        let base = spawn_backend().await;
        let (api, session) = client(&base, Some("expired")).await;

        let result = api.list_bots().await;
        assert!(matches!(result, Err(DashboardError::Status { status: 401, .. })));
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_create_and_start_bot() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;

        let created = assert_ok!(api.create_bot(&NewBot::new("BTC-Scalper", "")).await).unwrap();
        assert_eq!(created.id, 3);
        assert_eq!(created.name, "BTC-Scalper");
        assert_eq!(created.description, None);

        let started = assert_ok!(api.start_bot(3).await).unwrap();
        assert_eq!(started.status, crate::types::BotStatus::Running);
    }

    #[tokio::test]
    async fn test_success_status_without_bot_body() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;

        assert_eq!(assert_ok!(api.pause_bot(1).await), None);
    }

    #[tokio::test]
    async fn test_bots_view_refreshes_after_unexpected_body() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;
        let mut view = crate::views::BotsView::new(std::sync::Arc::new(api));

        assert!(view.pause(1).await);
        assert_eq!(view.error(), None);
        assert_eq!(view.bots().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_bot_status_handling() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;

        assert_ok!(api.delete_bot(1).await);
        match api.delete_bot(404).await {
            Err(DashboardError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "Bot not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, Some(TOKEN)).await;

        assert!(matches!(api.list_logs().await, Err(DashboardError::Decode(_))));
    }

    #[tokio::test]
    async fn test_market_history_needs_no_session() {
        let base = spawn_backend().await;
        let (api, _) = client(&base, None).await;

        let points = assert_ok!(api.market_history().await);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].rsi, Some(51.2));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let (api, _) = client("http://127.0.0.1:1", Some(TOKEN)).await;
        let err = assert_err!(api.list_trades().await);
        assert!(matches!(err, DashboardError::Transport(_)));
    }
}
