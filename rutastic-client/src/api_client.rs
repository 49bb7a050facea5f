//! REST adapter implementing every backend trait over HTTP.
//!
//! `api_base_url` points at the web application root. Resources live under
//! `/rest`; sign-in and sign-out go through the form endpoints next to it and
//! rely on the session cookie.

use crate::config::{AuthConfig, ClientConfig};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use rutastic_core::{
    AuthorStat, BackendError, BackendResult, Identity, IdentityProvider, KudoBackend, KudoEntry,
    LeaderboardBackend, RelatedRoutesRequest, RouteBackend, RouteEdit, RouteId, RouteQuery,
    RouteSummary, SkillLevel, VoteDirection,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Separator between categories in the backend's category string.
pub const CATEGORY_SEPARATOR: &str = ", ";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Config error: {0}")]
    Config(String),
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiClientError> {
        let auth_header = build_auth_headers(&config.auth)?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> BackendResult<T>
    where
        T: DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let mut request = self
            .client
            .get(self.url(path))
            .headers(self.auth_header.clone());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await.map_err(map_reqwest_error)?;
        parse_response(response).await
    }

    /// Like `get_json`, but a 404, a 204 or an empty body mean "nothing
    /// there". The servlet resources answer `null` with 204.
    async fn get_optional_json<T>(&self, path: &str) -> BackendResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .get(self.url(path))
            .headers(self.auth_header.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        decode_optional(status, &bytes)
    }

    async fn put_action(&self, path: &str, action: &str) -> BackendResult<()> {
        let response = self
            .client
            .put(self.url(path))
            .headers(self.auth_header.clone())
            .query(&[("accion", action)])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn send_write(&self, request: reqwest::RequestBuilder) -> BackendResult<()> {
        let response = request
            .headers(self.auth_header.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn logged_user(&self) -> BackendResult<Option<Identity>> {
        let response = self
            .client
            .get(self.url("/rest/usuarios/q"))
            .headers(self.auth_header.clone())
            .query(&[("recurso", "usuariologgeado")])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Ok(None);
        }
        let body = ensure_success(response)
            .await?
            .text()
            .await
            .map_err(map_reqwest_error)?;
        // No session yields a plain string instead of a user object.
        match serde_json::from_str::<UserWire>(&body) {
            Ok(user) => Ok(Some(user.into())),
            Err(_) => Ok(None),
        }
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl RouteBackend for RestClient {
    async fn search(&self, query: &RouteQuery) -> BackendResult<Vec<RouteSummary>> {
        let params = filter_params(query);
        let routes: Vec<RouteWire> = self.get_json("/rest/rutas/filtro", Some(&params)).await?;
        debug!(count = routes.len(), "Route filter response");
        routes.into_iter().map(RouteSummary::try_from).collect()
    }

    async fn related_routes(
        &self,
        request: &RelatedRoutesRequest,
    ) -> BackendResult<Vec<RouteSummary>> {
        let path = format!("/rest/rutas/{}/similares", request.route_id);
        let params = related_params(request);
        let routes: Vec<RouteWire> = self.get_json(&path, Some(&params)).await?;
        routes.into_iter().map(RouteSummary::try_from).collect()
    }

    async fn route(&self, route_id: RouteId) -> BackendResult<RouteSummary> {
        let path = format!("/rest/rutas/{}", route_id);
        match self.get_json::<RouteWire, ()>(&path, None).await {
            Ok(route) => RouteSummary::try_from(route),
            Err(BackendError::Status { status: 404, .. }) => {
                Err(BackendError::RouteNotFound { route_id })
            }
            Err(err) => Err(err),
        }
    }

    async fn set_vote(&self, route_id: RouteId, direction: VoteDirection) -> BackendResult<()> {
        let path = format!("/rest/rutas/{}/kudos", route_id);
        self.put_action(&path, direction.as_wire_str()).await
    }

    async fn set_blocked(&self, route_id: RouteId, blocked: bool) -> BackendResult<()> {
        let path = format!("/rest/rutas/{}/estado", route_id);
        let action = if blocked { "bloquear" } else { "desbloquear" };
        self.put_action(&path, action).await
    }

    async fn update_route(&self, edit: &RouteEdit) -> BackendResult<()> {
        let path = format!("/rest/rutas/{}", edit.id);
        let body = RouteEditWire::from(edit);
        let request = self.client.put(self.url(&path)).json(&body);
        self.send_write(request)
            .await
            .map_err(|err| not_found_as_missing_route(err, edit.id))
    }

    async fn delete_route(&self, route_id: RouteId) -> BackendResult<()> {
        let path = format!("/rest/rutas/{}", route_id);
        let request = self.client.delete(self.url(&path));
        self.send_write(request)
            .await
            .map_err(|err| not_found_as_missing_route(err, route_id))
    }
}

#[async_trait]
impl LeaderboardBackend for RestClient {
    async fn top_authors_by_route_count(&self) -> BackendResult<Vec<AuthorStat>> {
        let stats: Vec<UserStatWire> = self
            .get_json("/rest/usuarios/estadisticas", Some(&[("e", "top5UsuariosPorTopRutas")]))
            .await?;
        Ok(stats.into_iter().map(AuthorStat::from).collect())
    }

    async fn top_authors_by_avg_rating(&self) -> BackendResult<Vec<AuthorStat>> {
        let stats: Vec<UserStatWire> = self
            .get_json("/rest/usuarios/estadisticas", Some(&[("e", "top5UsuariosPorMediaKudos")]))
            .await?;
        Ok(stats.into_iter().map(AuthorStat::from).collect())
    }

    async fn top_routes_this_week(&self) -> BackendResult<Vec<RouteSummary>> {
        let routes: Vec<RouteWire> = self
            .get_json("/rest/rutas/estadisticas", Some(&[("e", "topRutasSemanal")]))
            .await?;
        routes.into_iter().map(RouteSummary::try_from).collect()
    }

    async fn top_routes_this_month(&self) -> BackendResult<Vec<RouteSummary>> {
        let routes: Vec<RouteWire> = self
            .get_json("/rest/rutas/estadisticas", Some(&[("e", "topRutasMensual")]))
            .await?;
        routes.into_iter().map(RouteSummary::try_from).collect()
    }
}

#[async_trait]
impl KudoBackend for RestClient {
    async fn votes_of(&self, username: &str) -> BackendResult<Vec<KudoEntry>> {
        let path = format!("/rest/kudos/{}", username);
        let entries: Vec<KudoEntryWire> = self.get_json::<_, ()>(&path, None).await?;
        Ok(entries.into_iter().map(KudoEntry::from).collect())
    }

    async fn vote_of(
        &self,
        username: &str,
        route_id: RouteId,
    ) -> BackendResult<Option<KudoEntry>> {
        let path = format!("/rest/kudos/{}/{}", username, route_id);
        let entry: Option<KudoEntryWire> = self.get_optional_json(&path).await?;
        Ok(entry.map(KudoEntry::from))
    }
}

#[async_trait]
impl IdentityProvider for RestClient {
    async fn current_session(&self) -> BackendResult<Option<Identity>> {
        self.logged_user().await
    }

    async fn sign_in(&self, username: &str, password: &str) -> BackendResult<Identity> {
        let response = self
            .client
            .post(self.url("/Login.do"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await?;
        // A failed login re-renders the form with 200, so ask who is signed in.
        self.logged_user()
            .await?
            .ok_or(BackendError::Unauthenticated)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        let response = self
            .client
            .get(self.url("/Logout.do"))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        ensure_success(response).await.map(|_| ())
    }

    async fn delete_account(&self, username: &str) -> BackendResult<()> {
        let path = format!("/rest/usuarios/{}", username);
        self.send_write(self.client.delete(self.url(&path))).await
    }
}

/// Query string for the route filter endpoint. Open bounds and empty fields
/// are left out.
pub fn filter_params(query: &RouteQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("ordenarPorKudos", query.ordering.as_wire_str().to_string()),
        ("ocultarRutasBloq", query.hide_blocked.to_string()),
        ("mostrarMisrutas", query.only_mine.to_string()),
    ];
    if let Some(text) = query.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        params.push(("buscarTexto", text.to_string()));
    }
    if let Some(min_kudos) = query.min_kudos {
        params.push(("kudosMinimos", min_kudos.to_string()));
    }
    if let Some(difficulty) = query.difficulty {
        params.push(("filtroDificultad", difficulty.filter_code().to_string()));
    }
    if let Some(author) = query.author_filter() {
        params.push(("filtrarUsuario", author.to_string()));
    }
    if let Some(min) = query.distance.min {
        params.push(("distanciaMinima", min.to_string()));
    }
    if let Some(max) = query.distance.max {
        params.push(("distanciaMaxima", max.to_string()));
    }
    if let Some(min) = query.duration.min {
        params.push(("duracionMinima", min.to_string()));
    }
    if let Some(max) = query.duration.max {
        params.push(("duracionMaxima", max.to_string()));
    }
    if !query.categories.is_empty() {
        let joined: Vec<&str> = query.categories.iter().map(String::as_str).collect();
        params.push(("categorias", joined.join(CATEGORY_SEPARATOR)));
    }
    params
}

/// Query string for the similar-routes endpoint.
pub fn related_params(request: &RelatedRoutesRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![("por", request.similarity.as_wire_str().to_string())];
    if let Some(limit) = request.limit {
        params.push(("limite", limit.to_string()));
    }
    if let Some(delta) = request.distance_delta {
        params.push(("deltaDistancia", delta.to_string()));
    }
    params
}

fn build_auth_headers(auth: &AuthConfig) -> Result<HeaderMap, ApiClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = &auth.api_key {
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    if let Some(token) = &auth.bearer_token {
        let value = format!("Bearer {}", token);
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&value).map_err(|e| ApiClientError::Config(e.to_string()))?,
        );
    }
    Ok(headers)
}

fn map_reqwest_error(err: reqwest::Error) -> BackendError {
    if err.is_decode() {
        BackendError::Decode {
            reason: err.to_string(),
        }
    } else {
        BackendError::transport(err.to_string())
    }
}

async fn ensure_success(response: reqwest::Response) -> BackendResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(BackendError::Unauthenticated);
    }
    let text = response.text().await.map_err(map_reqwest_error)?;
    let message = serde_json::from_str::<ApiErrorWire>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(BackendError::status(status.as_u16(), message))
}

fn not_found_as_missing_route(err: BackendError, route_id: RouteId) -> BackendError {
    match err {
        BackendError::Status { status: 404, .. } => BackendError::RouteNotFound { route_id },
        other => other,
    }
}

async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> BackendResult<T> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
        reason: e.to_string(),
    })
}

fn decode_optional<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> BackendResult<Option<T>> {
    if status == StatusCode::NO_CONTENT || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body).map_err(|e| BackendError::Decode {
        reason: e.to_string(),
    })
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteWire {
    id: i64,
    created_by_user: String,
    title: String,
    #[serde(default)]
    distance: u32,
    #[serde(default)]
    duration: u32,
    #[serde(default)]
    elevation: u32,
    #[serde(default)]
    categories: String,
    skill_level: String,
    #[serde(default)]
    kudos: i64,
    #[serde(default)]
    blocked: bool,
}

impl TryFrom<RouteWire> for RouteSummary {
    type Error = BackendError;

    fn try_from(wire: RouteWire) -> Result<Self, Self::Error> {
        let difficulty =
            SkillLevel::from_wire_str(&wire.skill_level).map_err(|e| BackendError::Decode {
                reason: format!("route {}: {}", wire.id, e),
            })?;
        let categories: BTreeSet<String> = wire
            .categories
            .split(CATEGORY_SEPARATOR.trim())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        Ok(RouteSummary {
            id: RouteId::new(wire.id),
            title: wire.title,
            distance: wire.distance,
            elevation: wire.elevation,
            duration: wire.duration,
            difficulty,
            categories,
            author: wire.created_by_user,
            kudos: wire.kudos,
            blocked: wire.blocked,
        })
    }
}

/// Body of `PUT /rest/rutas/{id}`. Author, balance and blocked state are
/// kept by the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteEditWire<'a> {
    id: i64,
    title: &'a str,
    description: &'a str,
    distance: u32,
    duration: u32,
    elevation: u32,
    categories: String,
    skill_level: &'static str,
}

impl<'a> From<&'a RouteEdit> for RouteEditWire<'a> {
    fn from(edit: &'a RouteEdit) -> Self {
        let categories: Vec<&str> = edit.categories.iter().map(String::as_str).collect();
        Self {
            id: edit.id.as_i64(),
            title: edit.title.trim(),
            description: edit.description.trim(),
            distance: edit.distance,
            duration: edit.duration,
            elevation: edit.elevation,
            categories: categories.join(CATEGORY_SEPARATOR),
            skill_level: edit.difficulty.as_wire_str(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KudoEntryWire {
    user: String,
    route: i64,
    modifier: i8,
    #[serde(default)]
    submission_date: Option<i64>,
}

impl From<KudoEntryWire> for KudoEntry {
    fn from(wire: KudoEntryWire) -> Self {
        Self {
            username: wire.user,
            route_id: RouteId::new(wire.route),
            modifier: wire.modifier.clamp(-1, 1),
            submitted_at: wire
                .submission_date
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserStatWire {
    username: String,
    stat: f32,
}

impl From<UserStatWire> for AuthorStat {
    fn from(wire: UserStatWire) -> Self {
        Self {
            username: wire.username,
            stat: wire.stat,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserWire {
    username: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserWire> for Identity {
    fn from(wire: UserWire) -> Self {
        Self {
            username: wire.username,
            email: wire.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorWire {
    #[serde(alias = "mensaje")]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rutastic_core::{BoundRange, KudoOrdering, Similarity};

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_filter_params_defaults() {
        let params = filter_params(&RouteQuery::all());
        assert_eq!(param(&params, "ordenarPorKudos"), Some("no-ordenar"));
        assert_eq!(param(&params, "ocultarRutasBloq"), Some("false"));
        assert_eq!(param(&params, "mostrarMisrutas"), Some("false"));
        assert_eq!(param(&params, "buscarTexto"), None);
        assert_eq!(param(&params, "distanciaMinima"), None);
        assert_eq!(param(&params, "categorias"), None);
    }

    #[test]
    fn test_filter_params_full_query() {
        let query = RouteQuery::all()
            .with_text("  lagos;cumbres ")
            .with_author("ana")
            .with_category("trail")
            .with_category("montaña")
            .with_distance(BoundRange::between(1000, 5000))
            .with_duration(BoundRange::new(None, Some(90)))
            .with_difficulty(SkillLevel::Medium)
            .with_ordering(KudoOrdering::Descending)
            .with_min_kudos(2)
            .hiding_blocked();

        let params = filter_params(&query);
        assert_eq!(param(&params, "buscarTexto"), Some("lagos;cumbres"));
        assert_eq!(param(&params, "filtrarUsuario"), Some("ana"));
        assert_eq!(param(&params, "categorias"), Some("montaña, trail"));
        assert_eq!(param(&params, "distanciaMinima"), Some("1000"));
        assert_eq!(param(&params, "distanciaMaxima"), Some("5000"));
        assert_eq!(param(&params, "duracionMinima"), None);
        assert_eq!(param(&params, "duracionMaxima"), Some("90"));
        assert_eq!(param(&params, "filtroDificultad"), Some("2"));
        assert_eq!(param(&params, "ordenarPorKudos"), Some("descendentes"));
        assert_eq!(param(&params, "kudosMinimos"), Some("2"));
        assert_eq!(param(&params, "ocultarRutasBloq"), Some("true"));
    }

    #[test]
    fn test_related_params_omit_missing_fields() {
        let request = RelatedRoutesRequest {
            route_id: RouteId::new(4),
            similarity: Similarity::SkillLevel,
            limit: Some(3),
            distance_delta: None,
        };
        let params = related_params(&request);
        assert_eq!(param(&params, "por"), Some("dificultad"));
        assert_eq!(param(&params, "limite"), Some("3"));
        assert_eq!(param(&params, "deltaDistancia"), None);
    }

    #[test]
    fn test_route_wire_conversion() {
        let json = r#"{
            "id": 7,
            "createdByUser": "ana",
            "title": "Ridge loop",
            "description": "ignored",
            "distance": 2000,
            "duration": 80,
            "elevation": 300,
            "creationDate": "2020-01-01",
            "categories": "trail, montaña",
            "skillLevel": "media",
            "kudos": -2,
            "blocked": true
        }"#;
        let wire: RouteWire = serde_json::from_str(json).expect("route should decode");
        let route = RouteSummary::try_from(wire).expect("route should convert");

        assert_eq!(route.id, RouteId::new(7));
        assert_eq!(route.author, "ana");
        assert_eq!(route.difficulty, SkillLevel::Medium);
        assert_eq!(route.kudos, -2);
        assert!(route.blocked);
        assert!(route.categories.contains("trail"));
        assert!(route.categories.contains("montaña"));
        assert_eq!(route.categories.len(), 2);
    }

    #[test]
    fn test_unknown_skill_level_is_decode_error() {
        let json = r#"{"id": 1, "createdByUser": "a", "title": "t", "skillLevel": "extreme"}"#;
        let wire: RouteWire = serde_json::from_str(json).expect("route should decode");
        assert!(matches!(
            RouteSummary::try_from(wire),
            Err(BackendError::Decode { .. })
        ));
    }

    #[test]
    fn test_route_edit_wire_body() {
        let mut edit = RouteEdit::from_route(
            &RouteSummary {
                id: RouteId::new(7),
                title: " Ridge loop ".to_string(),
                distance: 2000,
                elevation: 300,
                duration: 80,
                difficulty: SkillLevel::Medium,
                categories: ["trail", "montaña"].iter().map(|c| c.to_string()).collect(),
                author: "ana".to_string(),
                kudos: 4,
                blocked: false,
            },
            "Pinar y arroyo",
        );
        edit.distance = 2500;

        let body = serde_json::to_value(RouteEditWire::from(&edit)).expect("body should encode");

        assert_eq!(body["id"], 7);
        assert_eq!(body["title"], "Ridge loop");
        assert_eq!(body["description"], "Pinar y arroyo");
        assert_eq!(body["distance"], 2500);
        assert_eq!(body["skillLevel"], "media");
        assert_eq!(body["categories"], "montaña, trail");
        assert!(body.get("kudos").is_none());
        assert!(body.get("createdByUser").is_none());
    }

    #[test]
    fn test_not_found_write_maps_to_missing_route() {
        let err = not_found_as_missing_route(BackendError::status(404, "gone"), RouteId::new(3));
        assert!(matches!(
            err,
            BackendError::RouteNotFound { route_id } if route_id == RouteId::new(3)
        ));
        let err = not_found_as_missing_route(BackendError::Unauthenticated, RouteId::new(3));
        assert!(matches!(err, BackendError::Unauthenticated));
    }

    #[test]
    fn test_kudo_entry_wire_conversion() {
        let json = r#"{"user": "ana", "route": 3, "modifier": -1, "submissionDate": 1600000000000}"#;
        let wire: KudoEntryWire = serde_json::from_str(json).expect("entry should decode");
        let entry = KudoEntry::from(wire);
        assert_eq!(entry.route_id, RouteId::new(3));
        assert_eq!(entry.modifier, -1);
        assert!(entry.submitted_at.is_some());
    }

    #[test]
    fn test_no_content_is_no_vote() {
        let decoded: Option<KudoEntryWire> =
            decode_optional(StatusCode::NO_CONTENT, b"").expect("204 should decode");
        assert!(decoded.is_none());

        let decoded: Option<KudoEntryWire> =
            decode_optional(StatusCode::OK, b"  \n").expect("blank body should decode");
        assert!(decoded.is_none());

        let decoded: Option<KudoEntryWire> =
            decode_optional(StatusCode::OK, b"null").expect("null should decode");
        assert!(decoded.is_none());
    }

    #[test]
    fn test_optional_body_with_entry_decodes() {
        let body = br#"{"user": "ana", "route": 3, "modifier": 1}"#;
        let decoded: Option<KudoEntryWire> =
            decode_optional(StatusCode::OK, body).expect("entry should decode");
        assert_eq!(decoded.map(|w| KudoEntry::from(w).modifier), Some(1));

        let broken: BackendResult<Option<KudoEntryWire>> = decode_optional(StatusCode::OK, b"{");
        assert!(matches!(broken, Err(BackendError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_vote_of_treats_no_content_as_never_voted() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind local listener");
        let addr = listener.local_addr().expect("local addr");
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n")
                .await
                .expect("write response");
        });

        let config = ClientConfig::from_toml(&format!(
            r#"
            api_base_url = "http://{}"
            request_timeout_ms = 2000
            related_routes_limit = 3
            stale_responses = "discard_superseded"
            persistence_path = "tmp/rutastic.json"
            log_filter = "info"

            [auth]
            "#,
            addr
        ))
        .expect("config should parse");
        let client = RestClient::new(&config).expect("client should build");

        let vote = client.vote_of("ana", RouteId::new(3)).await;
        assert_eq!(vote, Ok(None));
        server.await.expect("server task");
    }

    #[test]
    fn test_auth_headers() {
        let headers = build_auth_headers(&AuthConfig {
            api_key: Some("k".to_string()),
            bearer_token: Some("t".to_string()),
        })
        .expect("headers should build");
        assert_eq!(headers.get("x-api-key").map(|v| v.as_bytes()), Some(&b"k"[..]));
        assert_eq!(
            headers.get("authorization").map(|v| v.as_bytes()),
            Some(&b"Bearer t"[..])
        );
    }
}
