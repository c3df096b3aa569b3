use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::MutationGateway;
use crate::authz::paths;
use crate::config::ConsoleConfig;
use crate::errors::{ConsoleError, ConsoleResult, ValidationItem};
use crate::models::{
    EntityId, Envelope, IdRequest, LoginRequest, Permission, PermissionCreateRequest, Role,
    RoleCreateRequest, RolePermissionLink, RoleUpdateRequest, User, UserCreateRequest,
    UserRoleLink, UserUpdateRequest,
};

/// Mutation gateway backed by the remote service's JSON API.
///
/// The session lives in a cookie, so one `HttpGateway` per signed-in operator.
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &ConsoleConfig) -> ConsoleResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .cookie_store(true)
            .build()
            .map_err(|err| ConsoleError::configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the `data` envelope of a 2xx response.
    async fn fetch<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> ConsoleResult<T> {
        let body = self.execute(operation, request).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|envelope| envelope.data)
            .map_err(|err| {
                tracing::error!(operation = %operation, "malformed response body: {}", err);
                ConsoleError::unknown(format!("malformed response body: {err}"))
            })
    }

    /// Send a request whose success body is not needed.
    async fn submit(&self, operation: &str, request: RequestBuilder) -> ConsoleResult<()> {
        self.execute(operation, request).await.map(|_| ())
    }

    async fn execute(&self, operation: &str, request: RequestBuilder) -> ConsoleResult<Vec<u8>> {
        let response = request.send().await.map_err(|err| {
            tracing::error!(operation = %operation, "request failed: {}", err);
            ConsoleError::from(err)
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(ConsoleError::from)?;

        if !status.is_success() {
            let err = classify(status, &body);
            tracing::warn!(
                operation = %operation,
                status = status.as_u16(),
                kind = err.kind(),
                "remote service rejected request"
            );
            return Err(err);
        }

        tracing::debug!(operation = %operation, status = status.as_u16(), "request ok");
        Ok(body.to_vec())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ValidationItem>,
    #[serde(default)]
    message: Option<String>,
}

/// Maps a non-2xx response onto the error taxonomy.
pub(crate) fn classify(status: StatusCode, body: &[u8]) -> ConsoleError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unexpected status").to_string());

    if status == StatusCode::UNAUTHORIZED {
        return ConsoleError::auth(message);
    }
    if status.is_client_error() && !parsed.errors.is_empty() {
        return ConsoleError::Validation(parsed.errors);
    }
    ConsoleError::unknown(format!("{}: {}", status.as_u16(), message))
}

#[async_trait]
impl MutationGateway for HttpGateway {
    async fn list_permissions(&self) -> ConsoleResult<Vec<Permission>> {
        self.fetch("list_permissions", self.client.get(self.url(paths::PERMISSIONS)))
            .await
    }

    async fn create_permission(&self, req: &PermissionCreateRequest) -> ConsoleResult<Permission> {
        self.fetch(
            "create_permission",
            self.client.post(self.url(paths::PERMISSIONS)).json(req),
        )
        .await
    }

    async fn delete_permission(&self, id: EntityId) -> ConsoleResult<()> {
        self.submit(
            "delete_permission",
            self.client.delete(self.url(paths::PERMISSIONS)).json(&IdRequest { id }),
        )
        .await
    }

    async fn list_roles(&self) -> ConsoleResult<Vec<Role>> {
        self.fetch("list_roles", self.client.get(self.url(paths::ROLES))).await
    }

    async fn get_role(&self, id: EntityId) -> ConsoleResult<Role> {
        self.fetch(
            "get_role",
            self.client.get(self.url(paths::ROLES)).query(&[("id", id)]),
        )
        .await
    }

    async fn create_role(&self, req: &RoleCreateRequest) -> ConsoleResult<Role> {
        self.fetch("create_role", self.client.post(self.url(paths::ROLES)).json(req))
            .await
    }

    async fn update_role(&self, req: &RoleUpdateRequest) -> ConsoleResult<()> {
        self.submit("update_role", self.client.patch(self.url(paths::ROLES)).json(req))
            .await
    }

    async fn delete_role(&self, id: EntityId) -> ConsoleResult<()> {
        self.submit(
            "delete_role",
            self.client.delete(self.url(paths::ROLES)).json(&IdRequest { id }),
        )
        .await
    }

    async fn delete_role_permission(&self, link: &RolePermissionLink) -> ConsoleResult<()> {
        self.submit(
            "delete_role_permission",
            self.client.delete(self.url(paths::ROLE_PERMISSIONS)).json(link),
        )
        .await
    }

    async fn list_users(&self) -> ConsoleResult<Vec<User>> {
        self.fetch("list_users", self.client.get(self.url(paths::USERS))).await
    }

    async fn get_user(&self, id: EntityId) -> ConsoleResult<User> {
        self.fetch(
            "get_user",
            self.client.get(self.url(paths::USERS)).query(&[("id", id)]),
        )
        .await
    }

    async fn create_user(&self, req: &UserCreateRequest) -> ConsoleResult<User> {
        self.fetch("create_user", self.client.post(self.url(paths::USERS)).json(req))
            .await
    }

    async fn update_user(&self, req: &UserUpdateRequest) -> ConsoleResult<()> {
        self.submit("update_user", self.client.patch(self.url(paths::USERS)).json(req))
            .await
    }

    async fn delete_user(&self, id: EntityId) -> ConsoleResult<()> {
        self.submit(
            "delete_user",
            self.client.delete(self.url(paths::USERS)).json(&IdRequest { id }),
        )
        .await
    }

    async fn delete_user_role(&self, link: &UserRoleLink) -> ConsoleResult<()> {
        self.submit(
            "delete_user_role",
            self.client.delete(self.url(paths::USER_ROLES)).json(link),
        )
        .await
    }

    async fn login(&self, req: &LoginRequest) -> ConsoleResult<User> {
        self.fetch("login", self.client.post(self.url(paths::LOGIN)).json(req))
            .await
    }

    async fn logout(&self, user_id: EntityId) -> ConsoleResult<()> {
        self.submit(
            "logout",
            self.client.post(self.url(paths::LOGOUT)).json(&IdRequest { id: user_id }),
        )
        .await
    }

    async fn current_user(&self) -> ConsoleResult<User> {
        self.fetch("current_user", self.client.get(self.url(paths::CURRENT_USER)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth() {
        let err = classify(StatusCode::UNAUTHORIZED, b"{\"message\":\"session expired\"}");
        assert!(matches!(err, ConsoleError::Auth(ref m) if m == "session expired"));
    }

    #[test]
    fn client_error_with_items_maps_to_validation() {
        let body = br#"{"errors":[{"code":"required","context":{"field":"path"}}]}"#;
        match classify(StatusCode::UNPROCESSABLE_ENTITY, body) {
            ConsoleError::Validation(items) => {
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].code, "required");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn not_found_folds_into_unknown() {
        let err = classify(StatusCode::NOT_FOUND, b"");
        assert!(matches!(err, ConsoleError::Unknown(ref m) if m.starts_with("404")));
    }

    #[test]
    fn server_error_ignores_items() {
        let body = br#"{"errors":[{"code":"boom"}],"message":"db down"}"#;
        let err = classify(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert!(matches!(err, ConsoleError::Unknown(ref m) if m == "500: db down"));
    }

    #[test]
    fn url_joins_base_and_path() {
        let gateway = HttpGateway::new(&ConsoleConfig::new("http://localhost:9000/")).unwrap();
        assert_eq!(gateway.url(paths::ROLES), "http://localhost:9000/api/roles");
    }
}
