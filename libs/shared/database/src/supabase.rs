use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_RANGE, CONTENT_TYPE, AUTHORIZATION},
    Method, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::{DatabaseError, DbResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user: AuthUser,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            service_role_key: config.supabase_service_role_key.clone(),
        }
    }

    fn get_headers(&self, api_key: &str, auth_token: Option<&str>) -> DbResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key)
                .map_err(|e| DatabaseError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| DatabaseError::InvalidHeader(e.to_string()))?,
            );
        }

        Ok(headers)
    }

    async fn send_raw(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<Value>,
    ) -> DbResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            error!("API error ({}): {}", status, text);
            return Err(DatabaseError::from_status(status.as_u16(), text));
        }

        Ok(response)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        body: Option<Value>,
    ) -> DbResult<String> {
        let response = self.send_raw(method, path, headers, body).await?;
        Ok(response.text().await?)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> DbResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> DbResult<T>
    where
        T: DeserializeOwned,
    {
        let mut headers = self.get_headers(&self.anon_key, auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let text = self.send(method, path, headers, body).await?;

        // PostgREST answers 201/204 with an empty body unless a representation is requested
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Array(vec![]))
                .or_else(|_| serde_json::from_value(Value::Null))?);
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// Fire a request whose response body is irrelevant.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> DbResult<()> {
        let headers = self.get_headers(&self.anon_key, auth_token)?;
        self.send(method, path, headers, body).await?;
        Ok(())
    }

    pub async fn select<T>(&self, path: &str, auth_token: Option<&str>) -> DbResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, auth_token, None).await
    }

    pub async fn select_one<T>(&self, path: &str, auth_token: Option<&str>) -> DbResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.select(path, auth_token).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row and return its stored representation.
    pub async fn insert<T>(&self, table: &str, row: Value, auth_token: Option<&str>) -> DbResult<T>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}", table);
        let result: Vec<T> = self
            .request_with_headers(Method::POST, &path, auth_token, Some(row), Some(representation()))
            .await?;

        result.into_iter().next().ok_or_else(|| DatabaseError::Api {
            status: 500,
            message: format!("Insert into {} returned no rows", table),
        })
    }

    /// Bulk insert; PostgREST accepts an array body.
    pub async fn insert_many<T>(&self, table: &str, rows: Vec<Value>, auth_token: Option<&str>) -> DbResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let path = format!("/rest/v1/{}", table);
        self.request_with_headers(Method::POST, &path, auth_token, Some(Value::Array(rows)), Some(representation()))
            .await
    }

    pub async fn update<T>(&self, path: &str, changes: Value, auth_token: Option<&str>) -> DbResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(Method::PATCH, path, auth_token, Some(changes), Some(representation()))
            .await
    }

    pub async fn delete(&self, path: &str, auth_token: Option<&str>) -> DbResult<()> {
        self.execute(Method::DELETE, path, auth_token, None).await
    }

    /// Number of rows matching a filtered path, read from `Content-Range`
    /// without transferring any rows.
    pub async fn count(&self, path: &str, auth_token: Option<&str>) -> DbResult<usize> {
        let mut headers = self.get_headers(&self.anon_key, auth_token)?;
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let separator = if path.contains('?') { '&' } else { '?' };
        let path = format!("{}{}limit=0", path, separator);

        let response = self.send_raw(Method::GET, &path, headers, None).await?;
        let range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        parse_total(&range).ok_or_else(|| DatabaseError::Api {
            status: 500,
            message: format!("Missing row count in Content-Range '{}'", range),
        })
    }

    // ==========================================================================
    // AUTH API
    // ==========================================================================

    pub async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> DbResult<(AuthUser, Option<AuthSession>)> {
        debug!("Signing up new auth user: {}", email);

        let body = json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let value: Value = self.request(Method::POST, "/auth/v1/signup", None, Some(body)).await?;

        // With auto-confirm a session is returned, otherwise only the user
        if value.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(value)?;
            return Ok((session.user.clone(), Some(session)));
        }

        let user: AuthUser = match value.get("user") {
            Some(user) => serde_json::from_value(user.clone())?,
            None => serde_json::from_value(value)?,
        };
        Ok((user, None))
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> DbResult<AuthSession> {
        debug!("Password sign-in for {}", email);

        let body = json!({ "email": email, "password": password });
        self.request(Method::POST, "/auth/v1/token?grant_type=password", None, Some(body))
            .await
    }

    pub async fn sign_out(&self, auth_token: &str) -> DbResult<()> {
        self.execute(Method::POST, "/auth/v1/logout", Some(auth_token), None).await
    }

    /// Change attributes of the signed-in auth user (`email`, `password`, `data`).
    pub async fn update_auth_user(&self, auth_token: &str, attributes: Value) -> DbResult<AuthUser> {
        self.request(Method::PUT, "/auth/v1/user", Some(auth_token), Some(attributes)).await
    }

    pub async fn update_password(&self, auth_token: &str, new_password: &str) -> DbResult<AuthUser> {
        self.update_auth_user(auth_token, json!({ "password": new_password })).await
    }

    pub async fn update_email(&self, auth_token: &str, new_email: &str) -> DbResult<AuthUser> {
        debug!("Updating auth email to {}", new_email);
        self.update_auth_user(auth_token, json!({ "email": new_email })).await
    }

    /// Create a confirmed auth user with the service role key.
    pub async fn admin_create_user(&self, email: &str, password: &str, metadata: Value) -> DbResult<AuthUser> {
        let service_key = self.service_role_key()?;
        debug!("Creating auth user through admin API: {}", email);

        let body = json!({
            "email": email,
            "password": password,
            "email_confirm": true,
            "user_metadata": metadata,
        });

        let headers = self.get_headers(service_key, Some(service_key))?;
        let text = self
            .send(Method::POST, "/auth/v1/admin/users", headers, Some(body))
            .await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn oauth_authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        format!(
            "{}/auth/v1/authorize?provider={}&redirect_to={}",
            self.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect_to)
        )
    }

    fn service_role_key(&self) -> DbResult<&str> {
        if self.service_role_key.is_empty() {
            return Err(DatabaseError::AdminNotConfigured);
        }
        Ok(&self.service_role_key)
    }

    /// Token for writes the caller is not yet able to make themselves
    /// (freshly registered users, admin provisioning).
    pub fn privileged_token<'a>(&'a self, fallback: Option<&'a str>) -> Option<&'a str> {
        if self.service_role_key.is_empty() {
            fallback
        } else {
            Some(&self.service_role_key)
        }
    }
}

fn representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

/// Total from a PostgREST range such as `0-9/42` or `*/0`.
fn parse_total(content_range: &str) -> Option<usize> {
    content_range.rsplit_once('/')?.1.trim().parse().ok()
}

/// Build a PostgREST `in.(...)` list.
pub fn in_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({})", joined)
}
