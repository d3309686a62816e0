//! Typed calls against the backend endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    capture::{ApiClient, ApiError, WriteOutcome},
    persist::{PersistError, session::SessionStore},
};

/// Sign-up form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain password, sent over TLS.
    pub password: String,
    /// Contact phone.
    pub phone: String,
}

/// Login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login email.
    pub email: String,
    /// Plain password.
    pub password: String,
}

/// Body of `/register` and `/login` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// `"success"` or an error marker.
    pub status: String,
    /// Signed-in user on success.
    #[serde(default)]
    pub user: Option<Value>,
    /// Human-readable detail.
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// True when `status` is `"success"`.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Result of a captured auth write.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// The backend answered.
    Answered(AuthResponse),
    /// Stored offline; will be replayed.
    Queued {
        /// Queue record id.
        id: crate::types::RecordId,
    },
}

/// Push notification to send through the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// Recipient.
    pub user_id: String,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Icon path.
    pub icon: String,
    /// Page opened on click.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

/// Error from a call that also touches the session entry.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// The session entry could not be written.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Backend API bound to one context's [`ApiClient`].
#[derive(Clone)]
pub struct BackendApi {
    client: ApiClient,
    session: Option<SessionStore>,
}

impl BackendApi {
    /// API without a session entry.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            session: None,
        }
    }

    /// Remembers the signed-in user in `session`.
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    /// Underlying capture client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `POST /register`. Queued when offline.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthOutcome, ApiError> {
        let outcome = self
            .client
            .write("/register", serde_json::to_value(request)?)
            .await?;
        auth_outcome(outcome)
    }

    /// Logs in and, on success, remembers the user in the session store.
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthOutcome, SessionError> {
        let outcome = self
            .client
            .write("/login", serde_json::to_value(credentials).map_err(ApiError::from)?)
            .await?;
        let outcome = auth_outcome(outcome)?;

        if let (AuthOutcome::Answered(response), Some(session)) = (&outcome, &self.session) {
            if let (true, Some(user)) = (response.is_success(), &response.user) {
                session.save_user(user).await?;
            }
        }
        Ok(outcome)
    }

    /// Clears the session entry.
    pub async fn logout(&self) -> Result<(), PersistError> {
        match &self.session {
            Some(session) => session.clear_user().await,
            None => Ok(()),
        }
    }

    /// User saved by the last successful login, if any.
    pub async fn restore_session(&self) -> Result<Option<Value>, PersistError> {
        match &self.session {
            Some(session) => session.load_user().await,
            None => Ok(None),
        }
    }

    /// `GET /users`.
    pub async fn users(&self) -> Result<Vec<Value>, ApiError> {
        let body = self.client.fetch("/users").await?;
        Ok(serde_json::from_value(body)?)
    }

    /// `GET /user/{id}`.
    pub async fn user(&self, id: &str) -> Result<Value, ApiError> {
        self.client.fetch(&format!("/user/{id}")).await
    }

    /// Base64url VAPID public key used for push subscriptions.
    pub async fn notification_public_key(&self) -> Result<String, ApiError> {
        let body = self.client.fetch("/notifications/public-key").await?;
        let key: PublicKeyResponse = serde_json::from_value(body)?;
        Ok(key.public_key)
    }

    /// Stores a push subscription for `user_id`. Never queued.
    pub async fn subscribe_notifications(&self, user_id: &str, subscription: Value) -> Result<Value, ApiError> {
        self.client
            .post_direct(
                "/notifications/subscribe",
                serde_json::json!({ "userId": user_id, "subscription": subscription }),
            )
            .await
    }

    /// Broadcasts a push notification. Never queued.
    pub async fn send_notification(&self, notification: &NotificationRequest) -> Result<Value, ApiError> {
        self.client
            .post_direct("/notifications/send", serde_json::to_value(notification)?)
            .await
    }

    /// Sends a push notification to one user. Never queued.
    pub async fn send_notification_to_user(&self, notification: &NotificationRequest) -> Result<Value, ApiError> {
        self.client
            .post_direct("/notifications/send-to-user", serde_json::to_value(notification)?)
            .await
    }
}

fn auth_outcome(outcome: WriteOutcome) -> Result<AuthOutcome, ApiError> {
    match outcome {
        WriteOutcome::Delivered(body) => Ok(AuthOutcome::Answered(serde_json::from_value(body)?)),
        WriteOutcome::Queued { id } => Ok(AuthOutcome::Queued { id }),
    }
}
