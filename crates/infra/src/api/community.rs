//! Community endpoints

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::instrument;

use super::client::ApiClient;
use super::errors::{ApiError, ValidationError};
use super::request::ApiRequest;
use super::types::LikeTarget;

const LIKE_TOGGLE_PATH: &str = "/community/likes/toggle/";
const COMMENTS_PATH: &str = "/community/comments/";
const MY_PROFILE_PATH: &str = "/community/users/me/";
const NOTIFICATIONS_PATH: &str = "/community/notifications/";
const MARK_ALL_READ_PATH: &str = "/community/notifications/mark_all_read/";
const UNREAD_COUNT_PATH: &str = "/community/notifications/unread_count/";

pub(crate) fn favorite_path(id: i64) -> String {
    format!("/community/favorites/{id}/")
}

fn comment_path(id: i64) -> String {
    format!("{COMMENTS_PATH}{id}/")
}

fn follow_path(user_id: i64, action: &str) -> String {
    format!("/community/follows/{user_id}/{action}/")
}

fn user_path(user_id: i64) -> String {
    format!("/community/users/{user_id}/")
}

#[derive(Deserialize)]
struct UnreadCount {
    unread_count: u64,
}

/// Favorites, likes, comments, follows, profiles and notifications
#[derive(Clone)]
pub struct CommunityApi {
    client: ApiClient,
}

impl CommunityApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Favorite a single image.
    ///
    /// See [`ImageService::batch_favorite`](super::ImageService::batch_favorite)
    /// for the fanned-out form.
    #[instrument(skip(self))]
    pub async fn favorite(&self, image_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(favorite_path(image_id))).await
    }

    /// Like or unlike an image or comment
    #[instrument(skip(self))]
    pub async fn toggle_like(
        &self,
        target: LikeTarget,
        object_id: i64,
    ) -> Result<Value, ApiError> {
        let body = json!({ "like_type": target.as_str(), "object_id": object_id });
        self.client.execute(ApiRequest::post(LIKE_TOGGLE_PATH).json(body)).await
    }

    /// Top-level comments on an image, newest first
    #[instrument(skip(self))]
    pub async fn comments(&self, image_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(COMMENTS_PATH).query("image", image_id)).await
    }

    /// Blank content is rejected locally.
    #[instrument(skip(self, content))]
    pub async fn post_comment(&self, image_id: i64, content: &str) -> Result<Value, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::MissingField("content").into());
        }
        let body = json!({ "image": image_id, "content": content });
        self.client.execute(ApiRequest::post(COMMENTS_PATH).json(body)).await
    }

    /// The server soft-deletes and answers 204
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, comment_id: i64) -> Result<(), ApiError> {
        self.client.execute(ApiRequest::delete(comment_path(comment_id))).await.map(|_| ())
    }

    /// Users that `user_id` follows
    #[instrument(skip(self))]
    pub async fn followings(&self, user_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(follow_path(user_id, "following"))).await
    }

    #[instrument(skip(self))]
    pub async fn followers(&self, user_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(follow_path(user_id, "followers"))).await
    }

    /// Follow or unfollow; the reply carries the new `following` flag
    #[instrument(skip(self))]
    pub async fn toggle_follow(&self, user_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(follow_path(user_id, "toggle"))).await
    }

    #[instrument(skip(self))]
    pub async fn my_profile(&self) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(MY_PROFILE_PATH)).await
    }

    #[instrument(skip(self))]
    pub async fn user_profile(&self, user_id: i64) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(user_path(user_id))).await
    }

    #[instrument(skip(self))]
    pub async fn notifications(&self) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::get(NOTIFICATIONS_PATH)).await
    }

    #[instrument(skip(self))]
    pub async fn mark_all_notifications_read(&self) -> Result<Value, ApiError> {
        self.client.execute(ApiRequest::post(MARK_ALL_READ_PATH)).await
    }

    #[instrument(skip(self))]
    pub async fn mark_notification_read(&self, id: i64) -> Result<Value, ApiError> {
        let path = format!("{NOTIFICATIONS_PATH}{id}/mark_read/");
        self.client.execute(ApiRequest::post(path)).await
    }

    #[instrument(skip(self))]
    pub async fn unread_notification_count(&self) -> Result<u64, ApiError> {
        let payload = self.client.execute(ApiRequest::get(UNREAD_COUNT_PATH)).await?;
        let count: UnreadCount = serde_json::from_value(payload)
            .map_err(|err| ApiError::Internal(format!("unexpected unread count: {err}")))?;
        Ok(count.unread_count)
    }
}
