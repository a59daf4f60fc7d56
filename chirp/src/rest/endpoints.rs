use reqwest::Method;
use serde_json::json;

use crate::error::Result;
use crate::rest::ChirpHttpClient;
use crate::types::*;

impl ChirpHttpClient {
    // --- Auth ---

    /// POST /auth/register - Create an account and start a session.
    pub async fn register(&self, payload: &RegisterPayload) -> Result<User> {
        let env: UserEnvelope = self
            .send_json(Method::POST, "/auth/register", Some(payload))
            .await?;
        Ok(env.user)
    }

    /// POST /auth/login - Start a session (cookies are kept by the client).
    pub async fn login(&self, payload: &LoginPayload) -> Result<User> {
        let env: UserEnvelope = self
            .send_json(Method::POST, "/auth/login", Some(payload))
            .await?;
        Ok(env.user)
    }

    /// POST /auth/refresh - Rotate the session tokens.
    pub async fn refresh(&self) -> Result<User> {
        let env: UserEnvelope = self
            .send_json::<(), _>(Method::POST, "/auth/refresh", None)
            .await?;
        Ok(env.user)
    }

    /// POST /auth/logout - End the session.
    pub async fn logout(&self) -> Result<()> {
        self.send_unit(Method::POST, "/auth/logout").await
    }

    /// GET /me - The signed-in user.
    pub async fn me(&self) -> Result<User> {
        let env: UserEnvelope = self.get("/me", &[]).await?;
        Ok(env.user)
    }

    // --- Posts ---

    /// GET /posts - Public post listing (no viewer flags).
    pub async fn list_posts(&self, params: &ListPostsParams) -> Result<CursorPage<Post>> {
        self.get("/posts", &params.to_pairs()).await
    }

    /// GET /posts/feed - Post listing with the viewer's engagement flags.
    pub async fn list_feed(&self, params: &ListPostsParams) -> Result<CursorPage<PostView>> {
        self.get("/posts/feed", &params.to_pairs()).await
    }

    /// POST /posts - Create a post, reply, repost or quote.
    pub async fn create_post(&self, payload: &CreatePostPayload) -> Result<Post> {
        self.send_json(Method::POST, "/posts", Some(payload)).await
    }

    /// GET /posts/{id} - A single post, `None` when the server returns null.
    pub async fn get_post(&self, post_id: &str) -> Result<Option<Post>> {
        self.get(&format!("/posts/{post_id}"), &[]).await
    }

    /// GET /posts/{id}/view - A single post with viewer flags.
    pub async fn get_post_view(&self, post_id: &str) -> Result<Option<PostView>> {
        self.get(&format!("/posts/{post_id}/view"), &[]).await
    }

    /// POST /posts/{id}/like
    pub async fn like_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::POST, &format!("/posts/{post_id}/like"))
            .await
    }

    /// DELETE /posts/{id}/like
    pub async fn unlike_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::DELETE, &format!("/posts/{post_id}/like"))
            .await
    }

    /// POST /posts/{id}/bookmark
    pub async fn bookmark_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::POST, &format!("/posts/{post_id}/bookmark"))
            .await
    }

    /// DELETE /posts/{id}/bookmark
    pub async fn unbookmark_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::DELETE, &format!("/posts/{post_id}/bookmark"))
            .await
    }

    /// POST /posts/{id}/repost
    pub async fn repost_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::POST, &format!("/posts/{post_id}/repost"))
            .await
    }

    /// DELETE /posts/{id}/repost
    pub async fn unrepost_post(&self, post_id: &str) -> Result<()> {
        self.send_unit(Method::DELETE, &format!("/posts/{post_id}/repost"))
            .await
    }

    // --- Bookmarks ---

    /// GET /bookmarks - The viewer's bookmarks, newest first.
    pub async fn list_bookmarks(&self, query: &PageQuery) -> Result<CursorPage<Bookmark>> {
        self.get("/bookmarks", &query.to_pairs()).await
    }

    // --- Notifications ---

    /// GET /notifications - Paginated notifications, optionally unread only.
    pub async fn list_notifications(
        &self,
        query: &PageQuery,
        unread_only: bool,
    ) -> Result<CursorPage<Notification>> {
        let mut pairs = query.to_pairs();
        if unread_only {
            pairs.push(("unreadOnly", "true".to_string()));
        }
        self.get("/notifications", &pairs).await
    }

    /// PATCH /notifications/{id}/read - Returns the updated notification.
    pub async fn mark_notification_read(&self, id: &str) -> Result<Notification> {
        self.send_json::<(), _>(Method::PATCH, &format!("/notifications/{id}/read"), None)
            .await
    }

    /// GET /notifications/unread-count
    pub async fn get_unread_notifications_count(&self) -> Result<u64> {
        let count: UnreadCount = self.get("/notifications/unread-count", &[]).await?;
        Ok(count.count)
    }

    // --- Users ---

    /// GET /users/by-username/{username}
    pub async fn get_user_by_username(&self, username: &str) -> Result<User> {
        let encoded: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
        let env: UserEnvelope = self
            .get(&format!("/users/by-username/{encoded}"), &[])
            .await?;
        Ok(env.user)
    }

    /// GET /users/{id}
    pub async fn get_user_by_id(&self, id: &str) -> Result<User> {
        let env: UserEnvelope = self.get(&format!("/users/{id}"), &[]).await?;
        Ok(env.user)
    }

    /// GET /users/{id}/stats
    pub async fn get_user_stats(&self, id: &str) -> Result<UserStats> {
        self.get(&format!("/users/{id}/stats"), &[]).await
    }

    /// GET /users/{id}/follow-status - Whether the viewer follows `id`.
    pub async fn get_follow_status(&self, id: &str) -> Result<bool> {
        let status: FollowStatus = self
            .get(&format!("/users/{id}/follow-status"), &[])
            .await?;
        Ok(status.following)
    }

    /// POST /follows
    pub async fn follow_user(&self, following_id: &str) -> Result<()> {
        let body = json!({ "followingId": following_id });
        self.send_json::<_, serde_json::Value>(Method::POST, "/follows", Some(&body))
            .await
            .map(|_| ())
    }

    /// DELETE /follows/{id}
    pub async fn unfollow_user(&self, following_id: &str) -> Result<()> {
        self.send_unit(Method::DELETE, &format!("/follows/{following_id}"))
            .await
    }

    /// GET /users/{id}/followers
    pub async fn list_followers(&self, user_id: &str, query: &PageQuery) -> Result<CursorPage<User>> {
        self.get(&format!("/users/{user_id}/followers"), &query.to_pairs())
            .await
    }

    /// GET /users/{id}/following
    pub async fn list_following(&self, user_id: &str, query: &PageQuery) -> Result<CursorPage<User>> {
        self.get(&format!("/users/{user_id}/following"), &query.to_pairs())
            .await
    }

    /// PATCH /users/me - Update the viewer's profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let env: UserEnvelope = self
            .send_json(Method::PATCH, "/users/me", Some(update))
            .await?;
        Ok(env.user)
    }
}
