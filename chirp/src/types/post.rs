use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::enums::{PostTimeRange, PostVisibility, ReplyPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub reply_to_post_id: Option<String>,
    #[serde(default)]
    pub root_post_id: Option<String>,
    #[serde(default)]
    pub repost_of_post_id: Option<String>,
    #[serde(default)]
    pub quote_of_post_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub visibility: PostVisibility,
    pub reply_policy: ReplyPolicy,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub repost_count: u64,
    #[serde(default)]
    pub quote_count: u64,
    /// Decimal string; may exceed `u64`.
    #[serde(default = "zero_count", deserialize_with = "decimal_string")]
    pub view_count: String,
    #[serde(default)]
    pub repost: Option<PostRepost>,
}

/// The original post embedded in a repost or quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRepost {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub author_avatar_url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post as seen by the signed-in user, with their engagement flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub bookmarked_by_me: bool,
    #[serde(default)]
    pub reposted_by_me: bool,
}

impl PostView {
    pub fn id(&self) -> &str {
        &self.post.id
    }
}

/// Public listings carry no viewer flags; treat them as all unset.
impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            post,
            liked_by_me: false,
            bookmarked_by_me: false,
            reposted_by_me: false,
        }
    }
}

/// Filters for `/posts` and `/posts/feed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ListPostsParams {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
    pub author_id: Option<String>,
    pub reply_to_post_id: Option<String>,
    pub root_post_id: Option<String>,
    pub repost_of_post_id: Option<String>,
    pub quote_of_post_id: Option<String>,
    pub time_range: Option<PostTimeRange>,
}

impl ListPostsParams {
    /// Query-string pairs, omitting unset and empty values.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        let mut push = |key: &'static str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                query.push((key, v.to_string()));
            }
        };
        push("cursor", &self.cursor);
        push("authorId", &self.author_id);
        push("replyToPostId", &self.reply_to_post_id);
        push("rootPostId", &self.root_post_id);
        push("repostOfPostId", &self.repost_of_post_id);
        push("quoteOfPostId", &self.quote_of_post_id);
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        if let Some(range) = self.time_range {
            query.push(("timeRange", range.as_str().to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repost_of_post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_of_post_id: Option<String>,
}

fn zero_count() -> String {
    "0".to_string()
}

/// Accept the counter as either a JSON string or a JSON number.
fn decimal_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
        Float(f64),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Null(()) => zero_count(),
    })
}
