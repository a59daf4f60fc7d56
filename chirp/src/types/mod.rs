pub mod bookmark;
pub mod enums;
pub mod notification;
pub mod page;
pub mod post;
pub mod user;

pub use bookmark::*;
pub use enums::*;
pub use notification::*;
pub use page::*;
pub use post::*;
pub use user::*;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};

    use super::*;

    pub(crate) fn post(id: &str, author_id: &str) -> Post {
        Post {
            id: id.to_string(),
            author_id: author_id.to_string(),
            author_username: None,
            author_display_name: None,
            author_avatar_url: None,
            text: Some(format!("post {id}")),
            image_url: None,
            reply_to_post_id: None,
            root_post_id: None,
            repost_of_post_id: None,
            quote_of_post_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            visibility: PostVisibility::Public,
            reply_policy: ReplyPolicy::Everyone,
            like_count: 0,
            reply_count: 0,
            repost_count: 0,
            quote_count: 0,
            view_count: "0".to_string(),
            repost: None,
        }
    }

    pub(crate) fn view(id: &str) -> PostView {
        post(id, "u1").into()
    }
}
