//! Paging functions binding the REST client to [`CursorList`]s.
//!
//! [`CursorList`]: crate::list::CursorList

use futures_util::future::join_all;
use futures_util::FutureExt;
use tracing::debug;

use crate::list::PageFn;
use crate::rest::ChirpHttpClient;
use crate::types::{Bookmark, CursorPage, ListPostsParams, PageQuery, PostTimeRange, PostView, User};

/// Identity of the home feed: whose session, and which time window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeedQuery {
    pub user_id: Option<String>,
    pub time_range: Option<PostTimeRange>,
}

/// Home feed pages with the viewer's engagement flags.
pub fn feed_pages(client: ChirpHttpClient, page_size: u32) -> Box<PageFn<PostView, FeedQuery>> {
    Box::new(move |query: FeedQuery, cursor| {
        let client = client.clone();
        async move {
            let params = ListPostsParams {
                cursor,
                limit: Some(page_size),
                time_range: query.time_range,
                ..Default::default()
            };
            client.list_feed(&params).await
        }
        .boxed()
    })
}

/// A profile's own posts; the query is the author id.
pub fn author_pages(client: ChirpHttpClient, page_size: u32, authed: bool) -> Box<PageFn<PostView, String>> {
    Box::new(move |author_id: String, cursor| {
        let client = client.clone();
        async move {
            let params = ListPostsParams {
                cursor,
                limit: Some(page_size),
                author_id: Some(author_id),
                ..Default::default()
            };
            if authed {
                client.list_feed(&params).await
            } else {
                Ok(client.list_posts(&params).await?.map(PostView::from))
            }
        }
        .boxed()
    })
}

/// Bookmarked posts, hydrated from the bookmark page. The query is the
/// viewer's id, so a different session starts over.
pub fn bookmark_pages(client: ChirpHttpClient, page_size: u32) -> Box<PageFn<PostView, Option<String>>> {
    Box::new(move |_user_id: Option<String>, cursor| {
        let client = client.clone();
        async move {
            let page = client
                .list_bookmarks(&PageQuery::new(cursor, page_size))
                .await?;
            let posts = hydrate_bookmarks(&client, &page.items).await;
            Ok(CursorPage {
                items: posts,
                next_cursor: page.next_cursor,
                has_next: page.has_next,
            })
        }
        .boxed()
    })
}

/// Fetch the post view behind each bookmark concurrently, keeping bookmark
/// order. Posts that fail to load or no longer exist are left out.
pub async fn hydrate_bookmarks(client: &ChirpHttpClient, bookmarks: &[Bookmark]) -> Vec<PostView> {
    if bookmarks.is_empty() {
        return Vec::new();
    }
    let results = join_all(bookmarks.iter().map(|b| client.get_post_view(&b.post_id))).await;
    let total = results.len();
    let posts: Vec<PostView> = results
        .into_iter()
        .filter_map(|result| result.ok().flatten())
        .collect();
    if posts.len() < total {
        debug!(dropped = total - posts.len(), "bookmarked posts unavailable");
    }
    posts
}

/// Users followed by the profile whose id is the query.
pub fn following_pages(client: ChirpHttpClient, page_size: u32) -> Box<PageFn<User, String>> {
    Box::new(move |user_id: String, cursor| {
        let client = client.clone();
        async move {
            client
                .list_following(&user_id, &PageQuery::new(cursor, page_size))
                .await
        }
        .boxed()
    })
}
