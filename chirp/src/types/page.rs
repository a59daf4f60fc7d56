use serde::{Deserialize, Serialize};

/// One page of a cursor-paginated listing. Item order is server-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    pub has_next: bool,
}

impl<T> CursorPage<T> {
    /// A terminal page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            has_next: false,
        }
    }

    /// A page followed by the page at `cursor`.
    pub fn with_next(items: Vec<T>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(cursor.into()),
            has_next: true,
        }
    }

    /// Convert the items while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_next: self.has_next,
        }
    }
}

/// `cursor` + `limit` query shared by the simple listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn new(cursor: Option<String>, limit: u32) -> Self {
        Self {
            cursor,
            limit: Some(limit),
        }
    }

    /// Query-string pairs, omitting unset and empty values.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            query.push(("cursor", cursor.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}
