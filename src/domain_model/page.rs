use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Raw `?page=&limit=` query; anything missing or below one falls back to the
/// defaults and `limit` is capped at `MAX_LIMIT`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl From<PageQuery> for PageParams {
    fn from(query: PageQuery) -> Self {
        let clamp = |v: Option<i64>, default: u32| match v {
            Some(v) if v >= 1 => u32::try_from(v).unwrap_or(u32::MAX),
            _ => default,
        };
        PageParams {
            page: clamp(query.page, DEFAULT_PAGE),
            limit: clamp(query.limit, DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }
}

impl PageParams {
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Laravel-style page envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub current_page: u32,
    pub data: Vec<T>,
    pub first_page_url: String,
    pub from: u64,
    pub last_page: u64,
    pub last_page_url: String,
    pub next_page_url: Option<String>,
    pub path: String,
    pub per_page: u32,
    pub prev_page_url: Option<String>,
    pub to: u64,
    pub total: u64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: u64, path: &str) -> Self {
        let per_page = u64::from(params.limit.max(1));
        let current = u64::from(params.page);
        let last_page = total.div_ceil(per_page);

        let mut from = (current - 1) * per_page + 1;
        let mut to = (from + per_page - 1).min(total);
        if from > total {
            from = 0;
            to = 0;
        }

        let url = |page: u64| format!("{}?limit={}&page={}", path, per_page, page);

        Paginated {
            current_page: params.page,
            data,
            first_page_url: url(1),
            from,
            last_page,
            last_page_url: url(last_page),
            next_page_url: (current < last_page).then(|| url(current + 1)),
            path: path.to_string(),
            per_page: params.limit,
            prev_page_url: (current > 1).then(|| url(current - 1)),
            to,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_and_clamping() {
        let p: PageParams = PageQuery {
            page: Some(0),
            limit: Some(-3),
        }
        .into();
        assert_eq!(p, PageParams::default());

        let p: PageParams = PageQuery {
            page: Some(3),
            limit: Some(25),
        }
        .into();
        assert_eq!(p.offset(), 50);
    }

    #[test]
    fn limit_is_capped() {
        let p: PageParams = PageQuery {
            page: Some(1),
            limit: Some(i64::from(u32::MAX)),
        }
        .into();
        assert_eq!(p.limit, MAX_LIMIT);

        let p: PageParams = PageQuery {
            page: None,
            limit: Some(100),
        }
        .into();
        assert_eq!(p.limit, 100);
    }

    #[test]
    fn middle_page_has_both_links() {
        let page = Paginated::new(vec![1, 2], PageParams { page: 2, limit: 2 }, 5, "/api/v1/users");
        assert_eq!(page.last_page, 3);
        assert_eq!(page.from, 3);
        assert_eq!(page.to, 4);
        assert_eq!(
            page.prev_page_url.as_deref(),
            Some("/api/v1/users?limit=2&page=1")
        );
        assert_eq!(
            page.next_page_url.as_deref(),
            Some("/api/v1/users?limit=2&page=3")
        );
        assert_eq!(page.last_page_url, "/api/v1/users?limit=2&page=3");
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page: Paginated<u8> =
            Paginated::new(vec![], PageParams { page: 9, limit: 10 }, 12, "/x");
        assert_eq!(page.from, 0);
        assert_eq!(page.to, 0);
        assert_eq!(page.last_page, 2);
        assert!(page.next_page_url.is_none());
    }

    #[test]
    fn last_partial_page_caps_to() {
        let page = Paginated::new(vec![1, 2], PageParams { page: 2, limit: 10 }, 12, "/x");
        assert_eq!(page.from, 11);
        assert_eq!(page.to, 12);
    }
}
