//! `page` / `per_page` paging for list endpoints.
//!
//! Handlers read both values from the query string (`?page=2&per_page=20`,
//! either may be omitted) and the service layer turns them into a page
//! index and page size with [`Pagination::normalize`].

use serde::Deserialize;

/// Paging as given in the query string. Missing values take the defaults.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    /// 1-based; `0` is read as the first page.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Clamped to `1..=200`.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 50 }

impl Pagination {
    /// Zero-based page index and page size, ready for `paginate(..).fetch_page(idx)`.
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 200);
        ((page - 1) as u64, per_page as u64)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: default_page(), per_page: default_per_page() } }
}

#[cfg(test)]
mod tests {
    use super::Pagination;

    #[test]
    fn normalize_clamps_zero_to_defaults() {
        let (idx, per) = Pagination { page: 0, per_page: 0 }.normalize();
        assert_eq!(idx, 0);
        assert_eq!(per, 1);
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        let (idx, per) = Pagination { page: 5, per_page: 1000 }.normalize();
        assert_eq!(idx, 4);
        assert_eq!(per, 200);
    }

    #[test]
    fn omitted_fields_take_defaults() {
        let p: Pagination = serde_json::from_str(r#"{"page": 3}"#).unwrap();
        assert_eq!((p.page, p.per_page), (3, 50));
        assert_eq!(p.normalize(), (2, 50));
    }

    #[test]
    fn default_values_are_sane() {
        let d = Pagination::default();
        assert_eq!(d.page, 1);
        assert_eq!(d.per_page, 50);
    }
}
