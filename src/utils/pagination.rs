use serde::Deserialize;
use utoipa::IntoParams;

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl PageQuery {
    pub fn resolve(&self) -> Page {
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        Page {
            page,
            per_page,
            offset: (page - 1) * per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_first_page() {
        let p = PageQuery::default().resolve();
        assert_eq!(p, Page { page: 1, per_page: 10, offset: 0 });
    }

    #[test]
    fn clamps_out_of_range_values() {
        let p = PageQuery { page: Some(0), per_page: Some(1000) }.resolve();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, MAX_PER_PAGE);

        let p = PageQuery { page: Some(3), per_page: Some(0) }.resolve();
        assert_eq!(p.per_page, 1);
        assert_eq!(p.offset, 2);
    }
}
