//! Search result shapes.

use crate::model::value::Record;
use crate::query::params::SearchParams;
use serde::Serialize;

/// Requested result shape of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// One page sized by `limit` (or the configured default).
    Paginated,
    /// Every matching record.
    All,
}

/// One page of records plus the parameters needed to link other pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub data: Vec<Record>,
    pub total: u64,
    pub per_page: u32,
    pub current_page: u32,
    pub last_page: u32,
    /// Input parameters carried forward for link generation.
    pub params: SearchParams,
}

impl Page {
    pub fn new(data: Vec<Record>, total: u64, per_page: u32, current_page: u32, params: SearchParams) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page.max(1)))).unwrap_or(u32::MAX)
        };
        Self {
            data,
            total,
            per_page,
            current_page,
            last_page,
            params,
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutput {
    Page(Page),
    Collection(Vec<Record>),
}

impl SearchOutput {
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Page(page) => &page.data,
            Self::Collection(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            Self::Page(page) => page.data,
            Self::Collection(records) => records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;
    use crate::query::params::SearchParams;

    #[test]
    fn last_page_rounds_up_and_is_at_least_one() {
        assert_eq!(Page::new(Vec::new(), 0, 10, 1, SearchParams::new()).last_page, 1);
        let page = Page::new(Vec::new(), 21, 10, 2, SearchParams::new());
        assert_eq!(page.last_page, 3);
        assert!(page.has_more());
    }
}
