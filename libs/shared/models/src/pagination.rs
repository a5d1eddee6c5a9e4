use serde::{Deserialize, Serialize};

/// `?page=` as sent by clients; kept as text so junk falls back to page 1.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub q: Option<String>,
}

impl PageQuery {
    pub fn search(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Slice `items` to the requested page. Numbers below 1 or past the end
/// land on the last page; anything that is not a number lands on the first.
pub fn paginate<T>(items: Vec<T>, requested: Option<&str>, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);

    let page = match requested.map(|p| p.trim().parse::<i64>()) {
        Some(Ok(n)) if n >= 1 => usize::try_from(n).map_or(total_pages, |n| n.min(total_pages)),
        Some(Ok(_)) => total_pages,
        _ => 1,
    };

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
        has_next: page < total_pages,
        has_previous: page > 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_by_default() {
        let page = paginate((1..=30).collect::<Vec<_>>(), None, 15);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 15);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn past_the_end_clamps_to_last() {
        let page = paginate((1..=21).collect::<Vec<_>>(), Some("9"), 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, vec![21]);
    }

    #[test]
    fn junk_is_first_page() {
        let page = paginate((1..=5).collect::<Vec<_>>(), Some("abc"), 2);
        assert_eq!(page.page, 1);
        let page = paginate((1..=5).collect::<Vec<_>>(), Some(""), 2);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn zero_and_negative_pages_land_on_last() {
        let page = paginate((1..=25).collect::<Vec<_>>(), Some("0"), 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        let page = paginate((1..=25).collect::<Vec<_>>(), Some("-1"), 10);
        assert_eq!(page.page, 3);
        assert!(!page.has_next);
    }

    #[test]
    fn empty_list_has_one_page() {
        let page = paginate(Vec::<u8>::new(), Some("2"), 10);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn blank_search_is_none() {
        let query = PageQuery { page: None, q: Some("   ".into()) };
        assert_eq!(query.search(), None);
        let query = PageQuery { page: None, q: Some(" smith ".into()) };
        assert_eq!(query.search(), Some("smith"));
    }
}
