use serde::Serialize;
use sqlx::{PgConnection, QueryBuilder};

use crate::filter::Filters;
use crate::repository::{build_select, Entity, ListOptions};
use crate::DbError;

/// Pagination behavior switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginateOptions {
    /// Reversed mode: page 1 holds the oldest remaining rows, the highest
    /// page number the most recent. Used for chronological chat listings.
    pub reversed: bool,
    /// When a requested page lies past the end, report the true last page
    /// as `previous_page` and recompute the window to show it.
    pub extra_page: bool,
}

/// A computed row window plus navigation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
    pub number_of_pages: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
}

impl PageWindow {
    /// Convert a page number and size into a bounded window over `count`
    /// rows.
    ///
    /// Forward mode: `offset = (page-1) * per_page`. Reversed mode:
    /// `offset = count - page*per_page`, clipped at zero so the first page
    /// covers the oldest remaining rows without duplication; a page so far
    /// past the end that the clipped limit would go negative degenerates to
    /// an empty window with consistent metadata.
    pub fn compute(page: u32, per_page: u32, count: i64, options: PaginateOptions) -> Self {
        let per_page = per_page.max(1) as i64;
        let page_i = page.max(1) as i64;
        let number_of_pages = {
            let (quotient, rest) = (count / per_page, count % per_page);
            (if rest != 0 { quotient + 1 } else { quotient }) as u32
        };

        let (mut offset, limit) = if options.reversed {
            let mut offset = count - page_i * per_page;
            let mut limit = per_page;
            if offset < 0 {
                limit = (offset + per_page).max(0);
                offset = 0;
            }
            (offset, limit)
        } else {
            ((page_i - 1) * per_page, per_page)
        };

        let next_page = if page < number_of_pages { Some(page + 1) } else { None };

        let previous_page = if page <= 1 {
            None
        } else if page > number_of_pages {
            if options.extra_page && number_of_pages >= 1 {
                offset = (number_of_pages as i64 - 1) * per_page;
                (number_of_pages >= 2).then(|| number_of_pages - 1)
            } else {
                None
            }
        } else {
            Some(page - 1)
        };

        Self {
            offset,
            limit,
            number_of_pages,
            next_page,
            previous_page,
        }
    }
}

/// One page of results with its navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub offset: i64,
    pub count: i64,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub items: Vec<T>,
}

/// Paginate a filtered query: count the matches, compute the window, fetch
/// the page.
pub async fn paginate<E: Entity>(
    conn: &mut PgConnection,
    filters: Filters,
    order_by: &[&str],
    page: u32,
    per_page: u32,
    options: PaginateOptions,
) -> Result<Page<E>, DbError> {
    let mut filters = filters;
    filters.rewrite_pk(E::IDENTITY);

    let mut count_qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", E::TABLE));
    filters.push_where(&mut count_qb);
    let count: i64 = count_qb
        .build_query_scalar()
        .fetch_one(&mut *conn)
        .await?;

    let window = PageWindow::compute(page, per_page, count, options);

    let items = if window.limit > 0 {
        let list_options = ListOptions {
            limit: Some(window.limit),
            offset: Some(window.offset),
            order_by: Some(order_by.iter().map(|s| s.to_string()).collect()),
        };
        let mut qb = build_select::<E>(&filters, &list_options);
        qb.build_query_as::<E>().fetch_all(&mut *conn).await?
    } else {
        Vec::new()
    };

    Ok(Page {
        offset: window.offset,
        count,
        next_page: window.next_page,
        previous_page: window.previous_page,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORWARD: PaginateOptions = PaginateOptions { reversed: false, extra_page: false };
    const REVERSED: PaginateOptions = PaginateOptions { reversed: true, extra_page: false };

    #[test]
    fn test_forward_first_page() {
        let w = PageWindow::compute(1, 5, 20, FORWARD);
        assert_eq!(w.offset, 0);
        assert_eq!(w.limit, 5);
        assert_eq!(w.number_of_pages, 4);
        assert_eq!(w.next_page, Some(2));
        assert_eq!(w.previous_page, None);
    }

    #[test]
    fn test_forward_middle_and_last_page() {
        let w = PageWindow::compute(2, 5, 20, FORWARD);
        assert_eq!(w.offset, 5);
        assert_eq!(w.next_page, Some(3));
        assert_eq!(w.previous_page, Some(1));

        let w = PageWindow::compute(4, 5, 20, FORWARD);
        assert_eq!(w.offset, 15);
        assert_eq!(w.next_page, None);
        assert_eq!(w.previous_page, Some(3));
    }

    #[test]
    fn test_forward_window_size_property() {
        // For all page >= 1, the returned window never exceeds per_page and
        // covers min(per_page, max(0, count - offset)) rows.
        for count in [0i64, 1, 4, 5, 19, 20, 23] {
            for page in 1u32..8 {
                let w = PageWindow::compute(page, 5, count, FORWARD);
                let available = (count - w.offset).max(0).min(5);
                assert!(w.limit >= available, "page={page} count={count}");
                assert!(w.limit <= 5);
            }
        }
    }

    #[test]
    fn test_number_of_pages_rounds_up() {
        assert_eq!(PageWindow::compute(1, 5, 21, FORWARD).number_of_pages, 5);
        assert_eq!(PageWindow::compute(1, 5, 20, FORWARD).number_of_pages, 4);
        assert_eq!(PageWindow::compute(1, 5, 0, FORWARD).number_of_pages, 0);
    }

    #[test]
    fn test_per_page_larger_than_count_single_page() {
        let w = PageWindow::compute(1, 30, 7, FORWARD);
        assert_eq!(w.number_of_pages, 1);
        assert_eq!(w.next_page, None);
        assert_eq!(w.previous_page, None);
        assert_eq!(w.offset, 0);
    }

    #[test]
    fn test_page_beyond_end_without_extra_page() {
        let w = PageWindow::compute(9, 5, 20, FORWARD);
        assert_eq!(w.offset, 40);
        assert_eq!(w.next_page, None);
        // No extra-page policy: nothing to navigate back to.
        assert_eq!(w.previous_page, None);
    }

    #[test]
    fn test_page_beyond_end_with_extra_page_shows_true_last_page() {
        let options = PaginateOptions { reversed: false, extra_page: true };
        let w = PageWindow::compute(9, 5, 20, options);
        // Window recomputed to the last real page.
        assert_eq!(w.offset, 15);
        assert_eq!(w.previous_page, Some(3));
        assert_eq!(w.next_page, None);
    }

    #[test]
    fn test_extra_page_with_single_page_has_no_previous() {
        let options = PaginateOptions { reversed: false, extra_page: true };
        let w = PageWindow::compute(3, 5, 4, options);
        assert_eq!(w.offset, 0);
        assert_eq!(w.previous_page, None);
    }

    #[test]
    fn test_reversed_first_pages() {
        // count=20, per_page=5: page 1 shows rows [15, 20), page 4 rows [0, 5).
        let w = PageWindow::compute(1, 5, 20, REVERSED);
        assert_eq!((w.offset, w.limit), (15, 5));
        let w = PageWindow::compute(2, 5, 20, REVERSED);
        assert_eq!((w.offset, w.limit), (10, 5));
        let w = PageWindow::compute(4, 5, 20, REVERSED);
        assert_eq!((w.offset, w.limit), (0, 5));
    }

    #[test]
    fn test_reversed_clips_negative_offset() {
        // count=23, per_page=5: page 5 would start at -2; the window clips
        // to the 3 oldest rows without duplicating page 4's.
        let w = PageWindow::compute(5, 5, 23, REVERSED);
        assert_eq!((w.offset, w.limit), (0, 3));
        let w = PageWindow::compute(4, 5, 23, REVERSED);
        assert_eq!((w.offset, w.limit), (3, 5));
    }

    #[test]
    fn test_reversed_page_far_past_end_is_empty() {
        // Clipped limit would be negative: degenerates to an empty window
        // instead of underflowing.
        let w = PageWindow::compute(5, 5, 20, REVERSED);
        assert_eq!((w.offset, w.limit), (0, 0));
        let w = PageWindow::compute(17, 5, 20, REVERSED);
        assert_eq!((w.offset, w.limit), (0, 0));
        assert_eq!(w.next_page, None);
    }

    #[test]
    fn test_reversed_adjacent_pages_never_overlap() {
        let count = 23i64;
        let per_page = 5u32;
        let mut covered = Vec::new();
        for page in 1..=5u32 {
            let w = PageWindow::compute(page, per_page, count, REVERSED);
            for row in w.offset..w.offset + w.limit {
                assert!(!covered.contains(&row), "row {row} duplicated on page {page}");
                covered.push(row);
            }
        }
        // Pages 1..=5 exactly cover every row once.
        assert_eq!(covered.len() as i64, count);
    }

    #[test]
    fn test_reversed_offset_never_negative() {
        for count in [0i64, 3, 5, 20, 23] {
            for page in 1u32..10 {
                let w = PageWindow::compute(page, 5, count, REVERSED);
                assert!(w.offset >= 0);
                assert!(w.limit >= 0);
            }
        }
    }

    #[test]
    fn test_navigation_metadata_on_empty_set() {
        let w = PageWindow::compute(1, 10, 0, FORWARD);
        assert_eq!(w.number_of_pages, 0);
        assert_eq!(w.next_page, None);
        assert_eq!(w.previous_page, None);
        assert_eq!(w.offset, 0);
    }
}
