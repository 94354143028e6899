//! Fixed-size page-number pagination over materialized feeds.

/// Posts shown per feed page.
pub const PAGE_SIZE: usize = 10;

/// One page of an ordered sequence plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }
}

/// Slice `items` into the requested page of [`PAGE_SIZE`] entries.
///
/// A missing or malformed page number arrives as `None` and resolves to the
/// first page; zero is treated the same way. Numbers past the end clamp to
/// the last page rather than erroring. Empty input yields a single empty
/// page (`number = 1`, `total_pages = 1`).
pub fn paginate<T>(items: Vec<T>, requested: Option<usize>) -> Page<T> {
    paginate_with_size(items, requested, PAGE_SIZE)
}

pub fn paginate_with_size<T>(items: Vec<T>, requested: Option<usize>, page_size: usize) -> Page<T> {
    debug_assert!(page_size > 0, "page size must be positive");

    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let number = requested.unwrap_or(1).clamp(1, total_pages);

    let start = (number - 1) * page_size;
    let items: Vec<T> = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        number,
        total_pages,
        total_items,
    }
}
