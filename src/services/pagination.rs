use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("page number is not an integer: {0:?}")]
    NotAnInteger(String),
    #[error("page {0} is out of range")]
    OutOfRange(usize),
}

/// Splits `count` items into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// Always at least 1: an empty listing still has one (empty) page.
    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    pub fn page_range(&self) -> Vec<usize> {
        (1..=self.num_pages()).collect()
    }

    /// Resolve a raw `?page=` value. Missing means the first page and `last`
    /// means the final one.
    pub fn parse_page(&self, raw: Option<&str>) -> Result<usize, PageError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(1),
            Some("last") => Ok(self.num_pages()),
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| PageError::NotAnInteger(s.to_string())),
        }
    }

    pub fn page(&self, number: usize) -> Result<Page, PageError> {
        let num_pages = self.num_pages();
        if number < 1 || number > num_pages {
            return Err(PageError::OutOfRange(number));
        }

        let offset = (number - 1) * self.per_page;
        Ok(Page {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            offset,
            limit: self.per_page,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_page_number: (number > 1).then(|| number - 1),
            next_page_number: (number < num_pages).then(|| number + 1),
            is_paginated: num_pages > 1,
        })
    }
}

/// One page of a [`Paginator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub per_page: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<usize>,
    pub next_page_number: Option<usize>,
    pub is_paginated: bool,
}

impl Page {
    pub fn window(&self) -> Option<PaginationWindow> {
        let range: Vec<usize> = (1..=self.num_pages).collect();
        pagination_window(self.number, self.num_pages, &range)
    }
}

/// Page links shown around the current page.
///
/// `first` / `last` ask for a separate link to page 1 / the final page;
/// `left_has_more` / `right_has_more` ask for an ellipsis between that link
/// and the window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaginationWindow {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub left_has_more: bool,
    pub right_has_more: bool,
    pub first: bool,
    pub last: bool,
}

/// Navigation window for page `page` of `total_pages`, where `page_range` is
/// `[1, ..., total_pages]`. `None` when there is only one page.
///
/// Up to two neighbours are shown on each side; near either end the windows
/// shrink instead of failing.
pub fn pagination_window(
    page: usize,
    total_pages: usize,
    page_range: &[usize],
) -> Option<PaginationWindow> {
    if total_pages <= 1 {
        return None;
    }

    let mut window = PaginationWindow::default();

    if page == 1 {
        window.fill_right(page, total_pages, page_range);
    } else if page == total_pages {
        window.fill_left(page, page_range);
    } else {
        window.fill_left(page, page_range);
        window.fill_right(page, total_pages, page_range);
    }

    Some(window)
}

impl PaginationWindow {
    fn fill_left(&mut self, page: usize, page_range: &[usize]) {
        self.left = clipped(page_range, page.saturating_sub(3), page.saturating_sub(1)).to_vec();
        if let Some(&leftmost) = self.left.first() {
            self.left_has_more = leftmost > 2;
            self.first = leftmost > 1;
        }
    }

    fn fill_right(&mut self, page: usize, total_pages: usize, page_range: &[usize]) {
        self.right = clipped(page_range, page, page + 2).to_vec();
        if let Some(&rightmost) = self.right.last() {
            self.right_has_more = rightmost < total_pages.saturating_sub(1);
            self.last = rightmost < total_pages;
        }
    }
}

/// `range[start..end]` with both bounds clamped to the slice.
fn clipped(range: &[usize], start: usize, end: usize) -> &[usize] {
    let end = end.min(range.len());
    let start = start.min(end);
    &range[start..end]
}
