//! Pagination for list and roll-up responses.

use serde::Serialize;

use crate::{Error, Result};

/// A validated 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page:      u64,
  pub page_size: u64,
}

impl PageRequest {
  pub fn new(page: u64, page_size: u64, max_page_size: u64) -> Result<Self> {
    if page == 0 {
      return Err(Error::validation("page", "must be at least 1"));
    }
    if page_size == 0 || page_size > max_page_size {
      return Err(Error::validation(
        "page_size",
        format!("must be between 1 and {max_page_size}"),
      ));
    }
    let in_range = (page - 1)
      .checked_mul(page_size)
      .is_some_and(|offset| i64::try_from(offset).is_ok());
    if !in_range {
      return Err(Error::validation("page", "is past the last addressable row"));
    }
    Ok(Self { page, page_size })
  }

  pub fn offset(&self) -> u64 { (self.page - 1).saturating_mul(self.page_size) }

  pub fn limit(&self) -> u64 { self.page_size }
}

/// One page of results. `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
  pub count: usize,
  pub total: u64,
  pub page:  u64,
  pub pages: u64,
  pub data:  Vec<T>,
}

impl<T> Page<T> {
  pub fn new(request: PageRequest, total: u64, data: Vec<T>) -> Self {
    Self {
      count: data.len(),
      total,
      page: request.page,
      pages: total.div_ceil(request.page_size),
      data,
    }
  }

  pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
    Page {
      count: self.count,
      total: self.total,
      page:  self.page,
      pages: self.pages,
      data:  self.data.into_iter().map(f).collect(),
    }
  }
}
