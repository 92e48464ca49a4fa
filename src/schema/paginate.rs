//! skip/take windows

use crate::error::{Error, Result};
use crate::query::Arg;
use crate::types::{SKIP_KEY, TAKE_KEY};

/// Pagination window. `take: None` means "all remaining".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub skip: usize,
    pub take: Option<usize>,
}

impl Page {
    /// Read `skip` and `take`. The last occurrence of each key wins.
    pub fn parse_skip_take(args: &[Arg]) -> Result<Self> {
        let mut page = Page::default();
        for arg in args {
            match arg.key() {
                Some(SKIP_KEY) => page.skip = parse_count(SKIP_KEY, &arg.value)?,
                Some(TAKE_KEY) => page.take = Some(parse_count(TAKE_KEY, &arg.value)?),
                _ => {}
            }
        }
        Ok(page)
    }

    pub fn apply<E>(&self, items: Vec<E>) -> Vec<E> {
        let take = self.take.unwrap_or(usize::MAX);
        items.into_iter().skip(self.skip).take(take).collect()
    }
}

fn parse_count(param: &str, value: &str) -> Result<usize> {
    value.parse::<usize>().map_err(|_| {
        let message = if value.parse::<i64>().is_ok() {
            format!("{} must be >= 0, got {}", param, value)
        } else {
            format!("{} must be an integer, got {:?}", param, value)
        };
        Error::validation(message)
            .with_detail("param", param)
            .with_detail("value", value)
    })
}

pub fn parse_skip_take(args: &[Arg]) -> Result<Page> {
    Page::parse_skip_take(args)
}

/// Apply the `skip`/`take` window found in `args`.
pub fn paginate<E>(items: Vec<E>, args: &[Arg]) -> Result<Vec<E>> {
    Ok(Page::parse_skip_take(args)?.apply(items))
}
