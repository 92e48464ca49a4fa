//! Per-statement execution context

use super::{FieldSelector, Loader, Predicate, Record, SortFunction};
use crate::error::{Error, Result};
use crate::query::Statement;
use crate::schema::paginate::Page;
use once_cell::unsync::OnceCell;
use std::borrow::Borrow;

/// Memoized loader call. The loader runs on first access and at most once;
/// its error is memoized too.
pub struct LazyItems<'a, T> {
    loader: Option<&'a Loader<T>>,
    cell: OnceCell<Result<Vec<T>>>,
}

impl<'a, T> LazyItems<'a, T> {
    pub fn new(loader: Option<&'a Loader<T>>) -> Self {
        Self {
            loader,
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<&[T]> {
        let loaded = self.cell.get_or_init(|| match self.loader {
            Some(load) => load(),
            None => Err(Error::internal("no entity loader configured")),
        });
        match loaded {
            Ok(items) => Ok(items.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Everything an operation handler gets. Filtering, sorting and pagination
/// are opt-in: the engine applies none of them on its own.
pub struct OperationContext<'a, T> {
    pub statement: &'a Statement,
    pub selector: FieldSelector<'a, T>,
    pub predicate: Predicate<'a, T>,
    /// `Some` whenever the schema has sortable fields.
    pub sort: Option<SortFunction<'a, T>>,
    pub(crate) items: LazyItems<'a, T>,
}

impl<'a, T> OperationContext<'a, T> {
    /// All loaded entities, in loader order.
    pub fn items(&self) -> Result<&[T]> {
        self.items.get()
    }

    /// Entities passing the statement's filters.
    pub fn filtered(&self) -> Result<Vec<&T>> {
        Ok(super::filter_items(self.items()?, &self.predicate))
    }

    /// Apply the statement's sort directives, if any.
    pub fn sort_items<E: Borrow<T>>(&self, items: &mut [E]) {
        if let Some(sort) = &self.sort {
            sort.sort(items);
        }
    }

    pub fn paginate<E>(&self, items: Vec<E>) -> Result<Vec<E>> {
        Ok(Page::parse_skip_take(&self.statement.args)?.apply(items))
    }

    pub fn project(&self, item: &T) -> Record {
        self.selector.apply(item)
    }

    /// filter, sort, paginate, project.
    pub fn page(&self) -> Result<Vec<Record>> {
        let page = Page::parse_skip_take(&self.statement.args)?;
        let mut items = self.filtered()?;
        self.sort_items(&mut items);
        Ok(page
            .apply(items)
            .into_iter()
            .map(|item| self.project(item))
            .collect())
    }
}
