//! Multi-key sorting
//!
//! `sort_<field>=asc|desc` arguments become an ordered list of directives;
//! the first directive whose comparator disagrees decides.

use super::SortComparator;
use crate::error::{Error, Result};
use crate::query::Arg;
use crate::types::SORT_PREFIX;
use indexmap::IndexMap;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDirective {
    pub field: String,
    pub direction: SortDirection,
}

/// Extract sort directives in argument order. An empty value means `asc`.
pub fn parse_sort_directives(args: &[Arg]) -> Result<Vec<SortDirective>> {
    let mut directives = Vec::new();

    for arg in args {
        let Some(field) = arg.key().and_then(|k| k.strip_prefix(SORT_PREFIX)) else {
            continue;
        };
        if field.is_empty() {
            return Err(Error::validation("sort_ prefix requires a field name")
                .with_detail("arg", arg.key().unwrap_or_default()));
        }

        let direction = match arg.value.to_lowercase().as_str() {
            "" | "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => {
                return Err(Error::validation(format!(
                    "sort direction must be 'asc' or 'desc', got {:?}",
                    arg.value
                ))
                .with_detail("field", field)
                .with_detail("value", arg.value.as_str()))
            }
        };

        directives.push(SortDirective {
            field: field.to_string(),
            direction,
        });
    }

    Ok(directives)
}

/// Composed comparator. Empty means "keep input order".
pub struct SortFunction<'a, T> {
    steps: Vec<(&'a SortComparator<T>, SortDirection)>,
}

impl<'a, T> SortFunction<'a, T> {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        for (compare, direction) in &self.steps {
            let ord = match direction {
                SortDirection::Asc => compare(a, b),
                SortDirection::Desc => compare(a, b).reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable in-place sort. A no-op without directives.
    pub fn sort<E: Borrow<T>>(&self, items: &mut [E]) {
        if self.is_empty() {
            return;
        }
        items.sort_by(|a, b| {
            self.compare(<E as Borrow<T>>::borrow(a), <E as Borrow<T>>::borrow(b))
        });
    }
}

pub fn build_sort_function<'a, T>(
    directives: &[SortDirective],
    sorts: &'a IndexMap<String, SortComparator<T>>,
) -> Result<SortFunction<'a, T>> {
    let steps = directives
        .iter()
        .map(|directive| {
            sorts
                .get(&directive.field)
                .map(|compare| (compare, directive.direction))
                .ok_or_else(|| {
                    Error::validation(format!("field {:?} is not sortable", directive.field))
                        .with_detail("field", directive.field.as_str())
                })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SortFunction { steps })
}

/// Parse directives from `args` and sort `items` with them.
pub fn sort_slice<T, E: Borrow<T>>(
    items: &mut [E],
    args: &[Arg],
    sorts: &IndexMap<String, SortComparator<T>>,
) -> Result<()> {
    let directives = parse_sort_directives(args)?;
    build_sort_function(&directives, sorts)?.sort(items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: usize,
        group: u8,
        rank: u8,
    }

    fn sorts() -> IndexMap<String, SortComparator<Row>> {
        let mut sorts: IndexMap<String, SortComparator<Row>> = IndexMap::new();
        sorts.insert(
            "group".to_string(),
            Box::new(|a: &Row, b: &Row| a.group.cmp(&b.group)),
        );
        sorts.insert(
            "rank".to_string(),
            Box::new(|a: &Row, b: &Row| a.rank.cmp(&b.rank)),
        );
        sorts
    }

    fn rows(pairs: &[(u8, u8)]) -> Vec<Row> {
        pairs
            .iter()
            .enumerate()
            .map(|(id, &(group, rank))| Row { id, group, rank })
            .collect()
    }

    fn ids(rows: &[Row]) -> Vec<usize> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_parse_directives() {
        let args = vec![
            Arg::keyed("sort_rank", "DESC"),
            Arg::keyed("status", "todo"),
            Arg::keyed("sort_group", ""),
            Arg::positional("sort_ignored"),
        ];
        let directives = parse_sort_directives(&args).unwrap();
        assert_eq!(
            directives,
            vec![
                SortDirective {
                    field: "rank".to_string(),
                    direction: SortDirection::Desc
                },
                SortDirective {
                    field: "group".to_string(),
                    direction: SortDirection::Asc
                },
            ]
        );
    }

    #[test]
    fn test_parse_directive_errors() {
        let err = parse_sort_directives(&[Arg::keyed("sort_", "asc")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);

        let err = parse_sort_directives(&[Arg::keyed("sort_rank", "up")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(err.field(), Some("rank"));
    }

    #[test]
    fn test_unknown_sort_field() {
        let sorts = sorts();
        let directives = parse_sort_directives(&[Arg::keyed("sort_name", "asc")]).unwrap();
        let err = build_sort_function(&directives, &sorts).err().unwrap();
        assert_eq!(err.field(), Some("name"));
    }

    #[test]
    fn test_multi_key_first_disagreement_wins() {
        let sorts = sorts();
        let mut items = rows(&[(2, 1), (1, 5), (2, 9), (1, 3)]);
        let args = vec![Arg::keyed("sort_group", "asc"), Arg::keyed("sort_rank", "desc")];
        sort_slice(&mut items, &args, &sorts).unwrap();
        assert_eq!(ids(&items), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_no_directives_keeps_order() {
        let sorts = sorts();
        let mut items = rows(&[(3, 0), (1, 0), (2, 0)]);
        sort_slice(&mut items, &[], &sorts).unwrap();
        assert_eq!(ids(&items), vec![0, 1, 2]);
    }

    #[test]
    fn test_sort_references() {
        let sorts = sorts();
        let items = rows(&[(3, 0), (1, 0), (2, 0)]);
        let mut refs: Vec<&Row> = items.iter().collect();
        let directives = parse_sort_directives(&[Arg::keyed("sort_group", "desc")]).unwrap();
        build_sort_function(&directives, &sorts).unwrap().sort(&mut refs);
        let groups: Vec<u8> = refs.iter().map(|r| r.group).collect();
        assert_eq!(groups, vec![3, 2, 1]);
    }

    #[test]
    fn test_shuffled_input_sorts_to_same_keys() {
        let sorts = sorts();
        let mut items = rows(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6)]);
        items.shuffle(&mut rand::thread_rng());
        sort_slice(&mut items, &[Arg::keyed("sort_rank", "asc")], &sorts).unwrap();
        let ranks: Vec<u8> = items.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
    }

    proptest! {
        #[test]
        fn prop_sort_is_stable_and_idempotent(
            pairs in proptest::collection::vec((0u8..4, 0u8..4), 0..40),
            desc in any::<bool>(),
        ) {
            let sorts = sorts();
            let direction = if desc { "desc" } else { "asc" };
            let args = vec![Arg::keyed("sort_group", direction)];

            let mut once = rows(&pairs);
            sort_slice(&mut once, &args, &sorts).unwrap();

            // equal keys keep their input order
            for window in once.windows(2) {
                if window[0].group == window[1].group {
                    prop_assert!(window[0].id < window[1].id);
                }
            }

            let mut twice = once.clone();
            sort_slice(&mut twice, &args, &sorts).unwrap();
            prop_assert_eq!(ids(&once), ids(&twice));
        }
    }
}
