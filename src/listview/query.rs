//! View query state and the pure filter → sort → page pipeline.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::Record;

/// Filter value that disables a dimension.
pub const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: String,
    pub direction: SortDirection,
}

/// Transient per-screen search, filter, sort, paging and selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    pub filters: BTreeMap<String, String>,
    pub sort: Option<SortSpec>,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
    pub selected: BTreeSet<String>,
}

impl ViewQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            sort: None,
            page: 1,
            page_size: page_size.max(1),
            selected: BTreeSet::new(),
        }
    }

    /// Filters that actually constrain the result (not empty, not `all`).
    pub fn active_filters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter(|(_, v)| !v.is_empty() && !v.eq_ignore_ascii_case(ALL))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self::new(10)
    }
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct View<R> {
    pub items: Vec<R>,
    /// Items matching search and filters, across all pages.
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl<R> View<R> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn total_pages(total: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    ((total + size - 1) / size).max(1)
}

fn matches_search<R: Record>(item: &R, needle: &str, search_fields: &[&str]) -> bool {
    if needle.is_empty() {
        return true;
    }
    search_fields.iter().any(|key| {
        item.field(key)
            .map(|v| v.display().to_lowercase().contains(needle))
            .unwrap_or(false)
    })
}

fn matches_filters<R: Record>(item: &R, query: &ViewQuery) -> bool {
    query.active_filters().all(|(dimension, wanted)| {
        item.field(dimension)
            .map(|v| v.display().to_lowercase() == wanted.to_lowercase())
            .unwrap_or(false)
    })
}

fn compare_by<R: Record>(a: &R, b: &R, key: &str) -> Ordering {
    match (a.field(key), b.field(key)) {
        (Some(x), Some(y)) => x.compare(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Steps 1-3 of the pipeline: search, categorical filters, stable sort.
pub fn filtered<'a, R: Record>(
    items: &'a [R],
    query: &ViewQuery,
    search_fields: &[&str],
) -> Vec<&'a R> {
    let needle = query.search.to_lowercase();
    let mut out: Vec<&R> = items
        .iter()
        .filter(|item| matches_search(*item, &needle, search_fields))
        .filter(|item| matches_filters(*item, query))
        .collect();

    if let Some(sort) = &query.sort {
        match sort.direction {
            SortDirection::Ascending => out.sort_by(|a, b| compare_by(*a, *b, &sort.key)),
            SortDirection::Descending => out.sort_by(|a, b| compare_by(*b, *a, &sort.key)),
        }
    }
    out
}

/// Full pipeline. Pure: the same inputs always give the same page.
/// A page past the end yields an empty slice.
pub fn recompute<R: Record>(items: &[R], query: &ViewQuery, search_fields: &[&str]) -> View<R> {
    let matching = filtered(items, query, search_fields);
    let total = matching.len();
    let size = query.page_size.max(1);
    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(size);
    let visible = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(size).min(total);
        matching[start..end].iter().map(|item| (*item).clone()).collect()
    };
    View {
        items: visible,
        total,
        page,
        total_pages: total_pages(total, size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldValue;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: String,
        name: String,
        kind: String,
        qty: f64,
    }

    impl Record for Row {
        const SEARCH_FIELDS: &'static [&'static str] = &["name"];
        const FILTER_DIMENSIONS: &'static [&'static str] = &["kind"];
        const SORT_KEYS: &'static [&'static str] = &["name", "qty"];

        fn id(&self) -> Option<&str> {
            Some(&self.id)
        }

        fn field(&self, key: &str) -> Option<FieldValue> {
            match key {
                "name" => Some(FieldValue::Text(self.name.clone())),
                "kind" => Some(FieldValue::Text(self.kind.clone())),
                "qty" => Some(FieldValue::Number(self.qty)),
                _ => None,
            }
        }

        fn set_active(&mut self, _active: bool) {}
    }

    fn row(id: usize, name: &str, kind: &str, qty: f64) -> Row {
        Row {
            id: format!("r{}", id),
            name: name.into(),
            kind: kind.into(),
            qty,
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            row(1, "Meja Makan", "Meja", 2.0),
            row(2, "Tempat Tidur", "Kasur", 4.0),
            row(3, "Lemari Baju", "Lemari", 8.0),
            row(4, "Kursi Ergonomis", "Kursi", 20.0),
            row(5, "Meja Belajar", "Meja", 12.0),
            row(6, "kursi cafe", "Kursi", 16.0),
            row(7, "Rak Buku", "Rak", 29.0),
        ]
    }

    fn query(page_size: usize) -> ViewQuery {
        ViewQuery::new(page_size)
    }

    #[test]
    fn recompute_is_pure() {
        let items = rows();
        let mut q = query(3);
        q.search = "e".into();
        q.sort = Some(SortSpec {
            key: "qty".into(),
            direction: SortDirection::Descending,
        });
        assert_eq!(
            recompute(&items, &q, Row::SEARCH_FIELDS),
            recompute(&items, &q, Row::SEARCH_FIELDS)
        );
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let items = rows();
        let mut q = query(50);
        q.search = "KURSI".into();
        let view = recompute(&items, &q, Row::SEARCH_FIELDS);
        assert_eq!(view.total, 2);
        assert!(view
            .items
            .iter()
            .all(|r| r.name.to_lowercase().contains("kursi")));

        q.search.clear();
        assert_eq!(recompute(&items, &q, Row::SEARCH_FIELDS).total, items.len());
    }

    #[test]
    fn categorical_filter_with_all_sentinel() {
        let items = rows();
        let mut q = query(50);
        q.filters.insert("kind".into(), "meja".into());
        let view = recompute(&items, &q, Row::SEARCH_FIELDS);
        assert_eq!(view.total, 2);

        q.filters.insert("kind".into(), "ALL".into());
        assert_eq!(recompute(&items, &q, Row::SEARCH_FIELDS).total, items.len());
    }

    #[test]
    fn pages_partition_the_filtered_set() {
        let items = rows();
        let mut q = query(3);
        q.sort = Some(SortSpec {
            key: "name".into(),
            direction: SortDirection::Ascending,
        });
        let expected: Vec<Row> = filtered(&items, &q, Row::SEARCH_FIELDS)
            .into_iter()
            .cloned()
            .collect();

        let pages = total_pages(expected.len(), 3);
        assert_eq!(pages, 3);
        let mut joined = Vec::new();
        for page in 1..=pages {
            q.page = page;
            let view = recompute(&items, &q, Row::SEARCH_FIELDS);
            assert!(view.items.len() <= 3);
            joined.extend(view.items);
        }
        assert_eq!(joined, expected);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let items = rows();
        let mut q = query(5);
        q.page = 99;
        let view = recompute(&items, &q, Row::SEARCH_FIELDS);
        assert!(view.is_empty());
        assert_eq!(view.total, items.len());
        assert_eq!(view.total_pages, 2);

        let empty: Vec<Row> = Vec::new();
        let view = recompute(&empty, &query(5), Row::SEARCH_FIELDS);
        assert!(view.is_empty());
        assert_eq!(view.total_pages, 1);
    }

    #[test]
    fn descending_reverses_ascending_for_distinct_keys() {
        let items = rows();
        let mut q = query(50);
        q.sort = Some(SortSpec {
            key: "qty".into(),
            direction: SortDirection::Ascending,
        });
        let asc = recompute(&items, &q, Row::SEARCH_FIELDS).items;
        q.sort = Some(SortSpec {
            key: "qty".into(),
            direction: SortDirection::Descending,
        });
        let mut desc = recompute(&items, &q, Row::SEARCH_FIELDS).items;
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn text_sort_ignores_case_and_is_stable() {
        let mut items = rows();
        items.push(row(8, "meja makan", "Meja", 1.0));
        let mut q = query(50);
        q.sort = Some(SortSpec {
            key: "name".into(),
            direction: SortDirection::Ascending,
        });
        let names: Vec<String> = recompute(&items, &q, Row::SEARCH_FIELDS)
            .items
            .into_iter()
            .map(|r| r.id)
            .collect();
        // r1 and r8 compare equal; original order is kept.
        let r1 = names.iter().position(|id| id == "r1").unwrap();
        let r8 = names.iter().position(|id| id == "r8").unwrap();
        assert_eq!(r8, r1 + 1);
        assert_eq!(names[0], "r6");
    }
}
