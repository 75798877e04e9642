//! Read-only projection of a store snapshot: filter, sort, paginate, and
//! totals over the filtered set.
//!
//! `view` borrows the snapshot and returns references into it; it never
//! mutates and always yields the same page for the same inputs.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::cmp::Ordering;

use chrono::NaiveDate;
use recordbox_core::{Entity, FieldValue};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A designated key of a record: one of the store-owned attributes or a
/// domain field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    Id,
    CreatedAt,
    UpdatedAt,
    Field(String),
}

impl FieldRef {
    pub fn field(name: impl Into<String>) -> Self {
        FieldRef::Field(name.into())
    }

    fn value<'a>(&self, entity: &'a Entity) -> Option<Cow<'a, FieldValue>> {
        match self {
            FieldRef::Id => Some(Cow::Owned(FieldValue::Text(entity.id.to_string()))),
            FieldRef::CreatedAt => Some(Cow::Owned(FieldValue::Text(entity.created_at.to_iso()))),
            FieldRef::UpdatedAt => Some(Cow::Owned(FieldValue::Text(entity.updated_at.to_iso()))),
            FieldRef::Field(name) => match entity.get(name) {
                None | Some(FieldValue::Null) => None,
                Some(v) => Some(Cow::Borrowed(v)),
            },
        }
    }

    fn date(&self, entity: &Entity) -> Option<NaiveDate> {
        match self {
            FieldRef::CreatedAt => Some(entity.created_at.date()),
            FieldRef::UpdatedAt => Some(entity.updated_at.date()),
            other => other.value(entity)?.as_date(),
        }
    }

    fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        match self {
            FieldRef::Id => a.id.cmp(&b.id),
            FieldRef::CreatedAt => a.created_at.cmp(&b.created_at),
            FieldRef::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            FieldRef::Field(_) => match (self.value(a), self.value(b)) {
                (Some(x), Some(y)) => x.sort_cmp(&y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Any of `fields` contains `needle`, ignoring case. An empty field
    /// list searches every domain field.
    Text { needle: String, fields: Vec<FieldRef> },
    Equals { field: FieldRef, value: FieldValue },
    /// Tag membership, ignoring case.
    Contains { field: FieldRef, item: String },
    /// Inclusive on both ends; either end may be open.
    DateRange {
        field: FieldRef,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

impl Predicate {
    fn matches(&self, entity: &Entity) -> bool {
        match self {
            Predicate::Text { needle, fields } => {
                let needle = needle.to_lowercase();
                if fields.is_empty() {
                    entity.fields.values().any(|v| v.matches_text(&needle))
                } else {
                    fields
                        .iter()
                        .any(|f| f.value(entity).is_some_and(|v| v.matches_text(&needle)))
                }
            }
            Predicate::Equals { field, value } => {
                field.value(entity).is_some_and(|v| *v == *value)
            }
            Predicate::Contains { field, item } => {
                field.value(entity).is_some_and(|v| v.contains_item(item))
            }
            Predicate::DateRange { field, from, to } => match field.date(entity) {
                Some(d) => from.is_none_or(|f| d >= f) && to.is_none_or(|t| d <= t),
                None => false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: FieldRef,
    pub direction: Direction,
}

impl Sort {
    pub fn by(key: FieldRef, direction: Direction) -> Self {
        Self { key, direction }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::by(FieldRef::field(field), Direction::Ascending)
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self::by(FieldRef::field(field), Direction::Descending)
    }

    pub fn newest() -> Self {
        Self::by(FieldRef::CreatedAt, Direction::Descending)
    }

    pub fn oldest() -> Self {
        Self::by(FieldRef::CreatedAt, Direction::Ascending)
    }

    /// Ties always fall back to id ascending, whatever the direction.
    fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        let primary = self.key.compare(a, b);
        let primary = match self.direction {
            Direction::Ascending => primary,
            Direction::Descending => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// 1-based page request. A zero page size is treated as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub sort: Option<Sort>,
    pub page: PageRequest,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive search; a blank needle adds no predicate.
    pub fn text(mut self, needle: &str, fields: &[FieldRef]) -> Self {
        let needle = needle.trim().to_lowercase();
        if !needle.is_empty() {
            self.predicates.push(Predicate::Text {
                needle,
                fields: fields.to_vec(),
            });
        }
        self
    }

    pub fn equals(mut self, field: FieldRef, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Equals {
            field,
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, field: FieldRef, item: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Contains {
            field,
            item: item.into(),
        });
        self
    }

    pub fn date_range(mut self, field: FieldRef, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.predicates.push(Predicate::DateRange { field, from, to });
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = PageRequest::new(page, page_size);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub items: Vec<&'a Entity>,
    /// The page actually returned, after clamping.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Filtered and sorted records, unpaginated. Without a sort the snapshot
/// order is kept.
pub fn filter_sorted<'a>(snapshot: &'a [Entity], query: &Query) -> Vec<&'a Entity> {
    let mut items: Vec<&Entity> = snapshot
        .iter()
        .filter(|e| query.predicates.iter().all(|p| p.matches(e)))
        .collect();
    if let Some(sort) = &query.sort {
        items.sort_by(|a, b| sort.compare(a, b));
    }
    items
}

pub fn view<'a>(snapshot: &'a [Entity], query: &Query) -> Page<'a> {
    let items = filter_sorted(snapshot, query);
    let total_items = items.len();
    let page_size = query.page.page_size.max(1);
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = query.page.page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let items = if start < total_items {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Per-group share of a [`Summary`].
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTotal {
    pub count: usize,
    pub total: f64,
}

/// Count and sum over every record a query matches. Pagination and sort are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub total: f64,
    /// Keyed by the group field's trimmed text; `None` collects records
    /// where the field is missing, null or blank.
    pub groups: BTreeMap<Option<String>, GroupTotal>,
}

impl Summary {
    pub fn group(&self, key: &str) -> Option<&GroupTotal> {
        self.groups.get(&Some(key.to_string()))
    }
}

/// Totals `sum_field` over the records matching `query`, overall and per
/// value of `group_field`. Non-numeric or missing amounts count as zero.
pub fn summarize(snapshot: &[Entity], query: &Query, group_field: &FieldRef, sum_field: &FieldRef) -> Summary {
    let mut summary = Summary::default();
    for entity in snapshot.iter().filter(|e| query.predicates.iter().all(|p| p.matches(e))) {
        let amount = sum_field
            .value(entity)
            .and_then(|v| v.as_number())
            .filter(|n| n.is_finite())
            .unwrap_or(0.0);
        let key = group_field.value(entity).and_then(|v| group_label(&v));

        summary.count += 1;
        summary.total += amount;
        let group = summary.groups.entry(key).or_insert(GroupTotal { count: 0, total: 0.0 });
        group.count += 1;
        group.total += amount;
    }
    summary
}

fn group_label(value: &FieldValue) -> Option<String> {
    let label = match value {
        FieldValue::Null => return None,
        FieldValue::Text(s) => s.trim().to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::List(items) => items.join(", "),
        FieldValue::Json(v) => v.to_string(),
    };
    (!label.is_empty()).then_some(label)
}
