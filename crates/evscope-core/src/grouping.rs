//! Order-preserving grouping of records
//!
//! Groups keep first-seen order. Sorting is always an explicit, separate step.

use crate::classifier::{classify_eligibility, classify_ev_type};
use crate::metrics::vehicle_age;
use crate::VehicleRecord;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Discriminator value of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Number(i64),
    Text(String),
}

impl GroupKey {
    pub fn text(s: impl Into<String>) -> Self {
        GroupKey::Text(s.into())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Number(n) => write!(f, "{}", n),
            GroupKey::Text(s) => f.write_str(s),
        }
    }
}

/// Grouping dimensions understood by the query façade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Maker,
    Model,
    MakeModel,
    Region,
    County,
    City,
    ModelYear,
    Age,
    EvType,
    Eligibility,
}

impl Dimension {
    pub const ALL: [Dimension; 10] = [
        Dimension::Maker,
        Dimension::Model,
        Dimension::MakeModel,
        Dimension::Region,
        Dimension::County,
        Dimension::City,
        Dimension::ModelYear,
        Dimension::Age,
        Dimension::EvType,
        Dimension::Eligibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Maker => "maker",
            Dimension::Model => "model",
            Dimension::MakeModel => "make_model",
            Dimension::Region => "region",
            Dimension::County => "county",
            Dimension::City => "city",
            Dimension::ModelYear => "model_year",
            Dimension::Age => "age",
            Dimension::EvType => "ev_type",
            Dimension::Eligibility => "eligibility",
        }
    }

    /// Accepts snake_case, kebab-case and camelCase spellings.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Dimension> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().replace('_', "") == normalized)
    }

    /// Extracts the group key of `record`, or `None` when the record has no
    /// value for this dimension and must be excluded.
    pub fn key_for(&self, record: &VehicleRecord, as_of_year: i32) -> Option<GroupKey> {
        match self {
            Dimension::Maker => Some(GroupKey::text(record.make())),
            Dimension::Model => Some(GroupKey::text(record.model())),
            Dimension::MakeModel => Some(GroupKey::Text(record.display_name())),
            Dimension::Region => record.region_key().map(GroupKey::text),
            Dimension::County => record.county().map(GroupKey::text),
            Dimension::City => record.city().map(GroupKey::text),
            Dimension::ModelYear => record.model_year().map(|y| GroupKey::Number(i64::from(y))),
            Dimension::Age => vehicle_age(record, as_of_year).map(GroupKey::Number),
            Dimension::EvType => Some(GroupKey::text(classify_ev_type(record).label())),
            Dimension::Eligibility => Some(GroupKey::text(classify_eligibility(record).label())),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered mapping of group key to the records that produced it.
#[derive(Debug, Clone)]
pub struct GroupMap<'a, K = GroupKey> {
    groups: Vec<(K, Vec<&'a VehicleRecord>)>,
    index: HashMap<K, usize>,
    excluded: usize,
}

impl<'a, K> GroupMap<'a, K>
where
    K: Eq + Hash + Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            groups: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            excluded: 0,
        }
    }

    fn push(&mut self, key: K, record: &'a VehicleRecord) {
        match self.index.get(&key) {
            Some(&slot) => self.groups[slot].1.push(record),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push((key, vec![record]));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Records dropped because the key function returned `None`.
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Records placed in some group.
    pub fn grouped(&self) -> usize {
        self.groups.iter().map(|(_, members)| members.len()).sum()
    }

    pub fn get(&self, key: &K) -> Option<&[&'a VehicleRecord]> {
        self.index
            .get(key)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.groups.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[&'a VehicleRecord])> {
        self.groups
            .iter()
            .map(|(key, members)| (key, members.as_slice()))
    }

    /// Group sizes in group order.
    pub fn counts(&self) -> Vec<(K, usize)> {
        self.groups
            .iter()
            .map(|(key, members)| (key.clone(), members.len()))
            .collect()
    }

    /// Same groups, reordered by key.
    pub fn sorted_by_key(mut self) -> Self
    where
        K: Ord,
    {
        self.groups.sort_by(|a, b| a.0.cmp(&b.0));
        self.index = self
            .groups
            .iter()
            .enumerate()
            .map(|(slot, (key, _))| (key.clone(), slot))
            .collect();
        self
    }
}

/// Partition `records` by `key_fn`. Records whose key is `None` are counted in
/// [`GroupMap::excluded`] rather than silently dropped.
pub fn group_by<'a, K, I, F>(records: I, mut key_fn: F) -> GroupMap<'a, K>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a VehicleRecord>,
    F: FnMut(&VehicleRecord) -> Option<K>,
{
    let mut map = GroupMap::with_capacity(16);
    for record in records {
        match key_fn(record) {
            Some(key) => map.push(key, record),
            None => map.excluded += 1,
        }
    }
    map
}

pub fn group_by_dimension<'a, I>(records: I, dimension: Dimension, as_of_year: i32) -> GroupMap<'a>
where
    I: IntoIterator<Item = &'a VehicleRecord>,
{
    group_by(records, |record| dimension.key_for(record, as_of_year))
}

/// Two-level grouping: each outer group is grouped again by the inner key.
#[derive(Debug, Clone)]
pub struct CrossTab<'a, K1 = GroupKey, K2 = GroupKey> {
    pub rows: Vec<(K1, GroupMap<'a, K2>)>,
    /// Records without an outer key.
    pub excluded: usize,
}

impl<'a, K1, K2> CrossTab<'a, K1, K2>
where
    K2: Eq + Hash + Clone,
{
    /// Records excluded at either level.
    pub fn total_excluded(&self) -> usize {
        self.excluded + self.rows.iter().map(|(_, inner)| inner.excluded()).sum::<usize>()
    }
}

pub fn crosstab<'a, K1, K2, I, F, G>(records: I, outer: F, mut inner: G) -> CrossTab<'a, K1, K2>
where
    K1: Eq + Hash + Clone,
    K2: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a VehicleRecord>,
    F: FnMut(&VehicleRecord) -> Option<K1>,
    G: FnMut(&VehicleRecord) -> Option<K2>,
{
    let outer_groups = group_by(records, outer);
    let excluded = outer_groups.excluded();
    let rows = outer_groups
        .groups
        .into_iter()
        .map(|(key, members)| (key, group_by(members, &mut inner)))
        .collect();

    CrossTab { rows, excluded }
}
