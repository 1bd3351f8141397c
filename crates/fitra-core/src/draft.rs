//! Draft value types shared by the store, the fetcher, and the controller.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::input::parse_field_value;

/// One of the three numeric fields of an item entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Weight,
    Reps,
    Sets,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Weight, Field::Reps, Field::Sets];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Reps => "reps",
            Self::Sets => "sets",
        }
    }

    /// Parse a field name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" => Some(Self::Weight),
            "reps" => Some(Self::Reps),
            "sets" => Some(Self::Sets),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item entry. Each field is either a finite number or unset (`None`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default, deserialize_with = "unset_or_number")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "unset_or_number")]
    pub reps: Option<f64>,
    #[serde(default, deserialize_with = "unset_or_number")]
    pub sets: Option<f64>,
}

impl ItemInput {
    pub fn new(weight: Option<f64>, reps: Option<f64>, sets: Option<f64>) -> Self {
        Self { weight, reps, sets }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        match field {
            Field::Weight => self.weight,
            Field::Reps => self.reps,
            Field::Sets => self.sets,
        }
    }

    /// Replace one field. Non-finite values are stored as unset.
    pub fn set(&mut self, field: Field, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match field {
            Field::Weight => self.weight = value,
            Field::Reps => self.reps = value,
            Field::Sets => self.sets = value,
        }
    }

    pub fn is_unset(&self) -> bool {
        Field::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// Stored drafts may carry `""` for unset fields, as the form used to write.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

fn unset_or_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawValue::Number(n)) if n.is_finite() => Some(n),
        Some(RawValue::Text(s)) => parse_field_value(&s),
        _ => None,
    })
}

// ── Selection ──

/// The caller-supplied set of selected item ids.
///
/// Duplicates are dropped; first-seen order is kept for display and
/// summaries, while equality is set membership.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    order: Vec<String>,
    set: BTreeSet<String>,
}

impl Selection {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sel = Self::default();
        for item in items {
            let item = item.into();
            if item.is_empty() {
                continue;
            }
            if sel.set.insert(item.clone()) {
                sel.order.push(item);
            }
        }
        sel
    }

    pub fn contains(&self, item: &str) -> bool {
        self.set.contains(item)
    }

    /// Items in selection order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}

impl Eq for Selection {}

// ── Draft state ──

/// Item id → entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftState(BTreeMap<String, ItemInput>);

impl DraftState {
    /// The canonical-empty draft: every selected item present, every field unset.
    pub fn empty(selection: &Selection) -> Self {
        Self(
            selection
                .iter()
                .map(|item| (item.to_string(), ItemInput::default()))
                .collect(),
        )
    }

    /// Structural equality against the canonical-empty draft for `selection`.
    ///
    /// Key sets must match exactly: a draft holding a different item is
    /// not empty for this selection even if all its fields are unset.
    pub fn is_canonical_empty(&self, selection: &Selection) -> bool {
        *self == Self::empty(selection)
    }

    /// Restrict to `selection`, filling missing items with unset entries.
    pub fn conform(mut self, selection: &Selection) -> Self {
        self.0.retain(|item, _| selection.contains(item));
        for item in selection.iter() {
            self.0.entry(item.to_string()).or_default();
        }
        self
    }

    /// Fresh canonical-empty draft with remote values copied in for the
    /// selected items the remote knows about. Items outside `selection`
    /// are never added.
    pub fn from_latest(selection: &Selection, latest: &RemoteLatest) -> Self {
        let mut next = Self::empty(selection);
        for (item, entry) in next.0.iter_mut() {
            if let Some(remote) = latest.get(item) {
                *entry = *remote;
            }
        }
        next
    }

    /// Replace one field of one item. Returns `false` when the item is not
    /// part of the draft; the draft is left untouched in that case.
    pub fn set_field(&mut self, item: &str, field: Field, value: Option<f64>) -> bool {
        match self.0.get_mut(item) {
            Some(entry) => {
                entry.set(field, value);
                true
            }
            None => false,
        }
    }

    /// True when some selected item has at least one set field.
    pub fn has_any_input(&self, selection: &Selection) -> bool {
        selection
            .iter()
            .filter_map(|item| self.0.get(item))
            .any(|entry| !entry.is_unset())
    }

    pub fn get(&self, item: &str) -> Option<&ItemInput> {
        self.0.get(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ItemInput)> {
        self.0.iter()
    }

    pub fn item_ids(&self) -> BTreeSet<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ItemInput)> for DraftState {
    fn from_iter<T: IntoIterator<Item = (String, ItemInput)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Last-known values per item, as recorded before the drafting session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteLatest(BTreeMap<String, ItemInput>);

impl RemoteLatest {
    pub fn get(&self, item: &str) -> Option<&ItemInput> {
        self.0.get(item)
    }

    pub fn insert(&mut self, item: impl Into<String>, input: ItemInput) {
        self.0.insert(item.into(), input);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ItemInput)> for RemoteLatest {
    fn from_iter<T: IntoIterator<Item = (String, ItemInput)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
