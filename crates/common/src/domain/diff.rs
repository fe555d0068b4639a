use crate::domain::field::{FieldKind, FieldSet, FieldValue};
use std::collections::HashSet;

/// Diff configuration.
///
/// Array-valued comparisons are order-significant unless the field's kind is
/// opted into multiset comparison. Person-reference fields are the usual
/// candidate since the store returns them in nondeterministic order.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    order_insensitive: HashSet<FieldKind>,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order_insensitive(mut self, kind: FieldKind) -> Self {
        self.order_insensitive.insert(kind);
        self
    }
}

/// What a reconciliation pass should do with one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Create,
    Update,
    Skip,
}

impl ChangeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOutcome::Create => "create",
            ChangeOutcome::Update => "update",
            ChangeOutcome::Skip => "skip",
        }
    }
}

/// Outcome plus the exact field subset a mutation should carry
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub outcome: ChangeOutcome,
    pub changed: FieldSet,
}

/// A single field-level difference, for audit logging
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<FieldValue>,
    pub new: FieldValue,
}

/// Compute what to do with an incoming field set.
///
/// With no existing record the outcome is `Create`, carrying every non-empty
/// incoming field. Against an existing record only the keys present in
/// `after` are considered; `changed` is the exact differing subset, and an
/// empty subset means `Skip`.
pub fn diff_field_sets(
    before: Option<&FieldSet>,
    after: &FieldSet,
    opts: &DiffOptions,
) -> ChangeRecord {
    let Some(before) = before else {
        let changed = after
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        return ChangeRecord { outcome: ChangeOutcome::Create, changed };
    };

    let mut changed = FieldSet::new();
    for (name, new_value) in after {
        let unchanged = before
            .get(name)
            .is_some_and(|old| values_equal(old, new_value, opts));
        if !unchanged {
            changed.insert(name.clone(), new_value.clone());
        }
    }

    let outcome = if changed.is_empty() { ChangeOutcome::Skip } else { ChangeOutcome::Update };
    ChangeRecord { outcome, changed }
}

/// Field-level differences between two field sets, keyed by the new side
pub fn field_changes(before: &FieldSet, after: &FieldSet) -> Vec<FieldChange> {
    after
        .iter()
        .filter(|(name, new_value)| before.get(*name) != Some(new_value))
        .map(|(name, new_value)| FieldChange {
            field: name.clone(),
            old: before.get(name).cloned(),
            new: new_value.clone(),
        })
        .collect()
}

fn values_equal(old: &FieldValue, new: &FieldValue, opts: &DiffOptions) -> bool {
    if old.kind() != new.kind() {
        return false;
    }
    if opts.order_insensitive.contains(&new.kind()) {
        if let (Some(a), Some(b)) = (canonical_elements(old), canonical_elements(new)) {
            return a == b;
        }
    }
    old == new
}

// Sorted canonical JSON of the list elements, for multiset comparison
fn canonical_elements(value: &FieldValue) -> Option<Vec<String>> {
    let items = match value.to_json() {
        serde_json::Value::Array(items) => items,
        _ => return None,
    };
    let mut canon: Vec<String> = items.iter().map(|v| v.to_string()).collect();
    canon.sort();
    Some(canon)
}
