//! # Diff Helpers
//!
//! Field comparison rules shared by every kind's `is_up_to_date` and `late_initialize`.
//!
//! Optional fields fall in one of two categories:
//!
//! - **adopt**: unset means "keep whatever the provider has". The field never causes drift
//!   while unset and late initialization copies the observed value in.
//! - **enforce**: unset means "the provider default". An observed non-default value is drift,
//!   and the field is never late-initialized.
//!
//! Set fields of either category must equal the observed value under the comparison chosen
//! for the field.

use std::collections::BTreeMap;
use tracing::debug;

/// Accumulates per-field results for one `is_up_to_date` call
#[derive(Debug)]
pub struct Drift {
    kind: &'static str,
    drifted: Vec<&'static str>,
}

impl Drift {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            drifted: Vec::new(),
        }
    }

    /// Record a field whose comparison was done by the caller
    pub fn check(&mut self, field: &'static str, equal: bool) -> &mut Self {
        if !equal {
            self.drifted.push(field);
        }
        self
    }

    /// Adopt field compared with `==`
    pub fn adopt<T: PartialEq>(
        &mut self,
        field: &'static str,
        desired: Option<&T>,
        observed: Option<&T>,
    ) -> &mut Self {
        self.adopt_with(field, desired, observed, |a, b| a == b)
    }

    /// Adopt field with a custom comparison
    pub fn adopt_with<T: ?Sized>(
        &mut self,
        field: &'static str,
        desired: Option<&T>,
        observed: Option<&T>,
        eq: impl Fn(&T, &T) -> bool,
    ) -> &mut Self {
        let equal = match (desired, observed) {
            (None, _) => true,
            (Some(desired), Some(observed)) => eq(desired, observed),
            (Some(_), None) => false,
        };
        self.check(field, equal)
    }

    /// Enforce field compared with `==`, default taken from `T::default()`
    pub fn enforce<T: PartialEq + Default>(
        &mut self,
        field: &'static str,
        desired: Option<&T>,
        observed: Option<&T>,
    ) -> &mut Self {
        self.enforce_with(field, desired, observed, |a, b| a == b, |v| *v == T::default())
    }

    /// Enforce field with a custom comparison and default test
    pub fn enforce_with<T: ?Sized>(
        &mut self,
        field: &'static str,
        desired: Option<&T>,
        observed: Option<&T>,
        eq: impl Fn(&T, &T) -> bool,
        is_default: impl Fn(&T) -> bool,
    ) -> &mut Self {
        let equal = match (desired, observed) {
            (None, None) => true,
            (None, Some(observed)) => is_default(observed),
            (Some(desired), Some(observed)) => eq(desired, observed),
            (Some(desired), None) => is_default(desired),
        };
        self.check(field, equal)
    }

    /// Names of the fields that drifted
    pub fn drifted(&self) -> &[&'static str] {
        &self.drifted
    }

    /// Final verdict; drifted field names are logged at debug
    pub fn is_up_to_date(&self) -> bool {
        if self.drifted.is_empty() {
            return true;
        }
        debug!(kind = self.kind, fields = ?self.drifted, "observed state drifted from spec");
        false
    }
}

/// Element-wise, order sensitive
pub fn ordered_eq<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a == b
}

/// Element-wise, order insensitive (multiset)
pub fn unordered_eq<T: Ord + Clone>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

/// Shallow: lengths only
pub fn same_len<T>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len()
}

/// Shallow: key presence only
pub fn same_keys<K: Ord, V>(a: &BTreeMap<K, V>, b: &BTreeMap<K, V>) -> bool {
    a.len() == b.len() && a.keys().all(|key| b.contains_key(key))
}

/// Copy a non-default observed value into an unset adopt field
pub fn late_init<T: Clone + Default + PartialEq>(desired: &mut Option<T>, observed: Option<&T>) -> bool {
    match (desired.as_ref(), observed) {
        (None, Some(observed)) if *observed != T::default() => {
            *desired = Some(observed.clone());
            true
        }
        _ => false,
    }
}
