//! Results of observing the upstream object.

/// Outcome of Observe for one reconcile tick
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalObservation<O> {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    /// Observe copied server defaults into the declared spec
    pub resource_late_initialized: bool,
    /// What the upstream returned, when the object exists
    pub observation: Option<O>,
}

impl<O> ExternalObservation<O> {
    /// The upstream object does not exist (or is not known yet)
    pub fn absent() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: false,
            resource_late_initialized: false,
            observation: None,
        }
    }

    pub fn present(observation: O, up_to_date: bool, late_initialized: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            resource_late_initialized: late_initialized,
            observation: Some(observation),
        }
    }
}

/// What the reconcile tick did after observing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    UpToDate,
    Deleted,
    Orphaned,
}

impl ReconcileOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::UpToDate => "up_to_date",
            Self::Deleted => "deleted",
            Self::Orphaned => "orphaned",
        }
    }
}
