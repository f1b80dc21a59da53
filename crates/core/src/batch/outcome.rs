//! Typed per-item outcomes and the aggregate batch report

/// Result of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(err) => Err(err),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}

/// Aggregate report of a batch operation.
///
/// `successful + failed == total` and `per_item` has `total` entries in
/// input order. The counts are derived from the entries, so the only way to
/// build a report is [`BatchResult::from_outcomes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult<I, T, E> {
    successful: usize,
    failed: usize,
    per_item: Vec<(I, Outcome<T, E>)>,
}

impl<I, T, E> BatchResult<I, T, E> {
    pub fn from_outcomes(per_item: Vec<(I, Outcome<T, E>)>) -> Self {
        let successful = per_item.iter().filter(|(_, outcome)| outcome.is_success()).count();
        let failed = per_item.len() - successful;
        Self { successful, failed, per_item }
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.per_item.len()
    }

    /// Every item paired with its outcome, in input order
    pub fn per_item(&self) -> &[(I, Outcome<T, E>)] {
        &self.per_item
    }

    /// Itemized error list
    pub fn failures(&self) -> impl Iterator<Item = (&I, &E)> {
        self.per_item.iter().filter_map(|(item, outcome)| outcome.failure().map(|err| (item, err)))
    }

    pub fn successes(&self) -> impl Iterator<Item = (&I, &T)> {
        self.per_item.iter().filter_map(|(item, outcome)| outcome.success().map(|val| (item, val)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn into_items(self) -> Vec<(I, Outcome<T, E>)> {
        self.per_item
    }
}
