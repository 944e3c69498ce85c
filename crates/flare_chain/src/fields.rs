//! Per-field results of batched reads and the tri-state lookup.

use serde::{Deserialize, Serialize};

use crate::ledger::CallOutcome;

/// Outcome of reading one named field of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum FieldResult<T> {
    Success(T),
    Failure(String),
    Pending,
}

impl<T> Default for FieldResult<T> {
    fn default() -> Self {
        Self::Pending
    }
}

impl<T> FieldResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_ref(&self) -> FieldResult<&T> {
        match self {
            Self::Success(v) => FieldResult::Success(v),
            Self::Failure(r) => FieldResult::Failure(r.clone()),
            Self::Pending => FieldResult::Pending,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    /// The value, or `fallback` for failed and pending fields.
    pub fn unwrap_or(self, fallback: T) -> T {
        self.ok().unwrap_or(fallback)
    }

    pub fn unwrap_or_else(self, fallback: impl FnOnce() -> T) -> T {
        self.ok().unwrap_or_else(fallback)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldResult<U> {
        match self {
            Self::Success(v) => FieldResult::Success(f(v)),
            Self::Failure(r) => FieldResult::Failure(r),
            Self::Pending => FieldResult::Pending,
        }
    }

    /// Decode a raw call outcome; a decode error is a failure of this field only.
    pub fn decode<E: std::fmt::Display>(
        outcome: &CallOutcome,
        decoder: impl FnOnce(&[u8]) -> Result<T, E>,
    ) -> Self {
        match outcome {
            Ok(bytes) => match decoder(&bytes[..]) {
                Ok(v) => Self::Success(v),
                Err(e) => Self::Failure(e.to_string()),
            },
            Err(reason) => Self::Failure(reason.clone()),
        }
    }
}

impl<T: Default> FieldResult<T> {
    pub fn unwrap_or_default(self) -> T {
        self.ok().unwrap_or_default()
    }
}

/// State of a single-entity lookup as a view should render it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Lookup<T> {
    Loading,
    NotFound,
    Found(T),
}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::Loading
    }
}

impl<T> Lookup<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::Bytes;

    use crate::abi::decode_u256;

    #[test]
    fn defaults_are_pending_and_loading() {
        assert_eq!(FieldResult::<u8>::default(), FieldResult::Pending);
        assert!(Lookup::<u8>::default().is_loading());
    }

    #[test]
    fn failed_and_pending_fall_back() {
        assert_eq!(FieldResult::Failure("x".into()).unwrap_or(7), 7);
        assert_eq!(FieldResult::<u32>::Pending.unwrap_or_default(), 0);
        assert_eq!(FieldResult::Success(3).map(|v| v * 2), FieldResult::Success(6));
    }

    #[test]
    fn decode_keeps_failure_local() {
        let bad: CallOutcome = Ok(Bytes::from(vec![1u8, 2]));
        let r = FieldResult::decode(&bad, decode_u256);
        assert!(matches!(r, FieldResult::Failure(_)));

        let reverted: CallOutcome = Err("execution reverted".into());
        assert_eq!(
            FieldResult::decode(&reverted, decode_u256),
            FieldResult::Failure("execution reverted".into())
        );
    }

    #[test]
    fn lookup_accessors() {
        let l = Lookup::Found("c");
        assert_eq!(l.found(), Some(&"c"));
        assert_eq!(Lookup::<u8>::NotFound.into_found(), None);
    }
}
