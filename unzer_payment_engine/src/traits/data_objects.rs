use serde::Serialize;

/// The result of a conditional insert. Both variants carry the stored record, so callers that only care about the
/// record can call [`InsertResult::into_inner`] without checking which one they got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InsertResult<T> {
    Inserted(T),
    AlreadyExists(T),
}

impl<T> InsertResult<T> {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertResult::Inserted(_))
    }

    pub fn inner(&self) -> &T {
        match self {
            InsertResult::Inserted(t) | InsertResult::AlreadyExists(t) => t,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            InsertResult::Inserted(t) | InsertResult::AlreadyExists(t) => t,
        }
    }
}
