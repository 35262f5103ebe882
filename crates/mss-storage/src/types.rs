//! Result types shared by storage backends.

/// Outcome of a keyed lookup.
///
/// `Absent` is an expected outcome (the row has not been created yet), not a
/// failure. Failures travel in the surrounding `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    Absent,
}

impl<T> Lookup<T> {
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Found(value),
            None => Self::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_from_option() {
        assert_eq!(Lookup::from(Some(3)), Lookup::Found(3));
        assert_eq!(Lookup::<i32>::from(None), Lookup::Absent);
    }

    #[test]
    fn lookup_accessors() {
        let found = Lookup::Found("v1");
        assert!(found.is_found());
        assert_eq!(found.into_option(), Some("v1"));

        let absent: Lookup<&str> = Lookup::Absent;
        assert!(absent.is_absent());
        assert_eq!(absent.into_option(), None);
    }
}
