//! Qualifier markers and qualifier sets.
//!
//! A qualifier distinguishes two otherwise type-equal adapter
//! registrations (say, a hex-encoded string from a plain one). Qualifier
//! markers carry no parameters, so identity is determined solely by name
//! and a set of them compares as a set.

use core::fmt::{self, Display};

/// A marker distinguishing adapter registrations for the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier(pub &'static str);

impl Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// An unordered set of [`Qualifier`]s, normalized for equality and
/// hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifierSet {
    /// Sorted, deduplicated
    members: Vec<Qualifier>,
}

impl QualifierSet {
    /// The empty set.
    pub const fn empty() -> Self {
        QualifierSet {
            members: Vec::new(),
        }
    }

    /// Build a set from markers, normalizing order and duplicates.
    pub fn of(qualifiers: &[Qualifier]) -> Self {
        let mut members = qualifiers.to_vec();
        members.sort();
        members.dedup();
        QualifierSet { members }
    }

    /// True when no qualifiers are present.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The members, in normalized order.
    pub fn members(&self) -> &[Qualifier] {
        &self.members
    }

    /// Membership test.
    pub fn contains(&self, qualifier: Qualifier) -> bool {
        self.members.binary_search(&qualifier).is_ok()
    }

    /// The set minus `qualifier`, or `None` when it was absent. Factories
    /// use this to strip the qualifier they handle and delegate the rest.
    pub fn next_qualifier(&self, qualifier: Qualifier) -> Option<QualifierSet> {
        let index = self.members.binary_search(&qualifier).ok()?;
        let mut members = self.members.clone();
        members.remove(index);
        Some(QualifierSet { members })
    }
}

impl Display for QualifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            return write!(f, "[no qualifiers]");
        }
        write!(f, "[")?;
        for (i, q) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{q}")?;
        }
        write!(f, "]")
    }
}

impl From<Qualifier> for QualifierSet {
    fn from(q: Qualifier) -> Self {
        QualifierSet { members: vec![q] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_order_and_duplicates() {
        let a = QualifierSet::of(&[Qualifier("Hex"), Qualifier("Compact")]);
        let b = QualifierSet::of(&[Qualifier("Compact"), Qualifier("Hex"), Qualifier("Hex")]);
        assert_eq!(a, b);
    }

    #[test]
    fn next_qualifier_strips_or_declines() {
        let set = QualifierSet::of(&[Qualifier("Hex"), Qualifier("Compact")]);
        let stripped = set.next_qualifier(Qualifier("Hex")).unwrap();
        assert_eq!(stripped, QualifierSet::of(&[Qualifier("Compact")]));
        assert!(set.next_qualifier(Qualifier("Other")).is_none());
    }
}
