//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the entity's stored state.
    ///
    /// Stores bump this on every successful write so callers can guard
    /// read-modify-write cycles with [`crate::ExpectedVersion`].
    fn version(&self) -> u64;
}
