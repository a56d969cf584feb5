//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stock lots, products and workflow requests are all rows keyed by a typed id;
/// in-memory tables index them through this trait.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
