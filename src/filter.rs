use crate::error::Result;

/// Membership operations shared by every filter in the crate.
pub trait Filter {
    /// Adds `data` to the filter.
    fn add(&mut self, data: &[u8]) -> Result<()>;

    /// Reports whether `data` may be a member. `false` is definite unless the
    /// filter evicts or removes entries.
    fn test(&self, data: &[u8]) -> Result<bool>;

    /// Adds `data` and returns the membership answer from before the add.
    fn test_and_add(&mut self, data: &[u8]) -> Result<bool>;

    /// Drops every element, keeping the configured shape.
    fn reset(&mut self);
}

/// Filters that can forget an element.
pub trait RemovableFilter {
    /// Removes `data` if it tests as a member. Returns whether it did.
    fn test_and_remove(&mut self, data: &[u8]) -> Result<bool>;
}
