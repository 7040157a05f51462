/// Component that adds some information about the entity
/// Useful for debugging
#[derive(Debug, Clone, Eq, PartialEq, Hash, Default)]
pub struct Info {
    /// A helpful name
    pub name: String,
}

impl Info {
    /// Name an entity
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
