use uuid::Uuid;

/// Source of fresh record identifiers.
///
/// Implementations must be safe to call repeatedly without coordination
/// between scans and keep the collision probability negligible.
pub trait IdGenerator: Send + Sync {
    fn fresh_id(&self) -> String;
}

/// Random (v4) UUID tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn fresh_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
