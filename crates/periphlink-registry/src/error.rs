/// Errors that can occur while registering peripheral libraries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Every slot is taken.
    #[error("library registry full ({capacity} slots)")]
    RegistryFull { capacity: usize },
}

pub type Result<T> = std::result::Result<T, RegistryError>;
