use crate::domain::error::RegistryError;
use crate::domain::models::Instrument;

/// Port trait for the persisted instrument registry
///
/// The registry is an ordered list; its order is the numbering operators
/// use to address instruments.
pub trait InstrumentStore: Send + Sync {
    /// Load all instruments; a store that does not exist yet is empty
    fn load(&self) -> Result<Vec<Instrument>, RegistryError>;

    /// Replace the stored registry with `instruments`
    fn save(&self, instruments: &[Instrument]) -> Result<(), RegistryError>;
}
