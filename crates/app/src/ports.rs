//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod driver;
pub mod repository;
pub mod settings;

pub use driver::{Driver, DriverRegistry};
pub use repository::{Database, Document, Filter, Repository};
pub use settings::{SettingsScope, SettingsStore};
