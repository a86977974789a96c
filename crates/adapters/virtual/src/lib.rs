//! # tendril-adapter-virtual
//!
//! In-process implementations of the application ports.
//!
//! | Adapter | Port | Behaviour |
//! |---------|------|-----------|
//! | [`VirtualDriver`] | `Driver` | Loopback device: `on` / `off` / `toggle` / numbers are remembered per address and read back |
//! | [`MemoryDatabase`] | `Database` | One in-memory document list per collection |
//! | [`MemorySettingsStore`] | `SettingsStore` | Shallow-merged in-memory maps |
//!
//! ## Dependency rule
//!
//! Depends on `tendril-app` (port traits) and `tendril-domain` only.

mod driver;
mod memory;
mod settings;

pub use driver::{DEFAULT_READING, VirtualDriver};
pub use memory::{MemoryDatabase, MemoryRepository};
pub use settings::MemorySettingsStore;
