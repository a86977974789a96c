//! Feature services: behaviour beyond plain CRUD, exposed as extra routes.
//!
//! Each service declares its routes as data ([`RouteDescriptor`]s) which the
//! [`Registry`](crate::registry::Registry) mounts next to the CRUD routes.
//!
//! [`RouteDescriptor`]: crate::route::RouteDescriptor

pub mod devices;
pub mod readings;
pub mod settings;

pub use devices::DeviceController;
pub use readings::ReadingsService;
pub use settings::SettingsService;
