//! Address entity module

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::AddressDescriptor;
pub use handlers::*;
pub use model::address_validation;
