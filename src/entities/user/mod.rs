//! User entity module

pub mod descriptor;
pub mod handlers;
pub mod model;

pub use descriptor::UserDescriptor;
pub use handlers::*;
pub use model::{RegisterUser, UpdateUser};
