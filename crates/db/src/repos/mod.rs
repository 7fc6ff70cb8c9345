//! Per-entity repository bindings and query extensions.

pub mod accounts;
pub mod bots;
pub mod messages;
pub mod threads;
pub mod users;

pub use accounts::*;
pub use bots::*;
pub use messages::*;
pub use threads::*;
pub use users::*;
