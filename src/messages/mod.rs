//! Messages — the board's only resource and its HTTP surface.

pub mod model;
pub mod routes;

pub use model::{CreateMessage, Message, UpdateMessage};
pub use routes::message_routes;
