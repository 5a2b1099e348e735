//! Cart/sale flow and the per-user session table

pub mod cart;
pub mod session;

pub use cart::{Cart, CartEntry, CartState};
pub use session::SessionTable;
