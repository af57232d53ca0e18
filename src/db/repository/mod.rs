//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`; transactions are composed by
//! the caller (see `db::store`).

mod message;
mod score;
mod session;

pub use message::*;
pub use score::*;
pub use session::*;
