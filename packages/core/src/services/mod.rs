//! Model Services
//!
//! - `ModelHolder` - creates models sharing one transport and configuration
//! - `Model` - create/read/update/remove and relationship operations for one label
//!
//! Services coordinate the statement builders, the transport and the event
//! channels; all query text is produced by the `query` module.

pub mod error;
pub mod model;

pub use error::{ModelError, REMOVE_BLOCKED_HINT};
pub use model::{Model, ModelHolder, NodeStream};
