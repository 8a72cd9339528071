pub mod queue;
pub mod schema;
pub mod sync;
