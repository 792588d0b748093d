//! FactLog server: HTTP API over the processing coordinator and fact store.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
