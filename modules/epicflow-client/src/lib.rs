pub mod error;
pub mod http;
pub mod simulated;

pub use error::{ClientError, Result};
pub use http::HttpBackend;
pub use simulated::SimulatedBackend;
