//! HTTP/1.1 wire model: methods, versions, status codes, and the request/response
//! parsing and building collaborators spec'd as opaque boxes around the reactor.

pub mod method;
pub mod raw;
pub mod request;
pub mod response;
pub mod status;
pub mod version;

pub use method::Method;
pub use request::{ParseOutcome, Request};
pub use response::Response;
pub use status::Status;
pub use version::Version;
