//! HTTP protocol layer module
//!
//! Header policy, range arithmetic, MIME mapping, and response building,
//! decoupled from the dispatch logic that drives them.

pub mod mime;
pub mod policy;
pub mod range;
pub mod response;

// Re-export commonly used items
pub use policy::{A_LITTLE_WHILE, CONTENT_ENCODINGS, FOREVER};
pub use response::ResponseBody;
