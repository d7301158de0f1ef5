pub mod back;
pub mod content;
pub(crate) mod error_shapes;
pub mod front;
pub mod mapping;
pub mod request;
pub mod response;

pub use request::translate_request;
pub use response::translate_response;
