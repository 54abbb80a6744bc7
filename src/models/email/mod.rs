//! The stored email record and its insert/wire forms.

pub mod api_email;
pub mod db_email;
pub mod new_email;
pub mod send_request;

pub use api_email::ApiEmail;
pub use db_email::DbEmail;
pub use new_email::NewEmail;
pub use send_request::SendRequest;
