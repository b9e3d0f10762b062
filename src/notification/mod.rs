//! Composition and delivery of alert emails.
//!
//! `Dispatcher` turns an event and a recipient set into provider submissions.
//! `ResendClient` is the production `DeliveryProvider`.
pub mod dispatcher;
pub mod resend;

pub use dispatcher::Dispatcher;
pub use resend::ResendClient;
