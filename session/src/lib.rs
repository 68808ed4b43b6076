//! Thread Actor Registry (C4, §4.1, §5): owns one [`ThreadActor`] per
//! `(endpoint_id, thread_id)`, serializing its mutating operations and
//! implementing the `send_user_turn` contract in full, including its named
//! error cases.

mod actor;
pub mod approval;
mod error;
mod registry;
mod request;
pub mod todo_store;

pub use actor::ThreadActor;
pub use error::SessionError;
pub use registry::ExecutorFactory;
pub use registry::ThreadActorRegistry;
pub use request::Attachment;
pub use request::SendUserTurnInput;
pub use request::SendUserTurnOptions;
pub use request::SendUserTurnResult;
pub use request::UserInput;
