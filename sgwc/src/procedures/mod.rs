mod create_bearer;
mod create_session;
mod delete_bearer;
mod delete_session;
mod handler_api;
mod message_handler;
mod modify_bearer;
mod procedure;
mod release_access_bearers;
mod session_procedure;

pub use create_bearer::CreateBearerProcedure;
pub use create_session::CreateSessionProcedure;
pub use delete_bearer::DeleteBearerProcedure;
pub use delete_session::DeleteSessionProcedure;
pub use handler_api::HandlerApi;
pub use message_handler::{SessionMessageHandler, handle_message};
pub use modify_bearer::ModifyBearerProcedure;
pub use procedure::{HandlerOutput, Procedure};
pub use release_access_bearers::ReleaseAccessBearersProcedure;
pub use session_procedure::SessionProcedure;
