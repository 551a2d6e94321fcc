pub mod create_tender_command;
pub mod delete_tender_command;
pub mod update_tender_flags_command;

pub use create_tender_command::{CreateTenderCommand, CreateTenderResult};
pub use delete_tender_command::DeleteTenderCommand;
pub use update_tender_flags_command::UpdateTenderFlagsCommand;
