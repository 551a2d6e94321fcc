pub mod correct_consignee_status_command;
pub mod update_consignee_stage_command;

pub use correct_consignee_status_command::{
    CorrectConsigneeStatusCommand, CorrectConsigneeStatusResult,
};
pub use update_consignee_stage_command::{
    ChallanReceiptUpdate, InstallationUpdate, InvoiceUpdate, LogisticsUpdate, StageRecord,
    StageUpdate, UpdateConsigneeStageCommand, UpdateConsigneeStageResult,
};
