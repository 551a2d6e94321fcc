pub mod create_purchase_order_command;
pub mod update_purchase_order_status_command;

pub use create_purchase_order_command::{
    CreatePurchaseOrderCommand, CreatePurchaseOrderResult, DeliveryLocation,
};
pub use update_purchase_order_status_command::{
    UpdatePurchaseOrderStatusCommand, UpdatePurchaseOrderStatusResult,
};
