pub mod create_loa_command;
pub mod delete_loa_command;
pub mod update_loa_command;
pub mod upload_loa_acceptance_command;

pub use create_loa_command::CreateLoaCommand;
pub use delete_loa_command::DeleteLoaCommand;
pub use update_loa_command::UpdateLoaCommand;
pub use upload_loa_acceptance_command::UploadLoaAcceptanceCommand;

use crate::{commands::parse_enum, errors::ServiceError, models::LoaStatus};
use rust_decimal::Decimal;
use validator::ValidationError;

pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("positive");
        err.message = Some("must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}

pub(crate) fn structured_details(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_null() {
        let mut err = ValidationError::new("required");
        err.message = Some("equipment details are required".into());
        return Err(err);
    }
    Ok(())
}

/// Parses a writable LOA status; Accepted is only reachable through acceptance.
pub(crate) fn writable_status(raw: &str) -> Result<LoaStatus, ServiceError> {
    let status: LoaStatus = parse_enum("status", raw)?;
    if status == LoaStatus::Accepted {
        return Err(ServiceError::InvalidStatus(
            "an LOA becomes Accepted only by uploading its acceptance document".to_string(),
        ));
    }
    Ok(status)
}

/// An accepted LOA keeps its status; acceptance date, document and status
/// only exist together.
pub(crate) fn check_status_change(current: LoaStatus, target: LoaStatus) -> Result<(), ServiceError> {
    if current == LoaStatus::Accepted && target != LoaStatus::Accepted {
        return Err(ServiceError::InvalidStatus(format!(
            "LOA is Accepted; cannot move to {}",
            target
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn accepted_loa_status_is_fixed() {
        assert_matches!(
            check_status_change(LoaStatus::Accepted, LoaStatus::Draft),
            Err(ServiceError::InvalidStatus(_))
        );
        assert_matches!(
            check_status_change(LoaStatus::Accepted, LoaStatus::Cancelled),
            Err(ServiceError::InvalidStatus(_))
        );
        assert!(check_status_change(LoaStatus::Issued, LoaStatus::Cancelled).is_ok());
        assert!(check_status_change(LoaStatus::Draft, LoaStatus::Issued).is_ok());
    }
}
