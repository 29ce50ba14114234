// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus, StatusAction};

/// Status rules for the dashboards.
///
/// These only decide which controls are offered; the backend remains the
/// authority and may still reject a change.
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Statuses a user may move an appointment to from `current`.
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        self.available_actions(current_status)
            .iter()
            .map(StatusAction::target_status)
            .collect()
    }

    pub fn available_actions(&self, current_status: &AppointmentStatus) -> Vec<StatusAction> {
        match current_status {
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed => {
                vec![StatusAction::Complete, StatusAction::Cancel]
            }
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }
}

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
