pub mod backend;
pub mod booking;
pub mod duration;
pub mod form;
pub mod lifecycle;
pub mod slots;
pub mod view;

pub use backend::{AppointmentBackend, HttpAppointmentBackend};
pub use booking::AppointmentService;
pub use form::{AppointmentDraft, AppointmentFormController, FieldErrors, FormError, FormField, SelectedPatient};
pub use lifecycle::AppointmentLifecycleService;
pub use view::{AppointmentFilters, AppointmentsViewController, LoadState, ViewMode};
