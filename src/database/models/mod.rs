pub mod shift;
pub mod special_code;
pub mod station;
pub mod user;

pub use shift::{
    Application, ApplicationStatus, Shift, ShiftDetails, ShiftInput, ShiftQuery, ShiftStatus,
    Urgency,
};
pub use special_code::{SpecialCode, SpecialCodeInput};
pub use station::{Station, StationInput};
pub use user::{
    AuthResponse, LoginRequest, NotificationPreferences, NotificationPreferencesPatch,
    SignupRequest, User, UserInfo, UserRole, UserSettingsPatch,
};
