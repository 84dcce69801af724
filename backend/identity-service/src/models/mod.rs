/// Data models for the identity core
pub mod reset_token;
pub mod user;

pub use reset_token::{NewResetToken, PasswordResetToken};
pub use user::{
    NewUser, OrganizationData, PersonData, ProfileChanges, RegisterRequest, User, UserDetails,
    UserKind, UserProfile,
};
