/// Business logic for the identity core
pub mod auth;
pub mod delivery;
pub mod token;

pub use auth::{AuthResponse, AuthService, TwoFactorSetup};
pub use delivery::{LogOnlyDelivery, ResetDelivery};
pub use token::{Claims, IssuedToken, TokenService};
