/// Domain entities
///
/// Plain data types carried between the stores and the authentication
/// flows. No transport or persistence details leak in here.

mod refresh_token;
mod user;

pub use refresh_token::hash_token;
pub use refresh_token::RefreshToken;
pub use user::LockoutPolicy;
pub use user::PublicUser;
pub use user::User;
pub use user::UserStatus;
