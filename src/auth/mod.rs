pub mod authorizor;
pub mod password;
mod platform;
mod user;

pub use platform::Platform;
pub use user::User;
