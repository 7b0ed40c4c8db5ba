mod health_check;
mod home;
mod login;
mod logout;
mod send_email;
mod setup;

pub use health_check::*;
pub use home::*;
pub use login::*;
pub use logout::*;
pub use send_email::*;
pub use setup::*;
