mod middleware;
mod password;
mod store;

pub use middleware::reject_anonymous_users;
pub use password::{
    compute_password_hash, validate_credentials, AuthError, Credentials, PasswordHashFormatError,
};
pub use store::{CookieSettings, CredentialStore, CredentialStoreError, Identity};
