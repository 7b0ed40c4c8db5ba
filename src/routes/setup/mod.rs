mod get;
mod post;

pub use get::setup_form;
pub use post::generate_credentials;
