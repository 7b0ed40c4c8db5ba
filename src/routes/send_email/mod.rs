mod post;

pub use post::send_email;
