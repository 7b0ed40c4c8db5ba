mod post;

pub use post::login;
