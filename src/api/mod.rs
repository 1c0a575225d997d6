mod handlers;

pub use handlers::{router, serve};
