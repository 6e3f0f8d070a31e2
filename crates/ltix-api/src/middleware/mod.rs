//! Request helpers shared by the handlers.

pub mod session_cookie;

pub use session_cookie::{
    extract_session_cookie, session_cookie, SESSION_COOKIE_MAX_AGE, SESSION_COOKIE_NAME,
};
