//! Authentication state: persisted tokens and the current session.

mod session;
mod token_store;

pub use session::{AuthSession, SessionProvider, StaticSession};
pub use token_store::TokenStore;
