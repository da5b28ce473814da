//! # punchgate-auth
//!
//! The session/token authority: JWT minting and verification (with signing
//! key rotation) and the revocable device-session lifecycle.

pub mod jwt;
pub mod session;

pub use jwt::{Claims, TokenDecoder, TokenEncoder, TokenKind};
pub use session::{IssuedSession, SessionAuthority};
