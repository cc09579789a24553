//! Remote access to the PLM server
//!
//! - [`transport`]: the HTTP request/response seam
//! - [`soa`]: request envelopes and response shapes
//! - [`session`]: session cookie extraction
//! - [`client`]: login, item lookup, structure windows and expansion

pub mod client;
pub mod session;
pub mod soa;
pub mod transport;

pub use client::{ItemIdentity, StructureRoot, TcClient};
pub use session::SessionToken;
pub use transport::{HttpResponse, ReqwestTransport, Transport};
