//! Sharing diagrams through URLs.
//!
//! - [`codec`]: source text to URL-safe token and back
//! - [`link`]: share links, embed snippets, startup source precedence

pub mod codec;
pub mod link;

pub use codec::{CodecError, decode, encode};
pub use link::{InitialSource, SourceOrigin};
