//! Pure mapping from internal [`events::Event`]s to the external AG-UI wire
//! event sequence (spec §6.5). Transport framing (sockets/SSE) is out of
//! scope — this crate only produces the ordered [`WireEvent`] values a
//! transport layer would serialize and send.

pub mod error;
pub mod translator;
pub mod wire;

pub use error::{Result, TranslatorError};
pub use translator::Translator;
pub use wire::WireEvent;
