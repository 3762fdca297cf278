mod lsp;
mod router;

pub use lsp::SrLsp;
pub use router::{BgpLsPeer, Router};
