pub mod pagination;
pub mod router;

pub use pagination::{Page, rewrite};
pub use router::{Dispatch, StatementKind, classify, route};
