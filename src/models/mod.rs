pub mod repository;
pub mod commit;
pub mod evaluation;

pub use repository::*;
pub use commit::*;
pub use evaluation::*;
