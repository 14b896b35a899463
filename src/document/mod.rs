pub mod model;
pub mod rules;
pub mod versioning;

pub use model::*;
pub use rules::*;
pub use versioning::*;
