pub mod highlight;
pub mod query;
pub mod results;

pub use query::QueryBuilder;
pub use results::{IndexedDocument, MatchedField, SearchHit};
