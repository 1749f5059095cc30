pub mod relation;

pub use relation::RelationId;
