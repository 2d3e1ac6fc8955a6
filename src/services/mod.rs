pub mod collection;
pub mod predicate;
pub mod reconcile;
