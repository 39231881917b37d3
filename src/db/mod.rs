pub mod store;

pub use store::{is_foreign_key_violation, is_unique_violation, Store, StoreRole};
