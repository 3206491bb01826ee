mod migrations;
mod store;

pub use store::{PorticoStore, StoreError, user_namespace};
