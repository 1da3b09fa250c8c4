pub mod history;
pub mod inventory;
pub mod warehouse;
