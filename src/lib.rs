pub mod app;
pub mod notify;
pub mod terminal;
