pub mod config;
pub mod fetch;
pub mod gate;
pub mod pipeline;
pub mod store;
pub mod table;
pub mod view;
