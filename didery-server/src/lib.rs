pub mod blob_ops;
pub mod config;
pub mod error;
pub mod history_ops;
pub mod paging;
pub mod routes;
pub mod server;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;
