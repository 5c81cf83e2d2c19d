//! HTTP subsystem: server, route table, middleware.

pub mod middleware;
pub mod request_id;
pub mod routes;
pub mod server;

pub use server::HttpServer;
