//! Health check and metrics listener

mod handlers;
mod server;

pub use server::{router, run_server, serve};
