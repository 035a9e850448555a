pub mod health;
pub mod middleware;
pub mod phone;
pub mod tracing;
