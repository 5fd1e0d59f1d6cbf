pub mod app;
pub mod config;
pub mod handlers;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

pub use app::create_router;
pub use config::Config;
pub use services::AppState;
