mod model_service;
mod ort_service;
mod prediction;
mod preprocess;
mod record;
mod response;
mod routes;
mod server;
mod store;
mod telemetry;
mod threshold;
mod upload;

#[cfg(test)]
mod test_utils;

pub mod app;
pub mod config;

pub use app::start_app;
