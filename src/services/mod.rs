pub mod chart_service;
pub mod data_service;
pub mod forecast_service;
pub mod pipeline_service;
