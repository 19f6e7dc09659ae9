pub mod assignment;
pub mod config;
pub mod geo;
pub mod route_planner;
pub mod trip_optimizer;
