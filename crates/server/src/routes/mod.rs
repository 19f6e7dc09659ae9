pub mod assign_deliveries;
pub mod optimize_routes;
