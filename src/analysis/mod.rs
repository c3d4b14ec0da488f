pub mod returns;
pub mod simulation;
pub mod stationarity;
pub mod statistics;
