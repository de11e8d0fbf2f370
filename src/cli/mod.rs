pub mod market;
pub mod portfolio;
pub mod setup;
pub mod ui;
