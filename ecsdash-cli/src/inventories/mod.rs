mod demo;
mod fixture;
mod fleet;

pub use demo::DemoInventory;
pub use fixture::FixtureInventory;
