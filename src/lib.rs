pub mod archetype;
pub mod comps;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod features;
pub mod forecast;
pub mod logging;
pub mod profiles;
pub mod projection;
pub mod similarity;
pub mod store;
pub mod synthetic;
pub mod trajectory;

pub use store::Store;
