pub mod analyzers;
pub mod config;
pub mod error;
pub mod etl;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod output;
pub mod product;
pub mod store;
