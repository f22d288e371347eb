pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod fasta;
pub mod input;
pub mod ncbi;
pub mod output;
pub mod reconcile;
pub mod store;
