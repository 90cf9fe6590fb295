//! Data product descriptor generation for ORD catalogs.
//!
//! A compiled domain model flows through an ordered chain of enrichment
//! stages ([`stages::Pipeline`]), optional external overrides are merged in,
//! and each resulting record is assembled and validated into a
//! [`builder::DataProductDocument`].
pub mod annotations;
pub mod builder;
pub mod config;
pub mod generate;
pub mod merge;
pub mod model;
pub mod record;
pub mod stages;
pub mod validate;

pub use builder::DataProductDocument;
pub use generate::{process_data_products, run_data_products};
pub use model::DomainModel;
pub use record::DataProductRecord;
