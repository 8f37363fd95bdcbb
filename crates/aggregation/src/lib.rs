pub mod client;
pub mod cluster;
pub mod policy;
pub mod protocol;
pub mod query;
pub mod regions;
pub mod result;

pub use client::*;
pub use cluster::*;
pub use policy::*;
pub use query::*;
pub use regions::*;
pub use result::*;
