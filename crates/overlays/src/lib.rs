pub mod cache;
pub mod host;
pub mod memory_host;
pub mod overlay;
pub mod selection;
pub mod symbology;

pub use cache::*;
pub use host::*;
pub use memory_host::*;
pub use overlay::*;
pub use selection::*;
pub use symbology::*;
