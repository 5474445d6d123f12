//! Secondary indexes maintained incrementally as table observers.

mod multi;
mod unique;

pub use self::multi::Index;
pub use self::unique::UniqueIndex;
