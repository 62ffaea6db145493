pub mod serializer;
pub use serializer::Serializer;

pub mod stmt;
pub use stmt::Statement;

pub use farmql_core::driver::Flavor;
