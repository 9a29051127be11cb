pub mod extract;
pub mod table;
pub mod xml;
