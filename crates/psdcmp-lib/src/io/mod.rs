pub mod openbci;
pub mod table;
