pub mod identity;
pub mod security;
