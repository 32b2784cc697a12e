pub mod identity;
pub mod reply;
