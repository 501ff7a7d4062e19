pub mod providers;
pub mod retry;
