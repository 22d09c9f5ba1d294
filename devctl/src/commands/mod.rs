pub mod logs;
pub mod restart;
pub mod start;
pub mod status;
pub mod stop;
