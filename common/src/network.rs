pub mod addr;
pub mod event;
pub mod subnet;
