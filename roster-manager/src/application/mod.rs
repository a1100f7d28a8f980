pub mod commands;
pub mod dto;
pub mod notify;
pub mod time;
