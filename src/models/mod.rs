pub mod category;
pub mod expense;
pub mod habit;
pub mod habit_log;
pub mod mood;
pub mod task;
pub mod time_entry;
pub mod user;
