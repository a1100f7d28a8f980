pub mod absence_model;
pub mod member_model;
pub mod schedule_model;
