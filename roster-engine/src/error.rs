use chrono::NaiveDateTime;
use thiserror::Error;

use crate::member::MemberId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("at least one service date is required")]
    NoServices,

    #[error("at least one role needs a positive headcount")]
    NoDemand,

    #[error("service {0} was requested more than once")]
    DuplicateService(NaiveDateTime),

    #[error("member {0} has no roles")]
    MemberWithoutRoles(MemberId),
}

pub type Result<T> = std::result::Result<T, EngineError>;
