//! Pure rostering core: roles, quotas, candidate scoring and the
//! equitable assignment engine. No I/O happens in this crate.

pub mod engine;
pub mod error;
pub mod member;
pub mod quota;
pub mod role;
pub mod scorecard;
pub mod scoring;

pub use engine::{
    validate_request, AssignmentEngine, EngineConfig, GeneratedSchedule, ServicePlan, ServiceRoster,
    Shortfall,
};
pub use error::{EngineError, Result};
pub use member::{AvailableMember, HistoryFacts, Member, MemberId};
pub use quota::RoleQuota;
pub use role::{join_role_list, parse_role_list, Role, RoleOrder, UnknownRole};
pub use scorecard::{RotationScorecard, ScorecardBook};
pub use scoring::ScoreWeights;
