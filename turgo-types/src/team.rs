use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

pub type TeamId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeamView {
    pub id: TeamId,
    pub name: String,
    pub score: i32,
    pub is_active: bool,
    pub is_eliminated: bool,
}
