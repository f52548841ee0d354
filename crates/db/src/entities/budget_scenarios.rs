//! `SeaORM` Entity for budget_scenarios table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "budget_scenarios")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub year: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub is_active: bool,
    pub yearly_confirmed: bool,
    pub q1_locked: bool,
    pub q2_locked: bool,
    pub q3_locked: bool,
    pub q4_locked: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::scenario_category_figures::Entity")]
    ScenarioCategoryFigures,
    #[sea_orm(has_many = "super::monthly_allocations::Entity")]
    MonthlyAllocations,
}

impl Related<super::scenario_category_figures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScenarioCategoryFigures.def()
    }
}

impl Related<super::monthly_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthlyAllocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
