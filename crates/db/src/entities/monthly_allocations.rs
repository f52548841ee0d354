//! `SeaORM` Entity for monthly_allocations table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub scenario_id: Uuid,
    pub category_id: Uuid,
    pub month: i16,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budget_scenarios::Entity",
        from = "Column::ScenarioId",
        to = "super::budget_scenarios::Column::Id"
    )]
    BudgetScenarios,
    #[sea_orm(
        belongs_to = "super::sub_categories::Entity",
        from = "Column::CategoryId",
        to = "super::sub_categories::Column::Id"
    )]
    SubCategories,
}

impl Related<super::budget_scenarios::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetScenarios.def()
    }
}

impl Related<super::sub_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubCategories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
