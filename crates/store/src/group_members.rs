use engine::GroupMember;
use sea_orm::{ActiveValue, entity::prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Join order; the engine's member list is ordered.
    pub position: i32,
    pub default_percent_bp: Option<i32>,
    pub default_shares: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(group_id: &str, member: &GroupMember, position: i32) -> ActiveModel {
    ActiveModel {
        group_id: ActiveValue::Set(group_id.to_string()),
        user_id: ActiveValue::Set(member.user_id.clone()),
        position: ActiveValue::Set(position),
        default_percent_bp: ActiveValue::Set(member.default_percent_bp.map(|bp| bp as i32)),
        default_shares: ActiveValue::Set(member.default_shares.map(|s| s as i32)),
    }
}

impl From<Model> for GroupMember {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            default_percent_bp: model.default_percent_bp.map(|bp| bp as u32),
            default_shares: model.default_shares.map(|s| s as u32),
        }
    }
}
