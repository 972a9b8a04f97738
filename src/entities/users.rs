use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Messenger-assigned identity, never reused.
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,

    pub username: String,

    pub is_banned: bool,

    /// Inclusive last active day of the subscription.
    pub subscription_end_date: Date,

    /// Set once at registration. A row with NULL here is not a valid user
    /// for entitlement purposes.
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vpn_configs::Entity")]
    VpnConfigs,

    #[sea_orm(has_one = "super::bonus_grants::Entity")]
    BonusGrants,
}

impl Related<super::vpn_configs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VpnConfigs.def()
    }
}

impl Related<super::bonus_grants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BonusGrants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
