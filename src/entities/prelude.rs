pub use super::bonus_grants::Entity as BonusGrants;
pub use super::users::Entity as Users;
pub use super::vpn_configs::Entity as VpnConfigs;
