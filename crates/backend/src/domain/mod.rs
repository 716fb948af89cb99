pub mod a001_user;
pub mod a002_group;
pub mod a003_point_of_sale;
pub mod a004_user_matricula;
pub mod a005_contract;
pub mod a006_contract_metadata;
