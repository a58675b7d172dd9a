use sea_orm::entity::prelude::*;

// category_id is a plain column, not a foreign key: the catalog mirrors a
// document store where the reference is unenforced (see the category-delete
// guard in admin_service).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub images: Json,
    pub prices: Json,
    pub stock: i32,
    pub active: bool,
    pub category_id: Uuid,
    pub category_name: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
