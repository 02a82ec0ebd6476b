use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Set,
    TransactionTrait,
};

use crate::entities::{images, prelude::*};

#[derive(Clone)]
pub struct ImageRepository {
    db: DatabaseConnection,
}

impl ImageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert one image row inside its own transaction.
    pub async fn create(&self, url: &str) -> Result<images::Model, DbErr> {
        if url.trim().is_empty() {
            return Err(DbErr::Custom("image url must not be empty".to_string()));
        }

        let txn = self.db.begin().await?;

        let image = images::ActiveModel {
            url: Set(url.to_string()),
            created: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(image)
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        Images::find().count(&self.db).await
    }
}
