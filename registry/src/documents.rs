use crate::errors::Result;
use crate::model::{GeoFilter, SensorDocument};
use crate::store::DocumentStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Client, Database};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    database: Database,
}

impl MongoDocumentStore {
    pub async fn connect(url: &str, database: &str) -> Result<Self> {
        info!("Connecting to document store, database {}", database);
        let client = Client::with_uri_str(url).await?;
        Ok(Self {
            database: client.database(database),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn insert_one(&self, collection: &str, document: &SensorDocument) -> Result<()> {
        self.database
            .collection::<SensorDocument>(collection)
            .insert_one(document, None)
            .await?;
        debug!("Projected sensor {} into '{}'", document.id, collection);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &GeoFilter) -> Result<Vec<SensorDocument>> {
        let query = doc! {
            "latitude": filter.latitude,
            "longitude": filter.longitude,
        };
        let cursor = self
            .database
            .collection::<SensorDocument>(collection)
            .find(query, None)
            .await?;
        let documents: Vec<SensorDocument> = cursor.try_collect().await?;
        debug!("{} documents in '{}' at {:?}", documents.len(), collection, filter);
        Ok(documents)
    }
}
