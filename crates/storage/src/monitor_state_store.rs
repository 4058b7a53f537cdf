use idena_watch_domain::storage::{MonitorStateStore, StorageError, StorageResult};
use sea_orm::{sea_query::OnConflict, EntityTrait, Set};

use crate::entity::monitor_state;
use crate::SeaOrmStorage;

fn state_key(section: &str, key: &str) -> String {
    format!("{section}.{key}")
}

#[async_trait::async_trait]
impl MonitorStateStore for SeaOrmStorage {
    async fn get_value(&self, section: &str, key: &str) -> StorageResult<Option<i64>> {
        let maybe = monitor_state::Entity::find_by_id(state_key(section, key))
            .one(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(maybe.map(|model| model.value_int))
    }

    async fn set_value(&self, value: i64, section: &str, key: &str) -> StorageResult<()> {
        let active = monitor_state::ActiveModel {
            key: Set(state_key(section, key)),
            value_int: Set(value),
        };
        monitor_state::Entity::insert(active)
            .on_conflict(
                OnConflict::column(monitor_state::Column::Key)
                    .update_column(monitor_state::Column::ValueInt)
                    .to_owned(),
            )
            .exec_without_returning(self.connection())
            .await
            .map_err(StorageError::from_source)?;
        Ok(())
    }
}
