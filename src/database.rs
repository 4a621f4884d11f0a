use serde::{de::DeserializeOwned, Serialize};
use std::{path::Path, sync::Arc, time::Duration};
use thiserror::Error;
use tokio::{fs, sync::RwLock, time};
use tracing::{debug, error};

const SAVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Codec(String),
    #[error("Database error: {0}")]
    Custom(String),
}

#[derive(Debug)]
struct DatabaseInner<T> {
    data: T,
    path: String,
}

/// A bincode-backed value kept in memory and written through on every
/// transaction.
#[derive(Clone, Debug)]
pub struct Database<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> {
    inner: Arc<RwLock<DatabaseInner<T>>>,
}

impl<T: Serialize + DeserializeOwned + Default + Send + Sync + Clone + 'static> Database<T> {
    pub async fn new(path: impl Into<String>) -> Result<Self, DbError> {
        let path = path.into();

        if let Some(parent) = Path::new(&path).parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create database directory: {}", e);
                DbError::Io(e)
            })?;
        }

        let data = if Path::new(&path).exists() {
            match fs::read(&path).await {
                Ok(bytes) if bytes.is_empty() => T::default(),
                Ok(bytes) => match bincode::deserialize(&bytes) {
                    Ok(data) => data,
                    Err(e) => {
                        error!("Failed to deserialize database {}: {}", path, e);
                        T::default()
                    }
                },
                Err(e) => {
                    error!("Failed to read database {}: {}", path, e);
                    T::default()
                }
            }
        } else {
            T::default()
        };

        debug!("Loaded database {}", path);

        Ok(Self {
            inner: Arc::new(RwLock::new(DatabaseInner { data, path })),
        })
    }

    async fn save(path: &str, data: &T) -> Result<(), DbError> {
        let bytes = bincode::serialize(data).map_err(|e| DbError::Codec(e.to_string()))?;

        match time::timeout(SAVE_TIMEOUT, fs::write(path, bytes)).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                error!("Database save operation timed out");
                Err(DbError::Custom("Save operation timed out".into()))
            }
        }
    }

    pub async fn get_data(&self) -> T {
        let guard = self.inner.read().await;
        guard.data.clone()
    }

    /// Applies `f` to a copy of the data, persists the copy and only then
    /// publishes it. The write lock is held for the whole sequence so
    /// concurrent transactions are applied one after another. If `f` or the
    /// save fails, the stored data is left untouched.
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<DbError>,
    {
        let mut guard = self.inner.write().await;
        let mut data = guard.data.clone();
        let result = f(&mut data)?;

        Self::save(&guard.path, &data).await?;
        guard.data = data;

        Ok(result)
    }

    /// Like `transaction`, but `f` also reports whether it changed the data.
    /// Nothing is written when it did not.
    pub async fn update<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<(R, bool), E>,
        E: From<DbError>,
    {
        let mut guard = self.inner.write().await;
        let mut data = guard.data.clone();
        let (result, changed) = f(&mut data)?;

        if changed {
            Self::save(&guard.path, &data).await?;
            guard.data = data;
        }
        Ok(result)
    }

    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let guard = self.inner.read().await;
        f(&guard.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Default, Serialize, Deserialize, Clone, Debug)]
    struct Counters {
        values: HashMap<u64, u64>,
    }

    fn db_path(dir: &tempfile::TempDir) -> String {
        dir.path().join("nested/counters.db").display().to_string()
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(db_path(&dir)).await.unwrap();
        assert!(db.read(|d| d.values.is_empty()).await);
    }

    #[tokio::test]
    async fn transaction_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(db_path(&dir)).await.unwrap();
        db.transaction(|d| {
            d.values.insert(7, 42);
            Ok::<_, DbError>(())
        })
        .await
        .unwrap();

        let reloaded = Database::<Counters>::new(db_path(&dir)).await.unwrap();
        assert_eq!(reloaded.read(|d| d.values.get(&7).copied()).await, Some(42));
    }

    #[tokio::test]
    async fn failed_transaction_leaves_data_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(db_path(&dir)).await.unwrap();
        let result: Result<(), DbError> = db
            .transaction(|d| {
                d.values.insert(1, 1);
                Err(DbError::Custom("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(db.read(|d| d.values.is_empty()).await);
    }

    #[tokio::test]
    async fn corrupt_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        std::fs::create_dir_all(Path::new(&path).parent().unwrap()).unwrap();
        std::fs::write(&path, [0xff, 0xff, 0xff]).unwrap();

        let db = Database::<Counters>::new(path).await.unwrap();
        assert!(db.read(|d| d.values.is_empty()).await);
    }

    #[tokio::test]
    async fn concurrent_transactions_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::<Counters>::new(db_path(&dir)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.transaction(|d| {
                    *d.values.entry(0).or_insert(0) += 1;
                    Ok::<_, DbError>(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.read(|d| d.values[&0]).await, 20);
    }

    #[tokio::test]
    async fn unchanged_updates_skip_the_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = db_path(&dir);
        let db = Database::<Counters>::new(path.clone()).await.unwrap();

        let found = db
            .update(|d| Ok::<_, DbError>((d.values.contains_key(&3), false)))
            .await
            .unwrap();
        assert!(!found);
        assert!(!Path::new(&path).exists());

        db.update(|d| {
            d.values.insert(3, 1);
            Ok::<_, DbError>(((), true))
        })
        .await
        .unwrap();
        assert!(Path::new(&path).exists());
    }
}
