use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoCapacityDocument, MongoGuessDocument, MongoScoreDocument, MongoSessionDocument,
        MongoStatsDocument, doc_id, to_bson_datetime, uuid_as_binary,
    },
};
use crate::dao::{
    game_store::{EndOutcome, GameStore, GuessInsert},
    models::{GuessEntity, SessionEntity, StatsEntity},
    storage::StorageResult,
};

const SESSION_COLLECTION: &str = "sessions";
const GUESS_COLLECTION: &str = "guesses";
const SCORE_COLLECTION: &str = "scores";
const STATS_COLLECTION: &str = "stats";
const CAPACITY_COLLECTION: &str = "capacity";
const CAPACITY_DOC_ID: &str = "total_players";

// The two unique indexes that make `insert_guess` atomic: a duplicate-key
// rejection is mapped back to the specific business conflict by index name.
const GUESS_VALUE_INDEX: &str = "guess_session_value_idx";
const GUESS_PARTICIPANT_INDEX: &str = "guess_session_participant_idx";

/// MongoDB-backed [`GameStore`].
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        // Ping through the client so a stale cached database handle cannot
        // mask a dead connection.
        let database = {
            let guard = self.state.read().await;
            guard.client.database(&self.config.database_name)
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let sessions = database.collection::<MongoSessionDocument>(SESSION_COLLECTION);
        let current_index = mongodb::IndexModel::builder()
            .keys(doc! {"is_current": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_current_idx".to_owned()))
                    .build(),
            )
            .build();
        sessions
            .create_index(current_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION,
                index: "is_current",
                source,
            })?;

        let guesses = database.collection::<MongoGuessDocument>(GUESS_COLLECTION);
        let value_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "value": 1})
            .options(
                IndexOptions::builder()
                    .name(Some(GUESS_VALUE_INDEX.to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        guesses
            .create_index(value_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GUESS_COLLECTION,
                index: "session_id,value",
                source,
            })?;

        let participant_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "participant": 1})
            .options(
                IndexOptions::builder()
                    .name(Some(GUESS_PARTICIPANT_INDEX.to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        guesses
            .create_index(participant_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GUESS_COLLECTION,
                index: "session_id,participant",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION)
    }

    async fn guesses(&self) -> Collection<MongoGuessDocument> {
        self.database().await.collection(GUESS_COLLECTION)
    }

    async fn scores(&self) -> Collection<MongoScoreDocument> {
        self.database().await.collection(SCORE_COLLECTION)
    }

    async fn stats_collection(&self) -> Collection<MongoStatsDocument> {
        self.database().await.collection(STATS_COLLECTION)
    }

    async fn capacity(&self) -> Collection<MongoCapacityDocument> {
        self.database().await.collection(CAPACITY_COLLECTION)
    }

    async fn create_current_session(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id;
        let collection = self.sessions().await;

        collection
            .update_many(doc! {"is_current": true}, doc! {"$set": {"is_current": false}})
            .await
            .map_err(|source| MongoDaoError::WriteSession { id, source })?;

        let document: MongoSessionDocument = session.into();
        collection
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::WriteSession { id, source })?;

        Ok(())
    }

    async fn current_session(&self) -> MongoResult<Option<SessionEntity>> {
        let collection = self.sessions().await;
        let document = collection
            .find_one(doc! {"is_current": true})
            .await
            .map_err(|source| MongoDaoError::LoadSession { source })?;
        Ok(document.map(Into::into))
    }

    async fn find_session(&self, id: Uuid) -> MongoResult<Option<SessionEntity>> {
        let collection = self.sessions().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadSession { source })?;
        Ok(document.map(Into::into))
    }

    async fn update_timer(
        &self,
        id: Uuid,
        target_start_time: OffsetDateTime,
        is_active: bool,
    ) -> MongoResult<bool> {
        let collection = self.sessions().await;
        // Ended sessions keep `is_active = false` forever; the filter makes
        // that hold even when the timer write races with `mark_ended`.
        let mut filter = doc_id(id);
        filter.insert("ended", false);
        let result = collection
            .update_one(
                filter,
                doc! {"$set": {
                    "target_start_time": to_bson_datetime(target_start_time),
                    "is_active": is_active,
                    "updated_at": DateTime::now(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::WriteSession { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn mark_started(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.sessions().await;
        let result = collection
            .update_one(
                doc_id(id),
                doc! {"$set": {
                    "is_active": false,
                    "started": true,
                    "updated_at": DateTime::now(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::WriteSession { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn mark_ended(&self, id: Uuid, final_score: i64) -> MongoResult<EndOutcome> {
        let collection = self.sessions().await;

        // The `ended: false` filter is the double-ending guard: it holds even
        // with several server processes racing on the same session.
        let mut filter = doc_id(id);
        filter.insert("ended", false);
        let result = collection
            .update_one(
                filter,
                doc! {"$set": {
                    "ended": true,
                    "is_active": false,
                    "final_score": final_score,
                    "updated_at": DateTime::now(),
                }},
            )
            .await
            .map_err(|source| MongoDaoError::WriteSession { id, source })?;

        if result.matched_count > 0 {
            return Ok(EndOutcome::Ended);
        }

        match self.find_session(id).await? {
            Some(_) => Ok(EndOutcome::AlreadyEnded),
            None => Ok(EndOutcome::NotFound),
        }
    }

    async fn insert_guess(&self, guess: GuessEntity) -> MongoResult<GuessInsert> {
        let id = guess.id;
        let collection = self.guesses().await;
        let document: MongoGuessDocument = guess.into();

        match collection.insert_one(&document).await {
            Ok(_) => Ok(GuessInsert::Inserted),
            Err(err) => {
                let message = duplicate_key_message(&err).map(str::to_owned);
                match message.as_deref() {
                    Some(message) if message.contains(GUESS_VALUE_INDEX) => {
                        Ok(GuessInsert::DuplicateValue)
                    }
                    Some(message) if message.contains(GUESS_PARTICIPANT_INDEX) => {
                        Ok(GuessInsert::DuplicateParticipant)
                    }
                    _ => Err(MongoDaoError::WriteGuess { id, source: err }),
                }
            }
        }
    }

    async fn list_guesses(&self, session_id: Uuid) -> MongoResult<Vec<GuessEntity>> {
        let collection = self.guesses().await;
        let documents: Vec<MongoGuessDocument> = collection
            .find(doc! {"session_id": uuid_as_binary(session_id)})
            .sort(doc! {"created_at": 1, "_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadGuesses { session_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadGuesses { session_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_guess(&self, id: Uuid) -> MongoResult<Option<GuessEntity>> {
        let collection = self.guesses().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGuess { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn delete_guess(&self, id: Uuid) -> MongoResult<bool> {
        let collection = self.guesses().await;
        let result = collection
            .delete_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::WriteGuess { id, source })?;
        Ok(result.deleted_count > 0)
    }

    async fn clear_guesses(&self, session_id: Uuid) -> MongoResult<u64> {
        let collection = self.guesses().await;
        let result = collection
            .delete_many(doc! {"session_id": uuid_as_binary(session_id)})
            .await
            .map_err(|source| MongoDaoError::WriteGuess {
                id: session_id,
                source,
            })?;
        Ok(result.deleted_count)
    }

    async fn set_winner(&self, id: Uuid, is_winner: bool) -> MongoResult<bool> {
        let collection = self.guesses().await;
        let result = collection
            .update_one(doc_id(id), doc! {"$set": {"is_winner": is_winner}})
            .await
            .map_err(|source| MongoDaoError::WriteGuess { id, source })?;
        Ok(result.matched_count > 0)
    }

    async fn score(&self, session_id: Uuid) -> MongoResult<Option<i64>> {
        let collection = self.scores().await;
        let document = collection
            .find_one(doc! {"_id": uuid_as_binary(session_id)})
            .await
            .map_err(|source| MongoDaoError::LoadScore { session_id, source })?;
        Ok(document.map(|d| d.value))
    }

    async fn set_score(&self, session_id: Uuid, value: i64) -> MongoResult<()> {
        let collection = self.scores().await;
        collection
            .update_one(
                doc! {"_id": uuid_as_binary(session_id)},
                doc! {"$set": {"value": value, "updated_at": DateTime::now()}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteScore { session_id, source })?;
        Ok(())
    }

    async fn total_players(&self) -> MongoResult<Option<u32>> {
        let collection = self.capacity().await;
        let document = collection
            .find_one(doc! {"_id": CAPACITY_DOC_ID})
            .await
            .map_err(|source| MongoDaoError::LoadCapacity { source })?;
        Ok(document.map(|d| d.value))
    }

    async fn set_total_players(&self, value: u32) -> MongoResult<()> {
        let collection = self.capacity().await;
        collection
            .update_one(
                doc! {"_id": CAPACITY_DOC_ID},
                doc! {"$set": {"value": value as i64}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteCapacity { source })?;
        Ok(())
    }

    async fn bump_stat(&self, participant: &str, field: &str) -> MongoResult<()> {
        let collection = self.stats_collection().await;
        collection
            .update_one(
                doc! {"_id": participant},
                doc! {"$inc": {field: 1_i64}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteStats {
                participant: participant.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn record_best_score(&self, participant: &str, value: i64) -> MongoResult<()> {
        let collection = self.stats_collection().await;
        collection
            .update_one(
                doc! {"_id": participant},
                doc! {"$max": {"best_score": value}},
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WriteStats {
                participant: participant.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn stats(&self, participant: &str) -> MongoResult<Option<StatsEntity>> {
        let collection = self.stats_collection().await;
        let document = collection
            .find_one(doc! {"_id": participant})
            .await
            .map_err(|source| MongoDaoError::LoadStats {
                participant: participant.to_owned(),
                source,
            })?;
        Ok(document.map(Into::into))
    }
}

/// Extract the server message of a duplicate-key (E11000) write rejection.
fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = &*err.kind {
        if write_error.code == 11000 {
            return Some(write_error.message.as_str());
        }
    }
    None
}

impl GameStore for MongoGameStore {
    fn create_current_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_current_session(session).await.map_err(Into::into) })
    }

    fn current_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.current_session().await.map_err(Into::into) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_session(id).await.map_err(Into::into) })
    }

    fn update_timer(
        &self,
        id: Uuid,
        target_start_time: OffsetDateTime,
        is_active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_timer(id, target_start_time, is_active)
                .await
                .map_err(Into::into)
        })
    }

    fn mark_started(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.mark_started(id).await.map_err(Into::into) })
    }

    fn mark_ended(&self, id: Uuid, final_score: i64) -> BoxFuture<'static, StorageResult<EndOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.mark_ended(id, final_score).await.map_err(Into::into) })
    }

    fn insert_guess(&self, guess: GuessEntity) -> BoxFuture<'static, StorageResult<GuessInsert>> {
        let store = self.clone();
        Box::pin(async move { store.insert_guess(guess).await.map_err(Into::into) })
    }

    fn list_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_guesses(session_id).await.map_err(Into::into) })
    }

    fn find_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_guess(id).await.map_err(Into::into) })
    }

    fn delete_guess(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_guess(id).await.map_err(Into::into) })
    }

    fn clear_guesses(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.clear_guesses(session_id).await.map_err(Into::into) })
    }

    fn set_winner(&self, id: Uuid, is_winner: bool) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.set_winner(id, is_winner).await.map_err(Into::into) })
    }

    fn score(&self, session_id: Uuid) -> BoxFuture<'static, StorageResult<Option<i64>>> {
        let store = self.clone();
        Box::pin(async move { store.score(session_id).await.map_err(Into::into) })
    }

    fn set_score(&self, session_id: Uuid, value: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_score(session_id, value).await.map_err(Into::into) })
    }

    fn total_players(&self) -> BoxFuture<'static, StorageResult<Option<u32>>> {
        let store = self.clone();
        Box::pin(async move { store.total_players().await.map_err(Into::into) })
    }

    fn set_total_players(&self, value: u32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.set_total_players(value).await.map_err(Into::into) })
    }

    fn increment_games_played(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            store
                .bump_stat(&participant, "games_played")
                .await
                .map_err(Into::into)
        })
    }

    fn increment_wins(&self, participant: &str) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move { store.bump_stat(&participant, "wins").await.map_err(Into::into) })
    }

    fn record_best_score(&self, participant: &str, value: i64) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move {
            store
                .record_best_score(&participant, value)
                .await
                .map_err(Into::into)
        })
    }

    fn stats(&self, participant: &str) -> BoxFuture<'static, StorageResult<Option<StatsEntity>>> {
        let store = self.clone();
        let participant = participant.to_owned();
        Box::pin(async move { store.stats(&participant).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
