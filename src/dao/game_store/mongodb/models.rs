use std::time::SystemTime;

use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::models::{GuessEntity, SessionEntity, StatsEntity};

/// Session document as persisted in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    target_start_time: DateTime,
    is_active: bool,
    is_current: bool,
    #[serde(default)]
    started: bool,
    #[serde(default)]
    ended: bool,
    #[serde(default)]
    final_score: Option<i64>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            target_start_time: to_bson_datetime(value.target_start_time),
            is_active: value.is_active,
            is_current: value.is_current,
            started: value.started,
            ended: value.ended,
            final_score: value.final_score,
            created_at: to_bson_datetime(value.created_at),
            updated_at: to_bson_datetime(value.updated_at),
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            target_start_time: from_bson_datetime(value.target_start_time),
            is_active: value.is_active,
            is_current: value.is_current,
            started: value.started,
            ended: value.ended,
            final_score: value.final_score,
            created_at: from_bson_datetime(value.created_at),
            updated_at: from_bson_datetime(value.updated_at),
        }
    }
}

/// Guess document as persisted in the `guesses` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGuessDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    session_id: Uuid,
    participant: String,
    value: i64,
    #[serde(default)]
    is_winner: bool,
    created_at: DateTime,
}

impl From<GuessEntity> for MongoGuessDocument {
    fn from(value: GuessEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            participant: value.participant,
            value: value.value,
            is_winner: value.is_winner,
            created_at: to_bson_datetime(value.created_at),
        }
    }
}

impl From<MongoGuessDocument> for GuessEntity {
    fn from(value: MongoGuessDocument) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            participant: value.participant,
            value: value.value,
            is_winner: value.is_winner,
            created_at: from_bson_datetime(value.created_at),
        }
    }
}

/// Team score document, keyed by session id so upserts are natural.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    #[serde(rename = "_id")]
    pub session_id: Uuid,
    pub value: i64,
    pub updated_at: DateTime,
}

/// Singleton document holding the advertised party capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoCapacityDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub value: u32,
}

/// Stats document keyed by participant identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatsDocument {
    #[serde(rename = "_id")]
    participant: String,
    #[serde(default)]
    games_played: i64,
    #[serde(default)]
    wins: i64,
    #[serde(default)]
    best_score: Option<i64>,
}

impl From<MongoStatsDocument> for StatsEntity {
    fn from(value: MongoStatsDocument) -> Self {
        Self {
            participant: value.participant,
            games_played: u64::try_from(value.games_played).unwrap_or(0),
            wins: u64::try_from(value.wins).unwrap_or(0),
            best_score: value.best_score,
        }
    }
}

pub fn to_bson_datetime(value: OffsetDateTime) -> DateTime {
    DateTime::from_system_time(SystemTime::from(value))
}

pub fn from_bson_datetime(value: DateTime) -> OffsetDateTime {
    OffsetDateTime::from(value.to_system_time())
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
