//! Append-only log of game results
//!
//! Every completed play session that reaches the persistence step becomes one row
//! in `game_results`. Rows are never updated or deleted by the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{QueryBuilder, Row};

use crate::error::{Error, Result};
use crate::storage::Database;

const SELECT_COLUMNS: &str = "SELECT id, student_name, student_email, project_name, score, time_spent, created_at FROM game_results";

/// A stored game result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
    pub id: i64,
    pub student_name: String,
    pub student_email: String,
    /// Free text; survives deletion of the project it names
    pub project_name: String,
    /// Opaque, formatted by the game
    pub score: String,
    /// Opaque, formatted by the game
    pub time_spent: String,
    pub created_at: DateTime<Utc>,
}

/// A result about to be appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGameResult {
    pub student_name: String,
    pub student_email: String,
    pub project_name: String,
    pub score: String,
    pub time_spent: String,
}

/// Exact-match filters; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    pub student_name: Option<String>,
    pub project_name: Option<String>,
    pub student_email: Option<String>,
}

impl ResultFilter {
    /// Build a filter, treating empty strings as absent
    pub fn new(
        student_name: Option<String>,
        project_name: Option<String>,
        student_email: Option<String>,
    ) -> Self {
        let keep = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            student_name: keep(student_name),
            project_name: keep(project_name),
            student_email: keep(student_email),
        }
    }

    fn predicates(&self) -> impl Iterator<Item = (&'static str, &String)> {
        [
            ("student_name", self.student_name.as_ref()),
            ("project_name", self.project_name.as_ref()),
            ("student_email", self.student_email.as_ref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (i, (column, value)) in self.predicates().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            qb.push(column);
            qb.push(" = ");
            qb.push_bind(value.clone());
        }
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone, Serialize)]
pub struct ResultPage {
    pub items: Vec<GameResult>,
    pub total: i64,
    /// 1-indexed
    pub page: u32,
    pub page_size: u32,
}

impl ResultPage {
    pub fn total_pages(&self) -> u32 {
        let size = i64::from(self.page_size.max(1));
        ((self.total + size - 1) / size) as u32
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Results log over the SQLite database
#[derive(Debug, Clone)]
pub struct ResultsLog {
    db: Database,
}

impl ResultsLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Append a result stamped with the current time
    pub async fn append(&self, entry: NewGameResult) -> Result<GameResult> {
        let created_at = Utc::now();
        let done = sqlx::query(
            r#"
            INSERT INTO game_results (student_name, student_email, project_name, score, time_spent, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.student_name)
        .bind(&entry.student_email)
        .bind(&entry.project_name)
        .bind(&entry.score)
        .bind(&entry.time_spent)
        .bind(created_at)
        .execute(self.db.pool())
        .await?;

        let id = done.last_insert_rowid();
        tracing::info!(id, student = %entry.student_name, project = %entry.project_name, "Game result saved");

        Ok(GameResult {
            id,
            student_name: entry.student_name,
            student_email: entry.student_email,
            project_name: entry.project_name,
            score: entry.score,
            time_spent: entry.time_spent,
            created_at,
        })
    }

    /// Filtered, newest-first page of results
    ///
    /// Pages start at 1 (0 is treated as 1). Pages past the end come back empty.
    pub async fn query(&self, filter: &ResultFilter, page: u32, page_size: u32) -> Result<ResultPage> {
        if page_size == 0 {
            return Err(Error::Validation("Page size must be at least 1".to_string()));
        }
        let page = page.max(1);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM game_results");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.db.pool()).await?;

        let offset = i64::from(page - 1) * i64::from(page_size);
        let mut select = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        filter.push_where(&mut select);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(i64::from(page_size));
        select.push(" OFFSET ");
        select.push_bind(offset);

        let rows = select.build().fetch_all(self.db.pool()).await?;
        let items = rows
            .iter()
            .map(row_to_result)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ResultPage {
            items,
            total,
            page,
            page_size,
        })
    }

    /// Total number of stored results
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM game_results")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    pub async fn distinct_student_names(&self) -> Result<Vec<String>> {
        self.distinct("student_name").await
    }

    pub async fn distinct_project_names(&self) -> Result<Vec<String>> {
        self.distinct("project_name").await
    }

    pub async fn distinct_emails(&self) -> Result<Vec<String>> {
        self.distinct("student_email").await
    }

    async fn distinct(&self, column: &'static str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT {column} FROM game_results ORDER BY {column}"
        );
        let values: Vec<String> = sqlx::query_scalar(&sql).fetch_all(self.db.pool()).await?;
        Ok(values)
    }
}

fn row_to_result(row: &SqliteRow) -> std::result::Result<GameResult, sqlx::Error> {
    Ok(GameResult {
        id: row.try_get("id")?,
        student_name: row.try_get("student_name")?,
        student_email: row.try_get("student_email")?,
        project_name: row.try_get("project_name")?,
        score: row.try_get("score")?,
        time_spent: row.try_get("time_spent")?,
        created_at: row.try_get("created_at")?,
    })
}
