//! CSV loaders, one per entity
//!
//! Rows keep the ids from the files so later files can reference them.
//! Every reference is checked before its row is inserted; the caller runs
//! the loaders inside a single transaction, so the first failure leaves
//! the database untouched.

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    PrimaryKeyTrait, TransactionTrait,
};
use serde::de::DeserializeOwned;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yamdb_common::db::models::*;
use yamdb_common::metrics;

use crate::errors::{ImportError, Result};
use crate::records::*;

/// Importable fixture files, in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    Categories,
    Genres,
    Users,
    Titles,
    Reviews,
    Comments,
    GenreTitles,
}

impl Fixture {
    /// Parents before children
    pub const ALL: [Fixture; 7] = [
        Fixture::Categories,
        Fixture::Genres,
        Fixture::Users,
        Fixture::Titles,
        Fixture::Reviews,
        Fixture::Comments,
        Fixture::GenreTitles,
    ];

    /// Fixture file name
    pub fn file_name(&self) -> &'static str {
        match self {
            Fixture::Categories => "category.csv",
            Fixture::Genres => "genre.csv",
            Fixture::Users => "users.csv",
            Fixture::Titles => "titles.csv",
            Fixture::Reviews => "review.csv",
            Fixture::Comments => "comments.csv",
            Fixture::GenreTitles => "genre_title.csv",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Fixture::Categories => "categories",
            Fixture::Genres => "genres",
            Fixture::Users => "users",
            Fixture::Titles => "titles",
            Fixture::Reviews => "reviews",
            Fixture::Comments => "comments",
            Fixture::GenreTitles => "genre_title",
        }
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Rows imported per entity
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub counts: Vec<(Fixture, usize)>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

/// Import the given files in order, all or nothing
pub async fn import_files(db: &DatabaseConnection, jobs: &[(Fixture, PathBuf)]) -> Result<ImportReport> {
    let mut sources = Vec::with_capacity(jobs.len());
    for (fixture, path) in jobs {
        sources.push((*fixture, path.display().to_string(), open(path)?));
    }
    import(db, sources).await
}

/// Import already opened sources in order, all or nothing
pub async fn import<R: Read>(
    db: &DatabaseConnection,
    sources: Vec<(Fixture, String, R)>,
) -> Result<ImportReport> {
    let txn = db.begin().await?;
    let mut report = ImportReport::default();

    for (fixture, name, reader) in sources {
        let count = load(&txn, fixture, &name, reader).await?;
        info!(table = %fixture, source = %name, rows = count, "Loaded rows");
        report.counts.push((fixture, count));
    }

    if txn.get_database_backend() == DatabaseBackend::Postgres {
        for (fixture, _) in &report.counts {
            reset_sequence(&txn, fixture.table()).await?;
        }
    }

    txn.commit().await?;

    for (fixture, count) in &report.counts {
        metrics::record_import(fixture.table(), *count);
    }
    Ok(report)
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ImportError::Open {
        path: path.display().to_string(),
        source,
    })
}

async fn load<C: ConnectionTrait, R: Read>(
    conn: &C,
    fixture: Fixture,
    source: &str,
    reader: R,
) -> Result<usize> {
    match fixture {
        Fixture::Categories => load_categories(conn, source, reader).await,
        Fixture::Genres => load_genres(conn, source, reader).await,
        Fixture::Users => load_users(conn, source, reader).await,
        Fixture::Titles => load_titles(conn, source, reader).await,
        Fixture::Reviews => load_reviews(conn, source, reader).await,
        Fixture::Comments => load_comments(conn, source, reader).await,
        Fixture::GenreTitles => load_genre_titles(conn, source, reader).await,
    }
}

/// Parse every row up front so a malformed file fails before any insert
fn read_rows<T: DeserializeOwned, R: Read>(source: &str, reader: R) -> Result<Vec<T>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    csv.deserialize()
        .map(|row| {
            row.map_err(|e| ImportError::MalformedRow {
                source_name: source.to_string(),
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Fails unless a row with this primary key exists
async fn ensure_exists<E, C>(
    conn: &C,
    id: i32,
    source: &str,
    row_id: i32,
    field: &'static str,
    target: &'static str,
) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
    i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
{
    if E::find_by_id(id).one(conn).await?.is_some() {
        return Ok(());
    }
    Err(ImportError::MissingReference {
        source_name: source.to_string(),
        row_id,
        field,
        target,
        target_id: id,
    })
}

async fn load_categories<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<SlugRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        CategoryEntity::insert(CategoryActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

async fn load_genres<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<SlugRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        GenreEntity::insert(GenreActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            slug: Set(row.slug),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

/// Imported accounts are active; their owners only need a token
async fn load_users<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<UserRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        UserEntity::insert(UserActiveModel {
            id: Set(row.id),
            username: Set(row.username),
            email: Set(row.email),
            role: Set(row.role.unwrap_or_default()),
            first_name: Set(row.first_name),
            last_name: Set(row.last_name),
            bio: Set(row.bio),
            is_active: Set(true),
            is_staff: Set(false),
            date_joined: Set(Utc::now().into()),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

async fn load_titles<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<TitleRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        if let Some(category_id) = row.category {
            ensure_exists::<CategoryEntity, _>(conn, category_id, source, row.id, "category", "category")
                .await?;
        }

        TitleEntity::insert(TitleActiveModel {
            id: Set(row.id),
            name: Set(row.name),
            year: Set(row.year),
            description: Set(None),
            category_id: Set(row.category),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

async fn load_reviews<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<ReviewRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        if !(1..=10).contains(&row.score) {
            return Err(ImportError::InvalidRow {
                source_name: source.to_string(),
                row_id: row.id,
                message: format!("score {} is outside 1..=10", row.score),
            });
        }
        ensure_exists::<TitleEntity, _>(conn, row.title_id, source, row.id, "title_id", "title").await?;
        ensure_exists::<UserEntity, _>(conn, row.author, source, row.id, "author", "user").await?;

        ReviewEntity::insert(ReviewActiveModel {
            id: Set(row.id),
            title_id: Set(row.title_id),
            author_id: Set(row.author),
            text: Set(row.text),
            score: Set(row.score),
            pub_date: Set(row.pub_date),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

async fn load_comments<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<CommentRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        ensure_exists::<ReviewEntity, _>(conn, row.review_id, source, row.id, "review_id", "review").await?;
        ensure_exists::<UserEntity, _>(conn, row.author, source, row.id, "author", "user").await?;

        CommentEntity::insert(CommentActiveModel {
            id: Set(row.id),
            review_id: Set(row.review_id),
            author_id: Set(row.author),
            text: Set(row.text),
            pub_date: Set(row.pub_date),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

async fn load_genre_titles<C: ConnectionTrait, R: Read>(conn: &C, source: &str, reader: R) -> Result<usize> {
    let rows: Vec<GenreTitleRow> = read_rows(source, reader)?;
    let count = rows.len();

    for row in rows {
        ensure_exists::<TitleEntity, _>(conn, row.title_id, source, row.id, "title_id", "title").await?;
        ensure_exists::<GenreEntity, _>(conn, row.genre_id, source, row.id, "genre_id", "genre").await?;

        GenreTitleEntity::insert(GenreTitleActiveModel {
            id: Set(row.id),
            title_id: Set(row.title_id),
            genre_id: Set(Some(row.genre_id)),
        })
        .exec(conn)
        .await?;
    }
    Ok(count)
}

/// Move a serial sequence past the explicitly inserted ids
async fn reset_sequence<C: ConnectionTrait>(conn: &C, table: &str) -> Result<()> {
    let sql = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE(MAX(id), 0) + 1, false) FROM {table}"
    );
    conn.execute_unprepared(&sql).await?;
    debug!(table, "Sequence reset");
    Ok(())
}
