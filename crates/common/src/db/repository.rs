//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Title together with everything its read representation needs
#[derive(Debug, Clone, PartialEq)]
pub struct TitleRecord {
    pub title: Title,
    pub category: Option<Category>,
    pub genres: Vec<Genre>,
    /// Mean review score, `None` without reviews
    pub rating: Option<f64>,
}

/// Title list filters (`?category=&genre=&name=&year=`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TitleFilter {
    /// Category slug
    pub category: Option<String>,
    /// Genre slug
    pub genre: Option<String>,
    /// Substring of the title name
    pub name: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
}

/// Partial user update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct NewTitle {
    pub name: String,
    pub year: i32,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub genre_ids: Vec<i32>,
}

/// Partial title update; `genre_ids: Some` replaces every genre link
#[derive(Debug, Clone, Default)]
pub struct TitleChanges {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<i32>>,
    pub genre_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub title_id: i32,
    pub author_id: i32,
    pub text: String,
    pub score: i32,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub review_id: i32,
    pub author_id: i32,
    pub text: String,
}

/// Mean of `count` scores adding up to `total`
pub fn average_score(total: i64, count: i64) -> Option<f64> {
    (count > 0).then(|| total as f64 / count as f64)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn find_user_by_id(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Username.eq(username))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find the user registered with exactly this (email, username) pair
    pub async fn find_user_by_credentials(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>> {
        UserEntity::find()
            .filter(UserColumn::Email.eq(email))
            .filter(UserColumn::Username.eq(username))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Whether the email or the username is taken, optionally ignoring one user
    pub async fn user_identity_taken(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        except_id: Option<i32>,
    ) -> Result<bool> {
        let mut identity = Condition::any();
        if let Some(email) = email {
            identity = identity.add(UserColumn::Email.eq(email));
        }
        if let Some(username) = username {
            identity = identity.add(UserColumn::Username.eq(username));
        }
        if identity.is_empty() {
            return Ok(false);
        }

        let mut query = UserEntity::find().filter(identity);
        if let Some(id) = except_id {
            query = query.filter(UserColumn::Id.ne(id));
        }

        Ok(query.count(self.write_conn()).await? > 0)
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        let model = UserActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            role: Set(user.role),
            first_name: Set(user.first_name),
            last_name: Set(user.last_name),
            bio: Set(user.bio),
            is_active: Set(user.is_active),
            is_staff: Set(false),
            date_joined: Set(Utc::now().into()),
            ..Default::default()
        };

        model
            .insert(self.write_conn())
            .await
            .map_err(conflict_on_duplicate("A user with this username or email"))
    }

    /// List users, optionally narrowed to usernames containing `search`
    pub async fn list_users(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<User>, u64)> {
        let mut query = UserEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(UserColumn::Username.contains(term));
        }

        page(query.order_by_asc(UserColumn::Id), self.read_conn(), offset, limit).await
    }

    pub async fn update_user(&self, user: User, changes: UserChanges) -> Result<User> {
        let mut active: UserActiveModel = user.clone().into();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(Some(last_name));
        }
        if let Some(bio) = changes.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if !active.is_changed() {
            return Ok(user);
        }

        active
            .update(self.write_conn())
            .await
            .map_err(conflict_on_duplicate("A user with this username or email"))
    }

    pub async fn activate_user(&self, user: User) -> Result<User> {
        if user.is_active {
            return Ok(user);
        }
        let mut active: UserActiveModel = user.into();
        active.is_active = Set(true);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a user with their reviews, their comments and the comments
    /// left under their reviews
    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        let review_ids = Query::select()
            .column(ReviewColumn::Id)
            .from(ReviewEntity)
            .and_where(Expr::col(ReviewColumn::AuthorId).eq(id))
            .to_owned();
        CommentEntity::delete_many()
            .filter(
                Condition::any()
                    .add(CommentColumn::AuthorId.eq(id))
                    .add(CommentColumn::ReviewId.in_subquery(review_ids)),
            )
            .exec(&txn)
            .await?;
        ReviewEntity::delete_many()
            .filter(ReviewColumn::AuthorId.eq(id))
            .exec(&txn)
            .await?;
        let result = UserEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Category & Genre Operations
    // ========================================================================

    pub async fn list_categories(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Category>, u64)> {
        let mut query = CategoryEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(CategoryColumn::Name.contains(term));
        }

        page(query.order_by_asc(CategoryColumn::Name), self.read_conn(), offset, limit).await
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        CategoryEntity::find()
            .filter(CategoryColumn::Slug.eq(slug))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_category(&self, name: String, slug: String) -> Result<Category> {
        let model = CategoryActiveModel {
            name: Set(name),
            slug: Set(slug),
            ..Default::default()
        };
        model
            .insert(self.write_conn())
            .await
            .map_err(conflict_on_duplicate("A category with this slug"))
    }

    /// Delete a category; its titles keep existing without one
    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        TitleEntity::update_many()
            .col_expr(TitleColumn::CategoryId, Expr::value(Option::<i32>::None))
            .filter(TitleColumn::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        let result = CategoryEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_genres(
        &self,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Genre>, u64)> {
        let mut query = GenreEntity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            query = query.filter(GenreColumn::Name.contains(term));
        }

        page(query.order_by_asc(GenreColumn::Name), self.read_conn(), offset, limit).await
    }

    pub async fn find_genre_by_slug(&self, slug: &str) -> Result<Option<Genre>> {
        GenreEntity::find()
            .filter(GenreColumn::Slug.eq(slug))
            .one(self.write_conn())
            .await
            .map_err(Into::into)
    }

    /// Resolve genre slugs; unknown slugs are simply absent from the result
    pub async fn find_genres_by_slugs(&self, slugs: &[String]) -> Result<Vec<Genre>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        GenreEntity::find()
            .filter(GenreColumn::Slug.is_in(slugs.iter().cloned()))
            .all(self.write_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_genre(&self, name: String, slug: String) -> Result<Genre> {
        let model = GenreActiveModel {
            name: Set(name),
            slug: Set(slug),
            ..Default::default()
        };
        model
            .insert(self.write_conn())
            .await
            .map_err(conflict_on_duplicate("A genre with this slug"))
    }

    /// Delete a genre; links pointing at it are kept with a null genre
    pub async fn delete_genre(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        GenreTitleEntity::update_many()
            .col_expr(GenreTitleColumn::GenreId, Expr::value(Option::<i32>::None))
            .filter(GenreTitleColumn::GenreId.eq(id))
            .exec(&txn)
            .await?;
        let result = GenreEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Title Operations
    // ========================================================================

    pub async fn list_titles(
        &self,
        filter: &TitleFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<TitleRecord>, u64)> {
        let mut query = TitleEntity::find();

        if let Some(slug) = filter.category.as_deref() {
            query = query.filter(
                TitleColumn::CategoryId.in_subquery(
                    Query::select()
                        .column(CategoryColumn::Id)
                        .from(CategoryEntity)
                        .and_where(Expr::col(CategoryColumn::Slug).eq(slug))
                        .to_owned(),
                ),
            );
        }
        if let Some(slug) = filter.genre.as_deref() {
            query = query.filter(
                TitleColumn::Id.in_subquery(
                    Query::select()
                        .column((GenreTitleEntity, GenreTitleColumn::TitleId))
                        .from(GenreTitleEntity)
                        .inner_join(
                            GenreEntity,
                            Expr::col((GenreEntity, GenreColumn::Id))
                                .equals((GenreTitleEntity, GenreTitleColumn::GenreId)),
                        )
                        .and_where(Expr::col((GenreEntity, GenreColumn::Slug)).eq(slug))
                        .to_owned(),
                ),
            );
        }
        if let Some(name) = filter.name.as_deref().filter(|n| !n.is_empty()) {
            query = query.filter(TitleColumn::Name.contains(name));
        }
        if let Some(year) = filter.year {
            query = query.filter(TitleColumn::Year.eq(year));
        }

        let (titles, total) =
            page(query.order_by_asc(TitleColumn::Id), self.read_conn(), offset, limit).await?;
        let records = self.hydrate_titles(self.read_conn(), titles).await?;

        Ok((records, total))
    }

    pub async fn find_title(&self, id: i32) -> Result<Option<TitleRecord>> {
        self.find_title_on(self.read_conn(), id).await
    }

    pub async fn title_exists(&self, id: i32) -> Result<bool> {
        Ok(TitleEntity::find_by_id(id).count(self.read_conn()).await? > 0)
    }

    /// Insert a title and its genre links atomically
    pub async fn create_title(&self, new: NewTitle) -> Result<TitleRecord> {
        let txn = self.write_conn().begin().await?;

        let title = TitleActiveModel {
            name: Set(new.name),
            year: Set(new.year),
            description: Set(new.description),
            category_id: Set(new.category_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        link_genres(&txn, title.id, &new.genre_ids).await?;

        txn.commit().await?;

        self.require_title(title.id).await
    }

    pub async fn update_title(&self, title: Title, changes: TitleChanges) -> Result<TitleRecord> {
        let id = title.id;
        let txn = self.write_conn().begin().await?;

        let mut active: TitleActiveModel = title.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(year) = changes.year {
            active.year = Set(year);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(category_id) = changes.category_id {
            active.category_id = Set(category_id);
        }
        if active.is_changed() {
            active.update(&txn).await?;
        }

        if let Some(genre_ids) = changes.genre_ids {
            GenreTitleEntity::delete_many()
                .filter(GenreTitleColumn::TitleId.eq(id))
                .exec(&txn)
                .await?;
            link_genres(&txn, id, &genre_ids).await?;
        }

        txn.commit().await?;

        self.require_title(id).await
    }

    /// Delete a title together with its reviews, comments and genre links
    pub async fn delete_title(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        let review_ids = Query::select()
            .column(ReviewColumn::Id)
            .from(ReviewEntity)
            .and_where(Expr::col(ReviewColumn::TitleId).eq(id))
            .to_owned();
        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.in_subquery(review_ids))
            .exec(&txn)
            .await?;
        ReviewEntity::delete_many()
            .filter(ReviewColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;
        GenreTitleEntity::delete_many()
            .filter(GenreTitleColumn::TitleId.eq(id))
            .exec(&txn)
            .await?;
        let result = TitleEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    async fn require_title(&self, id: i32) -> Result<TitleRecord> {
        self.find_title_on(self.write_conn(), id)
            .await?
            .ok_or_else(|| AppError::not_found("Title", id))
    }

    async fn find_title_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: i32,
    ) -> Result<Option<TitleRecord>> {
        let Some(title) = TitleEntity::find_by_id(id).one(conn).await? else {
            return Ok(None);
        };
        Ok(self.hydrate_titles(conn, vec![title]).await?.pop())
    }

    /// Attach category, genres and rating to each title, preserving order
    async fn hydrate_titles<C: ConnectionTrait>(
        &self,
        conn: &C,
        titles: Vec<Title>,
    ) -> Result<Vec<TitleRecord>> {
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let title_ids: Vec<i32> = titles.iter().map(|t| t.id).collect();
        let category_ids: Vec<i32> = titles.iter().filter_map(|t| t.category_id).collect();

        let categories: HashMap<i32, Category> = if category_ids.is_empty() {
            HashMap::new()
        } else {
            CategoryEntity::find()
                .filter(CategoryColumn::Id.is_in(category_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect()
        };

        let mut genres: HashMap<i32, Vec<Genre>> = HashMap::new();
        let links = GenreTitleEntity::find()
            .filter(GenreTitleColumn::TitleId.is_in(title_ids.clone()))
            .order_by_asc(GenreTitleColumn::Id)
            .find_also_related(GenreEntity)
            .all(conn)
            .await?;
        for (link, genre) in links {
            if let Some(genre) = genre {
                genres.entry(link.title_id).or_default().push(genre);
            }
        }

        let ratings = ratings_on(conn, &title_ids).await?;

        Ok(titles
            .into_iter()
            .map(|title| TitleRecord {
                category: title.category_id.and_then(|id| categories.get(&id).cloned()),
                genres: genres.remove(&title.id).unwrap_or_default(),
                rating: ratings.get(&title.id).copied(),
                title,
            })
            .collect())
    }

    // ========================================================================
    // Review Operations
    // ========================================================================

    pub async fn list_reviews(
        &self,
        title_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<(Review, User)>, u64)> {
        let query = ReviewEntity::find().filter(ReviewColumn::TitleId.eq(title_id));
        let total = query.clone().count(self.read_conn()).await?;

        let rows = query
            .order_by_asc(ReviewColumn::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(UserEntity)
            .all(self.read_conn())
            .await?;

        Ok((with_authors(rows), total))
    }

    /// Find a review only if it belongs to the given title
    pub async fn find_review(&self, title_id: i32, review_id: i32) -> Result<Option<(Review, User)>> {
        let row = ReviewEntity::find_by_id(review_id)
            .filter(ReviewColumn::TitleId.eq(title_id))
            .find_also_related(UserEntity)
            .one(self.read_conn())
            .await?;

        Ok(row.and_then(|(review, author)| author.map(|a| (review, a))))
    }

    pub async fn has_reviewed(&self, author_id: i32, title_id: i32) -> Result<bool> {
        let count = ReviewEntity::find()
            .filter(ReviewColumn::AuthorId.eq(author_id))
            .filter(ReviewColumn::TitleId.eq(title_id))
            .count(self.write_conn())
            .await?;
        Ok(count > 0)
    }

    pub async fn create_review(&self, new: NewReview) -> Result<Review> {
        let model = ReviewActiveModel {
            title_id: Set(new.title_id),
            author_id: Set(new.author_id),
            text: Set(new.text),
            score: Set(new.score),
            pub_date: Set(Utc::now().into()),
            ..Default::default()
        };
        model
            .insert(self.write_conn())
            .await
            .map_err(conflict_on_duplicate("A review by this author for this title"))
    }

    pub async fn update_review(
        &self,
        review: Review,
        text: Option<String>,
        score: Option<i32>,
    ) -> Result<Review> {
        let mut active: ReviewActiveModel = review.clone().into();
        if let Some(text) = text {
            active.text = Set(text);
        }
        if let Some(score) = score {
            active.score = Set(score);
        }
        if !active.is_changed() {
            return Ok(review);
        }
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete a review and its comments
    pub async fn delete_review(&self, id: i32) -> Result<bool> {
        let txn = self.write_conn().begin().await?;

        CommentEntity::delete_many()
            .filter(CommentColumn::ReviewId.eq(id))
            .exec(&txn)
            .await?;
        let result = ReviewEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    pub async fn list_comments(
        &self,
        review_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<(Comment, User)>, u64)> {
        let query = CommentEntity::find().filter(CommentColumn::ReviewId.eq(review_id));
        let total = query.clone().count(self.read_conn()).await?;

        let rows = query
            .order_by_asc(CommentColumn::Id)
            .offset(offset)
            .limit(limit)
            .find_also_related(UserEntity)
            .all(self.read_conn())
            .await?;

        Ok((with_authors(rows), total))
    }

    pub async fn find_comment(
        &self,
        review_id: i32,
        comment_id: i32,
    ) -> Result<Option<(Comment, User)>> {
        let row = CommentEntity::find_by_id(comment_id)
            .filter(CommentColumn::ReviewId.eq(review_id))
            .find_also_related(UserEntity)
            .one(self.read_conn())
            .await?;

        Ok(row.and_then(|(comment, author)| author.map(|a| (comment, a))))
    }

    pub async fn create_comment(&self, new: NewComment) -> Result<Comment> {
        let model = CommentActiveModel {
            review_id: Set(new.review_id),
            author_id: Set(new.author_id),
            text: Set(new.text),
            pub_date: Set(Utc::now().into()),
            ..Default::default()
        };
        model.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_comment(&self, comment: Comment, text: Option<String>) -> Result<Comment> {
        let Some(text) = text else {
            return Ok(comment);
        };
        let mut active: CommentActiveModel = comment.into();
        active.text = Set(text);
        active.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_comment(&self, id: i32) -> Result<bool> {
        let result = CommentEntity::delete_by_id(id).exec(self.write_conn()).await?;
        Ok(result.rows_affected > 0)
    }
}

/// Unique index violations become a conflict, anything else stays a database error
fn conflict_on_duplicate(what: &'static str) -> impl FnOnce(DbErr) -> AppError {
    move |err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict {
            message: format!("{} already exists", what),
        },
        _ => err.into(),
    }
}

/// Count the filtered rows, then fetch one window of them
async fn page<E>(
    query: Select<E>,
    conn: &DatabaseConnection,
    offset: u64,
    limit: u64,
) -> Result<(Vec<E::Model>, u64)>
where
    E: EntityTrait,
    E::Model: Sync,
{
    let total = query.clone().count(conn).await?;
    let rows = query.offset(offset).limit(limit).all(conn).await?;
    Ok((rows, total))
}

async fn link_genres<C: ConnectionTrait>(conn: &C, title_id: i32, genre_ids: &[i32]) -> Result<()> {
    if genre_ids.is_empty() {
        return Ok(());
    }
    let links = genre_ids.iter().map(|genre_id| GenreTitleActiveModel {
        title_id: Set(title_id),
        genre_id: Set(Some(*genre_id)),
        ..Default::default()
    });
    GenreTitleEntity::insert_many(links).exec(conn).await?;
    Ok(())
}

async fn ratings_on<C: ConnectionTrait>(conn: &C, title_ids: &[i32]) -> Result<HashMap<i32, f64>> {
    if title_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, i64, i64)> = ReviewEntity::find()
        .select_only()
        .column(ReviewColumn::TitleId)
        .column_as(Expr::col(ReviewColumn::Score).sum(), "total")
        .column_as(Expr::col(ReviewColumn::Id).count(), "reviews")
        .filter(ReviewColumn::TitleId.is_in(title_ids.iter().copied()))
        .group_by(ReviewColumn::TitleId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(title_id, total, count)| average_score(total, count).map(|r| (title_id, r)))
        .collect())
}

fn with_authors<M>(rows: Vec<(M, Option<User>)>) -> Vec<(M, User)> {
    rows.into_iter()
        .filter_map(|(row, author)| author.map(|a| (row, a)))
        .collect()
}
