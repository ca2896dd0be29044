use crate::models::{
    Article, ArticleSummary, Category, Country, CreateCategoryRequest, CreateCountryRequest,
    DashboardStats, Role, Session, UpdateArticleRequest, UpdateCategoryRequest,
    UpdateCountryRequest, User,
};
use crate::pagination::{Page, PageRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Failures of the persistence layer. Constraint violations are classified so the
/// request boundary can report them as validation problems instead of server errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let detail = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return RepositoryError::UniqueViolation(detail);
            }
            if db_err.is_foreign_key_violation() {
                return RepositoryError::ForeignKeyViolation(detail);
            }
        }
        RepositoryError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// ArticleQuery
///
/// Filter shared by the public listing, the admin listing and the dashboard. Results
/// are always ordered by `published_at DESC, id ASC`.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    /// Restricts to `active = true`. Set for every public read.
    pub active_only: bool,
    pub country_id: Option<i32>,
    pub category_id: Option<i32>,
    /// Restricts to one owner. Set when an Editor lists articles.
    pub author_id: Option<i32>,
    /// Case-insensitive match on title, body or summary.
    pub search: Option<String>,
}

impl ArticleQuery {
    /// Filter for anonymous reads: active articles only.
    pub fn public() -> Self {
        Self {
            active_only: true,
            ..Self::default()
        }
    }

    /// The search term, trimmed and lowercased. Blank input means no search.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Insert payload for an article. Author and timestamp are resolved by the caller.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub body: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub active: bool,
    pub country_id: i32,
    pub category_id: i32,
    pub author_id: i32,
}

/// Insert payload for a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
    pub password_hash: String,
}

/// Partial user update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub password_hash: Option<String>,
}

/// Result of a guarded delete on a record that articles may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Left untouched because this many articles still point at it.
    Referenced(i64),
}

/// Repository Trait
///
/// The contract of the data access layer. Handlers only see `Arc<dyn Repository>`, so
/// the Postgres store and the in-memory store are interchangeable.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Article Retrieval ---
    async fn find_articles(
        &self,
        query: &ArticleQuery,
        page: PageRequest,
    ) -> RepoResult<Page<ArticleSummary>>;
    // Unpaginated listing, optionally capped at `limit` rows.
    async fn list_articles(
        &self,
        query: &ArticleQuery,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ArticleSummary>>;
    async fn get_article_summary(&self, id: i32, active_only: bool)
    -> RepoResult<Option<ArticleSummary>>;
    async fn get_article(&self, id: i32) -> RepoResult<Option<Article>>;
    async fn count_articles(&self, query: &ArticleQuery) -> RepoResult<i64>;

    // --- Article Mutations ---
    async fn create_article(&self, article: NewArticle) -> RepoResult<Article>;
    // `None` when the row disappeared before the update ran.
    async fn update_article(
        &self,
        id: i32,
        changes: UpdateArticleRequest,
    ) -> RepoResult<Option<Article>>;
    async fn delete_article(&self, id: i32) -> RepoResult<bool>;

    // --- Categories ---
    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: i32, active_only: bool) -> RepoResult<Option<Category>>;
    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<Category>;
    async fn update_category(
        &self,
        id: i32,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>>;
    async fn delete_category(&self, id: i32) -> RepoResult<DeleteOutcome>;

    // --- Countries ---
    async fn list_countries(&self, active_only: bool) -> RepoResult<Vec<Country>>;
    async fn get_country(&self, id: i32, active_only: bool) -> RepoResult<Option<Country>>;
    async fn create_country(&self, req: CreateCountryRequest) -> RepoResult<Country>;
    async fn update_country(
        &self,
        id: i32,
        req: UpdateCountryRequest,
    ) -> RepoResult<Option<Country>>;
    async fn delete_country(&self, id: i32) -> RepoResult<DeleteOutcome>;

    // --- Users ---
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn get_user(&self, id: i32) -> RepoResult<Option<User>>;
    async fn find_active_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// True when another user (other than `exclude`) already owns the username or email.
    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        exclude: Option<i32>,
    ) -> RepoResult<bool>;
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>>;
    async fn delete_user(&self, id: i32) -> RepoResult<DeleteOutcome>;

    // --- Sessions ---
    async fn create_session(&self, session: &Session) -> RepoResult<()>;
    async fn session_active(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool>;
    async fn revoke_session(&self, id: Uuid) -> RepoResult<bool>;
    /// Deletes the user's sessions that expired at or before `now`; returns how many.
    async fn purge_expired_sessions(&self, user_id: i32, now: DateTime<Utc>) -> RepoResult<u64>;

    // --- Dashboard ---
    /// Counters for the admin landing page; `author_id` scopes the article figures.
    async fn dashboard_stats(&self, author_id: Option<i32>) -> RepoResult<DashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Number of latest articles shown on the dashboard.
pub const DASHBOARD_LATEST: i64 = 5;

const ARTICLE_COLUMNS: &str =
    "id, title, body, summary, image_url, published_at, active, country_id, category_id, author_id";

const USER_COLUMNS: &str = "id, username, email, full_name, role, password_hash, active, created_at";

const SUMMARY_SELECT: &str = r#"
    SELECT
        a.id, a.title, a.body, a.summary, a.image_url, a.published_at, a.active,
        a.country_id, c.name AS country_name, c.code AS country_code,
        a.category_id, k.name AS category_name,
        a.author_id, u.full_name AS author_name
    FROM articles a
    JOIN countries c ON c.id = a.country_id
    JOIN categories k ON k.id = a.category_id
    JOIN users u ON u.id = a.author_id
"#;

const ARTICLE_ORDER: &str = " ORDER BY a.published_at DESC, a.id ASC";

/// Records that articles reference through a foreign key.
#[derive(Debug, Clone, Copy)]
enum Referenced {
    Category,
    Country,
    Author,
}

impl Referenced {
    /// (lock statement, referencing-article count, delete statement)
    fn statements(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Referenced::Category => (
                "SELECT id FROM categories WHERE id = $1 FOR UPDATE",
                "SELECT COUNT(*) FROM articles WHERE category_id = $1",
                "DELETE FROM categories WHERE id = $1",
            ),
            Referenced::Country => (
                "SELECT id FROM countries WHERE id = $1 FOR UPDATE",
                "SELECT COUNT(*) FROM articles WHERE country_id = $1",
                "DELETE FROM countries WHERE id = $1",
            ),
            Referenced::Author => (
                "SELECT id FROM users WHERE id = $1 FOR UPDATE",
                "SELECT COUNT(*) FROM articles WHERE author_id = $1",
                "DELETE FROM users WHERE id = $1",
            ),
        }
    }
}

/// Appends the `WHERE` clause for an [`ArticleQuery`]. Only `a.*` columns are used, so
/// it fits both the joined summary select and the bare count.
fn push_article_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ArticleQuery) {
    builder.push(" WHERE TRUE");
    if query.active_only {
        builder.push(" AND a.active = TRUE");
    }
    if let Some(country_id) = query.country_id {
        builder.push(" AND a.country_id = ");
        builder.push_bind(country_id);
    }
    if let Some(category_id) = query.category_id {
        builder.push(" AND a.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(author_id) = query.author_id {
        builder.push(" AND a.author_id = ");
        builder.push_bind(author_id);
    }
    if let Some(term) = query.search_term() {
        let pattern = format!("%{}%", escape_like(&term));
        builder.push(" AND (a.title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(r" ESCAPE '\' OR a.body ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(r" ESCAPE '\' OR a.summary ILIKE ");
        builder.push_bind(pattern);
        builder.push(r" ESCAPE '\')");
    }
}

/// Escapes `\`, `%` and `_` so a search term matches literally inside `ILIKE ... ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// PostgresRepository
///
/// The production implementation of [`Repository`], backed by a PostgreSQL pool. Each
/// call checks a connection out of the pool and returns it when the future completes.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the target row, count referencing articles, delete only when there are none.
    /// Runs in one transaction; an early return drops it, which rolls back.
    async fn guarded_delete(&self, target: Referenced, id: i32) -> RepoResult<DeleteOutcome> {
        let (lock_sql, count_sql, delete_sql) = target.statements();
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> = sqlx::query_scalar(lock_sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteOutcome::NotFound);
        }

        let linked: i64 = sqlx::query_scalar(count_sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if linked > 0 {
            return Ok(DeleteOutcome::Referenced(linked));
        }

        sqlx::query(delete_sql).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(DeleteOutcome::Deleted)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// find_articles
    ///
    /// Counts the filtered set, then fetches one `LIMIT/OFFSET` slice of it with the
    /// same filters, so the metadata and the slice describe the same query.
    async fn find_articles(
        &self,
        query: &ArticleQuery,
        page: PageRequest,
    ) -> RepoResult<Page<ArticleSummary>> {
        let total = self.count_articles(query).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        push_article_filters(&mut builder, query);
        builder.push(ARTICLE_ORDER);
        builder.push(" LIMIT ");
        builder.push_bind(page.limit());
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let items = builder
            .build_query_as::<ArticleSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, page, total))
    }

    async fn list_articles(
        &self,
        query: &ArticleQuery,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ArticleSummary>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        push_article_filters(&mut builder, query);
        builder.push(ARTICLE_ORDER);
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit.max(0));
        }

        Ok(builder
            .build_query_as::<ArticleSummary>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_article_summary(
        &self,
        id: i32,
        active_only: bool,
    ) -> RepoResult<Option<ArticleSummary>> {
        let query = ArticleQuery {
            active_only,
            ..ArticleQuery::default()
        };
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(SUMMARY_SELECT);
        push_article_filters(&mut builder, &query);
        builder.push(" AND a.id = ");
        builder.push_bind(id);

        Ok(builder
            .build_query_as::<ArticleSummary>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_article(&self, id: i32) -> RepoResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_articles(&self, query: &ArticleQuery) -> RepoResult<i64> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM articles a");
        push_article_filters(&mut builder, query);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<Article> {
        let sql = format!(
            "INSERT INTO articles (title, body, summary, image_url, published_at, active, country_id, category_id, author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(article.title)
            .bind(article.body)
            .bind(article.summary)
            .bind(article.image_url)
            .bind(article.published_at)
            .bind(article.active)
            .bind(article.country_id)
            .bind(article.category_id)
            .bind(article.author_id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// update_article
    ///
    /// `COALESCE` keeps every column whose field is `None`. Zero affected rows means the
    /// article was deleted concurrently, reported as `None`.
    async fn update_article(
        &self,
        id: i32,
        changes: UpdateArticleRequest,
    ) -> RepoResult<Option<Article>> {
        let sql = format!(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                body = COALESCE($3, body),
                summary = COALESCE($4, summary),
                image_url = COALESCE($5, image_url),
                active = COALESCE($6, active),
                country_id = COALESCE($7, country_id),
                category_id = COALESCE($8, category_id),
                author_id = COALESCE($9, author_id)
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.body)
            .bind(changes.summary)
            .bind(changes.image_url)
            .bind(changes.active)
            .bind(changes.country_id)
            .bind(changes.category_id)
            .bind(changes.author_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_article(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, description, active, created_at FROM categories \
             WHERE ($1 = FALSE OR active = TRUE) ORDER BY name ASC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_category(&self, id: i32, active_only: bool) -> RepoResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, description, active, created_at FROM categories \
             WHERE id = $1 AND ($2 = FALSE OR active = TRUE)",
        )
        .bind(id)
        .bind(active_only)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<Category> {
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, description, active, created_at) VALUES ($1, $2, $3, NOW()) \
             RETURNING id, name, description, active, created_at",
        )
        .bind(req.name)
        .bind(req.description)
        .bind(req.active)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_category(
        &self,
        id: i32,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING id, name, description, active, created_at
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.active)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.guarded_delete(Referenced::Category, id).await
    }

    // --- COUNTRIES ---

    async fn list_countries(&self, active_only: bool) -> RepoResult<Vec<Country>> {
        Ok(sqlx::query_as::<_, Country>(
            "SELECT id, name, code, active, created_at FROM countries \
             WHERE ($1 = FALSE OR active = TRUE) ORDER BY name ASC",
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_country(&self, id: i32, active_only: bool) -> RepoResult<Option<Country>> {
        Ok(sqlx::query_as::<_, Country>(
            "SELECT id, name, code, active, created_at FROM countries \
             WHERE id = $1 AND ($2 = FALSE OR active = TRUE)",
        )
        .bind(id)
        .bind(active_only)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_country(&self, req: CreateCountryRequest) -> RepoResult<Country> {
        Ok(sqlx::query_as::<_, Country>(
            "INSERT INTO countries (name, code, active, created_at) VALUES ($1, $2, $3, NOW()) \
             RETURNING id, name, code, active, created_at",
        )
        .bind(req.name)
        .bind(req.code)
        .bind(req.active)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_country(
        &self,
        id: i32,
        req: UpdateCountryRequest,
    ) -> RepoResult<Option<Country>> {
        Ok(sqlx::query_as::<_, Country>(
            r#"
            UPDATE countries
            SET name = COALESCE($2, name),
                code = COALESCE($3, code),
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING id, name, code, active, created_at
            "#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.code)
        .bind(req.active)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_country(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.guarded_delete(Referenced::Country, id).await
    }

    // --- USERS ---

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY full_name ASC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_active_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND active = TRUE");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        exclude: Option<i32>,
    ) -> RepoResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE (username = $1 OR email = $2) \
             AND ($3::INT IS NULL OR id <> $3))",
        )
        .bind(username)
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, email, full_name, role, password_hash, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(user.username)
            .bind(user.email)
            .bind(user.full_name)
            .bind(user.role.as_str())
            .bind(user.password_hash)
            .bind(user.active)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                full_name = COALESCE($4, full_name),
                role = COALESCE($5, role),
                active = COALESCE($6, active),
                password_hash = COALESCE($7, password_hash)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.full_name)
            .bind(changes.role.map(|role| role.as_str()))
            .bind(changes.active)
            .bind(changes.password_hash)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_user(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.guarded_delete(Referenced::Author, id).await
    }

    // --- SESSIONS ---

    async fn create_session(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, issued_at, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.issued_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_active(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sessions WHERE id = $1 AND expires_at > $2)",
        )
        .bind(id)
        .bind(now)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn revoke_session(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired_sessions(&self, user_id: i32, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at <= $2")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // --- DASHBOARD ---

    async fn dashboard_stats(&self, author_id: Option<i32>) -> RepoResult<DashboardStats> {
        let scope = ArticleQuery {
            author_id,
            ..ArticleQuery::default()
        };
        let total_articles = self.count_articles(&scope).await?;
        let active_categories: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM categories WHERE active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        let active_countries: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM countries WHERE active = TRUE")
                .fetch_one(&self.pool)
                .await?;
        let active_users: i64 = match author_id {
            Some(_) => 0,
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE active = TRUE")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        let latest_articles = self.list_articles(&scope, Some(DASHBOARD_LATEST)).await?;

        Ok(DashboardStats {
            total_articles,
            active_categories,
            active_countries,
            active_users,
            latest_articles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off"), r"50\%\_off");
        assert_eq!(escape_like(r"C:\temp"), r"C:\\temp");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn search_clause_uses_escape() {
        let query = ArticleQuery {
            search: Some(" 100% ".to_string()),
            ..ArticleQuery::public()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM articles a");
        push_article_filters(&mut builder, &query);
        let sql = builder.sql();
        assert_eq!(sql.matches(r"ESCAPE '\'").count(), 3);
        assert!(sql.contains("a.active = TRUE"));
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = ArticleQuery {
            search: Some("   ".to_string()),
            ..ArticleQuery::default()
        };
        assert_eq!(query.search_term(), None);
    }
}
