use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Article, ArticleSummary, Category, Country, CreateCategoryRequest, CreateCountryRequest,
    DashboardStats, Session, UpdateArticleRequest, UpdateCategoryRequest, UpdateCountryRequest,
    User,
};
use crate::pagination::{Page, PageRequest};
use crate::repository::{
    ArticleQuery, DASHBOARD_LATEST, DeleteOutcome, NewArticle, NewUser, RepoResult, Repository,
    RepositoryError, UserChanges,
};

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    countries: Vec<Country>,
    users: Vec<User>,
    articles: Vec<Article>,
    sessions: HashMap<Uuid, Session>,
    next_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_article_links(
        &self,
        country_id: i32,
        category_id: i32,
        author_id: i32,
    ) -> RepoResult<()> {
        if !self.countries.iter().any(|c| c.id == country_id) {
            return Err(RepositoryError::ForeignKeyViolation("articles_country_id_fkey".into()));
        }
        if !self.categories.iter().any(|c| c.id == category_id) {
            return Err(RepositoryError::ForeignKeyViolation("articles_category_id_fkey".into()));
        }
        if !self.users.iter().any(|u| u.id == author_id) {
            return Err(RepositoryError::ForeignKeyViolation("articles_author_id_fkey".into()));
        }
        Ok(())
    }

    fn check_user_unique(
        &self,
        username: &str,
        email: &str,
        exclude: Option<i32>,
    ) -> RepoResult<()> {
        let clash = self
            .users
            .iter()
            .find(|u| Some(u.id) != exclude && (u.username == username || u.email == email));
        match clash {
            Some(u) if u.username == username => {
                Err(RepositoryError::UniqueViolation("users_username_key".into()))
            }
            Some(_) => Err(RepositoryError::UniqueViolation("users_email_key".into())),
            None => Ok(()),
        }
    }

    /// Inner join of an article with its country, category and author.
    fn summarize(&self, article: &Article) -> Option<ArticleSummary> {
        let country = self.countries.iter().find(|c| c.id == article.country_id)?;
        let category = self.categories.iter().find(|c| c.id == article.category_id)?;
        let author = self.users.iter().find(|u| u.id == article.author_id)?;
        Some(ArticleSummary {
            id: article.id,
            title: article.title.clone(),
            body: article.body.clone(),
            summary: article.summary.clone(),
            image_url: article.image_url.clone(),
            published_at: article.published_at,
            active: article.active,
            country_id: country.id,
            country_name: country.name.clone(),
            country_code: country.code.clone(),
            category_id: category.id,
            category_name: category.name.clone(),
            author_id: author.id,
            author_name: author.full_name.clone(),
        })
    }

    /// Filtered summaries in `published_at DESC, id ASC` order.
    fn select(&self, query: &ArticleQuery) -> Vec<ArticleSummary> {
        let term = query.search_term();
        let mut rows: Vec<ArticleSummary> = self
            .articles
            .iter()
            .filter(|a| matches(a, query, term.as_deref()))
            .filter_map(|a| self.summarize(a))
            .collect();
        rows.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rows
    }

    fn references(&self, link: impl Fn(&Article) -> bool) -> i64 {
        self.articles.iter().filter(|a| link(a)).count() as i64
    }
}

fn matches(article: &Article, query: &ArticleQuery, term: Option<&str>) -> bool {
    if query.active_only && !article.active {
        return false;
    }
    if query.country_id.is_some_and(|id| article.country_id != id) {
        return false;
    }
    if query.category_id.is_some_and(|id| article.category_id != id) {
        return false;
    }
    if query.author_id.is_some_and(|id| article.author_id != id) {
        return false;
    }
    match term {
        Some(term) => [&article.title, &article.body, &article.summary]
            .iter()
            .any(|field| field.to_lowercase().contains(term)),
        None => true,
    }
}

/// InMemoryRepository
///
/// A [`Repository`] kept entirely in process memory. It enforces the same uniqueness,
/// foreign key and ordering rules as the Postgres schema, which makes it the store of
/// choice for router-level tests and for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
    /// When true, every operation returns a simulated database failure.
    should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> RepoResult<()> {
        if self.should_fail {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_articles(
        &self,
        query: &ArticleQuery,
        page: PageRequest,
    ) -> RepoResult<Page<ArticleSummary>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(Page::from_ordered(tables.select(query), page))
    }

    async fn list_articles(
        &self,
        query: &ArticleQuery,
        limit: Option<i64>,
    ) -> RepoResult<Vec<ArticleSummary>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows = tables.select(query);
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn get_article_summary(
        &self,
        id: i32,
        active_only: bool,
    ) -> RepoResult<Option<ArticleSummary>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .iter()
            .find(|a| a.id == id && (!active_only || a.active))
            .and_then(|a| tables.summarize(a)))
    }

    async fn get_article(&self, id: i32) -> RepoResult<Option<Article>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn count_articles(&self, query: &ArticleQuery) -> RepoResult<i64> {
        self.check()?;
        let tables = self.tables.read().await;
        let term = query.search_term();
        Ok(tables
            .articles
            .iter()
            .filter(|a| matches(a, query, term.as_deref()))
            .count() as i64)
    }

    async fn create_article(&self, article: NewArticle) -> RepoResult<Article> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables.check_article_links(article.country_id, article.category_id, article.author_id)?;
        let created = Article {
            id: tables.next_id(),
            title: article.title,
            body: article.body,
            summary: article.summary,
            image_url: article.image_url,
            published_at: article.published_at,
            active: article.active,
            country_id: article.country_id,
            category_id: article.category_id,
            author_id: article.author_id,
        };
        tables.articles.push(created.clone());
        Ok(created)
    }

    async fn update_article(
        &self,
        id: i32,
        changes: UpdateArticleRequest,
    ) -> RepoResult<Option<Article>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(current) = tables.articles.iter().find(|a| a.id == id).cloned() else {
            return Ok(None);
        };
        let updated = Article {
            title: changes.title.unwrap_or(current.title),
            body: changes.body.unwrap_or(current.body),
            summary: changes.summary.unwrap_or(current.summary),
            image_url: changes.image_url.or(current.image_url),
            active: changes.active.unwrap_or(current.active),
            country_id: changes.country_id.unwrap_or(current.country_id),
            category_id: changes.category_id.unwrap_or(current.category_id),
            author_id: changes.author_id.unwrap_or(current.author_id),
            ..current
        };
        tables.check_article_links(updated.country_id, updated.category_id, updated.author_id)?;
        if let Some(slot) = tables.articles.iter_mut().find(|a| a.id == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_article(&self, id: i32) -> RepoResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.articles.len();
        tables.articles.retain(|a| a.id != id);
        Ok(tables.articles.len() < before)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self, active_only: bool) -> RepoResult<Vec<Category>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Category> = tables
            .categories
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_category(&self, id: i32, active_only: bool) -> RepoResult<Option<Category>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .categories
            .iter()
            .find(|c| c.id == id && (!active_only || c.active))
            .cloned())
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> RepoResult<Category> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let created = Category {
            id: tables.next_id(),
            name: req.name,
            description: req.description,
            active: req.active,
            created_at: Utc::now(),
        };
        tables.categories.push(created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i32,
        req: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            slot.name = name;
        }
        if let Some(description) = req.description {
            slot.description = Some(description);
        }
        if let Some(active) = req.active {
            slot.active = active;
        }
        Ok(Some(slot.clone()))
    }

    async fn delete_category(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.categories.iter().any(|c| c.id == id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let linked = tables.references(|a| a.category_id == id);
        if linked > 0 {
            return Ok(DeleteOutcome::Referenced(linked));
        }
        tables.categories.retain(|c| c.id != id);
        Ok(DeleteOutcome::Deleted)
    }

    // --- COUNTRIES ---

    async fn list_countries(&self, active_only: bool) -> RepoResult<Vec<Country>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Country> = tables
            .countries
            .iter()
            .filter(|c| !active_only || c.active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_country(&self, id: i32, active_only: bool) -> RepoResult<Option<Country>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .countries
            .iter()
            .find(|c| c.id == id && (!active_only || c.active))
            .cloned())
    }

    async fn create_country(&self, req: CreateCountryRequest) -> RepoResult<Country> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let created = Country {
            id: tables.next_id(),
            name: req.name,
            code: req.code,
            active: req.active,
            created_at: Utc::now(),
        };
        tables.countries.push(created.clone());
        Ok(created)
    }

    async fn update_country(
        &self,
        id: i32,
        req: UpdateCountryRequest,
    ) -> RepoResult<Option<Country>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(slot) = tables.countries.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            slot.name = name;
        }
        if let Some(code) = req.code {
            slot.code = code;
        }
        if let Some(active) = req.active {
            slot.active = active;
        }
        Ok(Some(slot.clone()))
    }

    async fn delete_country(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.countries.iter().any(|c| c.id == id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let linked = tables.references(|a| a.country_id == id);
        if linked > 0 {
            return Ok(DeleteOutcome::Referenced(linked));
        }
        tables.countries.retain(|c| c.id != id);
        Ok(DeleteOutcome::Deleted)
    }

    // --- USERS ---

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut rows = tables.users.clone();
        rows.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(rows)
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_active_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.active && u.username == username)
            .cloned())
    }

    async fn identity_taken(
        &self,
        username: &str,
        email: &str,
        exclude: Option<i32>,
    ) -> RepoResult<bool> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.check_user_unique(username, email, exclude).is_err())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables.check_user_unique(&user.username, &user.email, None)?;
        let created = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            password_hash: user.password_hash,
            active: user.active,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: i32, changes: UserChanges) -> RepoResult<Option<User>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let Some(current) = tables.users.iter().find(|u| u.id == id).cloned() else {
            return Ok(None);
        };
        let updated = User {
            username: changes.username.unwrap_or(current.username),
            email: changes.email.unwrap_or(current.email),
            full_name: changes.full_name.unwrap_or(current.full_name),
            role: changes.role.unwrap_or(current.role),
            active: changes.active.unwrap_or(current.active),
            password_hash: changes.password_hash.unwrap_or(current.password_hash),
            ..current
        };
        tables.check_user_unique(&updated.username, &updated.email, Some(id))?;
        if let Some(slot) = tables.users.iter_mut().find(|u| u.id == id) {
            *slot = updated.clone();
        }
        Ok(Some(updated))
    }

    async fn delete_user(&self, id: i32) -> RepoResult<DeleteOutcome> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(DeleteOutcome::NotFound);
        }
        let linked = tables.references(|a| a.author_id == id);
        if linked > 0 {
            return Ok(DeleteOutcome::Referenced(linked));
        }
        tables.users.retain(|u| u.id != id);
        tables.sessions.retain(|_, s| s.user_id != id);
        Ok(DeleteOutcome::Deleted)
    }

    // --- SESSIONS ---

    async fn create_session(&self, session: &Session) -> RepoResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn session_active(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .get(&id)
            .is_some_and(|session| session.expires_at > now))
    }

    async fn revoke_session(&self, id: Uuid) -> RepoResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.remove(&id).is_some())
    }

    async fn purge_expired_sessions(&self, user_id: i32, now: DateTime<Utc>) -> RepoResult<u64> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| s.user_id != user_id || s.expires_at > now);
        Ok((before - tables.sessions.len()) as u64)
    }

    // --- DASHBOARD ---

    async fn dashboard_stats(&self, author_id: Option<i32>) -> RepoResult<DashboardStats> {
        self.check()?;
        let tables = self.tables.read().await;
        let scope = ArticleQuery {
            author_id,
            ..ArticleQuery::default()
        };
        let mut latest_articles = tables.select(&scope);
        latest_articles.truncate(DASHBOARD_LATEST as usize);

        Ok(DashboardStats {
            total_articles: tables
                .articles
                .iter()
                .filter(|a| matches(a, &scope, None))
                .count() as i64,
            active_categories: tables.categories.iter().filter(|c| c.active).count() as i64,
            active_countries: tables.countries.iter().filter(|c| c.active).count() as i64,
            active_users: match author_id {
                Some(_) => 0,
                None => tables.users.iter().filter(|u| u.active).count() as i64,
            },
            latest_articles,
        })
    }
}
