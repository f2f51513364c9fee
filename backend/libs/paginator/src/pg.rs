//! PostgreSQL page source built on `sqlx::QueryBuilder`

use crate::{PageSource, PageWindow};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::marker::PhantomData;

type Filter<'a> = Box<dyn for<'q> Fn(&mut QueryBuilder<'q, Postgres>) + Send + Sync + 'a>;

/// `SELECT` statement shape shared by the count and fetch queries.
///
/// `table` and `columns` are trusted, code-defined SQL. Filters push their
/// own SQL (starting with ` WHERE ...`) and bind their values.
pub struct PgPageQuery<'a> {
    table: String,
    columns: String,
    filter: Option<Filter<'a>>,
}

impl<'a> PgPageQuery<'a> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filter: None,
        }
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// # Example
    /// ```ignore
    /// PgPageQuery::new("topics").filter(move |qb| {
    ///     qb.push(" WHERE category_id = ").push_bind(category_id);
    /// });
    /// ```
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: for<'q> Fn(&mut QueryBuilder<'q, Postgres>) + Send + Sync + 'a,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    fn apply_filter(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        if let Some(filter) = &self.filter {
            filter(qb);
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", self.table));
        self.apply_filter(&mut qb);
        qb
    }

    pub fn fetch_query(&self, window: &PageWindow) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", self.columns, self.table));
        self.apply_filter(&mut qb);
        qb.push(" ORDER BY ")
            .push(quote_ident(&window.sort))
            .push(" ")
            .push(window.order.as_sql())
            .push(" LIMIT ")
            .push_bind(i64::try_from(window.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
        qb
    }
}

/// Double-quote a possibly qualified identifier (`topics.id` -> `"topics"."id"`).
pub fn quote_ident(ident: &str) -> String {
    ident
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// [`PageSource`] reading rows of type `T` from PostgreSQL.
pub struct PgPageSource<'a, T> {
    pool: &'a PgPool,
    query: PgPageQuery<'a>,
    _row: PhantomData<fn() -> T>,
}

impl<'a, T> PgPageSource<'a, T> {
    pub fn new(pool: &'a PgPool, query: PgPageQuery<'a>) -> Self {
        Self {
            pool,
            query,
            _row: PhantomData,
        }
    }
}

#[async_trait]
impl<'a, T> PageSource for PgPageSource<'a, T>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    type Item = T;
    type Error = sqlx::Error;

    async fn count(&self) -> Result<u64, sqlx::Error> {
        let mut qb = self.query.count_query();
        let (count,): (i64,) = qb.build_query_as().fetch_one(self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch(&self, window: &PageWindow) -> Result<Vec<T>, sqlx::Error> {
        let mut qb = self.query.fetch_query(window);
        let rows = qb.build_query_as::<T>().fetch_all(self.pool).await?;
        Ok(rows)
    }
}
