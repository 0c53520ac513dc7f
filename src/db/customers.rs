use sqlx::{Executor, Sqlite};

use crate::billing::models::Customer;

pub async fn insert_customer<'c, E>(
    executor: E,
    name: &str,
    email: &str,
    timezone: &str,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO customers (name, email, timezone) VALUES (?, ?, ?)")
        .bind(name)
        .bind(email)
        .bind(timezone)
        .execute(executor)
        .await?;
    Ok(result.last_insert_rowid())
}

pub async fn get_customer<'c, E>(executor: E, id: i64) -> Result<Option<Customer>, sqlx::Error>
where
    E: Executor<'c, Database = Sqlite>,
{
    sqlx::query_as::<_, Customer>("SELECT id, name, email, timezone FROM customers WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}
