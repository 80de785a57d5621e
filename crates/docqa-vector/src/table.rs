//! LanceDB connection helpers.
use anyhow::Result;
use lancedb::{connect, Connection};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|n| n == name))
}

pub async fn drop_if_exists(conn: &Connection, name: &str) -> Result<()> {
    if table_exists(conn, name).await? {
        conn.drop_table(name, &[]).await?;
    }
    Ok(())
}
