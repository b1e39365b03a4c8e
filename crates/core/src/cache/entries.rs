//! Generation and entry operations on the content cache.
//!
//! Provides the request-keyed storage the strategies read from and write
//! to: open/list/delete generations, and put/match entries inside them.

use std::collections::BTreeMap;

use super::connection::ContentCache;
use crate::Error;
use crate::http::Response;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Summary of one generation, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInfo {
    pub name: String,
    pub entries: u64,
    pub created_at: String,
}

fn row_to_response(status: i64, headers_json: String, body: Vec<u8>) -> Result<Response, Error> {
    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status}")))?;
    Ok(Response { status, headers, body: body.into() })
}

impl ContentCache {
    /// Create the generation if it does not exist yet.
    pub async fn open_generation(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// All generation names in creation order.
    pub async fn generation_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM generations ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store `response` under `key` in `generation`, replacing any prior entry.
    ///
    /// Opens the generation if needed.
    pub async fn put(&self, generation: &str, key: &str, response: &Response) -> Result<(), Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        let status = i64::from(response.status);
        let headers_json = serde_json::to_string(&response.headers)?;
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, created_at) VALUES (?1, ?2)",
                    params![generation, now],
                )?;
                tx.execute(
                    "INSERT INTO entries (generation, key, status, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(generation, key) DO UPDATE SET
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![generation, key, status, headers_json, body, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` inside one generation.
    pub async fn match_in(&self, generation: &str, key: &str) -> Result<Option<Response>, Error> {
        let generation = generation.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body FROM entries WHERE generation = ?1 AND key = ?2",
                    params![generation, key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok((status, headers, body)) => row_to_response(status, headers, body).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` across every generation, oldest generation first.
    pub async fn match_any(&self, key: &str) -> Result<Option<Response>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT e.status, e.headers_json, e.body
                    FROM entries e JOIN generations g ON g.name = e.generation
                    WHERE e.key = ?1
                    ORDER BY g.id ASC
                    LIMIT 1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                );

                match result {
                    Ok((status, headers, body)) => row_to_response(status, headers, body).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Keys stored in a generation, sorted.
    pub async fn keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM entries WHERE generation = ?1 ORDER BY key ASC")?;
                let keys = stmt
                    .query_map(params![generation], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Every generation with its entry count, in creation order.
    pub async fn generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.name, g.created_at, COUNT(e.key)
                    FROM generations g LEFT JOIN entries e ON e.generation = g.name
                    GROUP BY g.id
                    ORDER BY g.id ASC",
                )?;
                let infos = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            name: row.get(0)?,
                            created_at: row.get(1)?,
                            entries: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(infos)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> Response {
        Response::ok("text/html", body.to_string())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.put("app-shell-v1", "https://app.test/", &page("home")).await.unwrap();

        let hit = cache.match_in("app-shell-v1", "https://app.test/").await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.text(), "home");
        assert_eq!(hit.content_type(), Some("text/html"));
        assert_eq!(cache.generation_names().await.unwrap(), vec!["app-shell-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_match_missing() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.open_generation("app-shell-v1").await.unwrap();
        assert!(cache.match_in("app-shell-v1", "https://app.test/").await.unwrap().is_none());
        assert!(cache.match_any("https://app.test/").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_headers_surface_as_error() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.put("app-data-v1", "https://app.test/api/me", &page("{}")).await.unwrap();
        cache
            .conn
            .call(|conn| conn.execute("UPDATE entries SET headers_json = 'not json'", []))
            .await
            .unwrap();

        let result = cache.match_in("app-data-v1", "https://app.test/api/me").await;
        assert!(matches!(result, Err(Error::CorruptEntry(_))), "{result:?}");
        assert!(cache.match_any("https://app.test/api/me").await.is_err());
    }

    #[tokio::test]
    async fn test_put_replaces_prior_entry() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.put("app-data-v1", "k", &page("old")).await.unwrap();
        cache.put("app-data-v1", "k", &page("new")).await.unwrap();

        assert_eq!(cache.match_in("app-data-v1", "k").await.unwrap().unwrap().text(), "new");
        assert_eq!(cache.keys("app-data-v1").await.unwrap(), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn test_match_any_prefers_oldest_generation() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.open_generation("first").await.unwrap();
        cache.open_generation("second").await.unwrap();
        cache.put("second", "k", &page("second")).await.unwrap();
        cache.put("first", "k", &page("first")).await.unwrap();

        assert_eq!(cache.match_any("k").await.unwrap().unwrap().text(), "first");
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.put("app-static-v1", "a", &page("a")).await.unwrap();
        cache.put("app-static-v1", "b", &page("b")).await.unwrap();

        assert!(cache.delete_generation("app-static-v1").await.unwrap());
        assert!(!cache.delete_generation("app-static-v1").await.unwrap());
        assert!(cache.generation_names().await.unwrap().is_empty());
        assert!(cache.match_any("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_generation_is_idempotent() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.open_generation("g").await.unwrap();
        cache.open_generation("g").await.unwrap();
        assert_eq!(cache.generation_names().await.unwrap(), vec!["g".to_string()]);
    }

    #[tokio::test]
    async fn test_generations_report_counts() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        cache.open_generation("empty").await.unwrap();
        cache.put("full", "a", &page("a")).await.unwrap();
        cache.put("full", "b", &page("b")).await.unwrap();

        let infos = cache.generations().await.unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!((infos[0].name.as_str(), infos[0].entries), ("empty", 0));
        assert_eq!((infos[1].name.as_str(), infos[1].entries), ("full", 2));
    }

    #[tokio::test]
    async fn test_binary_body_round_trips() {
        let cache = ContentCache::open_in_memory().await.unwrap();
        let png = Response::ok("image/png", vec![0x89u8, b'P', b'N', b'G', 0, 255]);
        cache.put("s", "logo", &png).await.unwrap();
        assert_eq!(cache.match_in("s", "logo").await.unwrap().unwrap(), png);
    }
}
