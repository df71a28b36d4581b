use crate::domain_model::UserId;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult, Script};
use std::future::Future;
use std::time::Duration;

const REPLACE_IF_MATCHES: &str = include_str!("replace_if_matches.lua");

pub struct RedisTokenStore {
    conn: ConnectionManager,
    prefix: String,
    op_timeout: Duration,
    replace_script: Script,
}

impl RedisTokenStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, op_timeout: Duration) -> Self {
        RedisTokenStore {
            conn,
            prefix: prefix.into(),
            op_timeout,
            replace_script: Script::new(REPLACE_IF_MATCHES),
        }
    }

    fn key(&self, user_id: &UserId) -> String {
        store_key(&self.prefix, user_id)
    }

    async fn bounded<T, F>(&self, op: &'static str, call: F) -> Result<T, TokenStoreError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        bounded(op, self.op_timeout, call).await
    }
}

/// Every round trip is bounded; a timeout is an outage, not a miss.
async fn bounded<T, F>(op: &'static str, limit: Duration, call: F) -> Result<T, TokenStoreError>
where
    F: Future<Output = RedisResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(TokenStoreError::Unavailable(format!("{}: {}", op, e))),
        Err(_) => Err(TokenStoreError::Unavailable(format!(
            "{}: timed out after {:?}",
            op, limit
        ))),
    }
}

fn missing_as_not_found(val: Option<String>) -> Result<String, TokenStoreError> {
    val.ok_or(TokenStoreError::NotFound)
}

fn store_key(prefix: &str, user_id: &UserId) -> String {
    if prefix.is_empty() {
        user_id.to_string()
    } else {
        format!("{}:{}", prefix, user_id)
    }
}

// SET EX rejects zero
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait::async_trait]
impl TokenStore for RedisTokenStore {
    async fn put(
        &self,
        user_id: &UserId,
        token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let _: () = self
            .bounded("put", conn.set_ex(&key, token, ttl_secs(ttl)))
            .await?;
        Ok(())
    }

    async fn get(&self, user_id: &UserId) -> Result<String, TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let val: Option<String> = self.bounded("get", conn.get(&key)).await?;
        missing_as_not_found(val)
    }

    async fn delete(&self, user_id: &UserId) -> Result<(), TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let _: () = self.bounded("delete", conn.del(&key)).await?;
        Ok(())
    }

    async fn replace_if_matches(
        &self,
        user_id: &UserId,
        expected: &str,
        new_token: &str,
        ttl: Duration,
    ) -> Result<(), TokenStoreError> {
        let key = self.key(user_id);
        let mut conn = self.conn.clone();
        let status: i64 = self
            .bounded(
                "replace_if_matches",
                self.replace_script
                    .key(&key)
                    .arg(expected)
                    .arg(new_token)
                    .arg(ttl_secs(ttl))
                    .invoke_async(&mut conn),
            )
            .await?;

        match status {
            1 => Ok(()),
            0 => Err(TokenStoreError::Mismatch),
            -1 => Err(TokenStoreError::NotFound),
            other => Err(TokenStoreError::Unavailable(format!(
                "unknown script status {}",
                other
            ))),
        }
    }

    async fn ping(&self) -> Result<(), TokenStoreError> {
        let mut conn = self.conn.clone();
        let _: String = self
            .bounded("ping", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_the_user_id_unless_prefixed() {
        let user = UserId::parse("42").unwrap();
        assert_eq!(store_key("", &user), "42");
        assert_eq!(store_key("refresh", &user), "refresh:42");
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_is_unavailable_not_missing() {
        let result = bounded(
            "get",
            Duration::from_secs(5),
            std::future::pending::<RedisResult<Option<String>>>(),
        )
        .await;
        assert!(matches!(result, Err(TokenStoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn transport_error_is_unavailable() {
        let failing = async {
            Err::<Option<String>, _>(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection reset",
            )))
        };
        let result = bounded("get", Duration::from_secs(5), failing).await;
        match result {
            Err(TokenStoreError::Unavailable(msg)) => assert!(msg.starts_with("get: ")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn absent_key_is_not_found() {
        let val = bounded("get", Duration::from_secs(5), async {
            Ok::<Option<String>, redis::RedisError>(None)
        })
        .await
        .unwrap();
        assert_eq!(missing_as_not_found(val), Err(TokenStoreError::NotFound));
        assert_eq!(
            missing_as_not_found(Some("t".into())),
            Ok("t".to_string())
        );
    }

    #[test]
    fn ttl_never_rounds_to_zero() {
        assert_eq!(ttl_secs(Duration::from_millis(300)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(604800)), 604800);
    }
}
