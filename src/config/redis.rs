use redis::aio::ConnectionManager;

pub async fn connect(uri: &str) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(uri)?;

    ConnectionManager::new(client).await
}
