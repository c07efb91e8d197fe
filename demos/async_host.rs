use json_vault::AsyncJsonStore;

#[tokio::main]
async fn main() -> Result<(), json_vault::Error> {
    let path = std::env::temp_dir().join("json_vault_demo_async.json");
    let _ = std::fs::remove_file(&path);

    let db: AsyncJsonStore = AsyncJsonStore::open(&path).await?;

    // many tasks writing at once; each save completes before the next starts
    let tasks: Vec<_> = (0..8u64)
        .map(|guild| {
            let db = db.clone();
            tokio::spawn(async move { db.put(guild, serde_json::json!({"prefix": "!"})).await })
        })
        .collect();
    for t in tasks {
        t.await.map_err(|e| json_vault::Error::Task(e.to_string()))??;
    }

    println!("guilds configured: {}", db.len());
    println!("guild 3 = {:?}", db.get(3));

    let _ = std::fs::remove_file(&path);
    Ok(())
}
