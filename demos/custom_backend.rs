use json_vault::{JsonStore, Value};
use parking_lot::RwLock;
use std::collections::HashMap;

fn main() -> Result<(), json_vault::Error> {
    let path = std::env::temp_dir().join("json_vault_demo_rwlock.json");
    let _ = std::fs::remove_file(&path);

    // one lock around a plain HashMap instead of the sharded default
    let db = JsonStore::<RwLock<HashMap<String, Value>>>::open(&path)?;

    db.put("counter", 0)?;
    for _ in 0..10 {
        db.update("counter", |v| *v = (v.as_u64().unwrap_or(0) + 1).into())?;
    }
    println!("counter = {:?}", db.get("counter"));

    db.extend([("x", 100), ("y", 200)])?;
    println!("keys = {:?}", db.keys());

    let _ = std::fs::remove_file(&path);
    Ok(())
}
