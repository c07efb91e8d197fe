use json_vault::{CommitPolicy, JsonCodec, JsonStore, Value};

fn main() -> Result<(), json_vault::Error> {
    let path = std::env::temp_dir().join("json_vault_demo_builder.json");
    let _ = std::fs::remove_file(&path);

    // four-space indent, raw UTF-8, and tagged objects decoded into strings
    // and written back out as tagged objects
    let codec = JsonCodec::new()
        .indent(4)
        .ascii(false)
        .object_hook(|obj| {
            if obj.len() == 1 {
                if let Some(Value::String(d)) = obj.get("$date") {
                    return Value::String(format!("date:{d}"));
                }
            }
            Value::Object(obj)
        })
        .encode_hook(|value| {
            let day = value.as_str()?.strip_prefix("date:")?;
            Some(serde_json::json!({ "$date": day }))
        });

    let db: JsonStore = JsonStore::builder(&path)
        .codec(codec)
        .policy(CommitPolicy::AfterSave)
        .build()?;

    db.put("name", "json-vault")?;
    db.put("greeting", "grüß dich")?;
    db.put("released", serde_json::json!({"$date": "2024-05-01"}))?;

    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON:\n{contents}");

    // the object hook only runs when reading the file back
    db.load()?;
    println!("released after load = {:?}", db.get("released"));

    // the encode hook keeps the tagged form on disk
    db.put("patch", 1)?;
    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON after another put:\n{contents}");
    println!("\nDebug output: {db:?}");

    let _ = std::fs::remove_file(&path);
    Ok(())
}
