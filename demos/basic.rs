use json_vault::JsonStore;

fn main() -> Result<(), json_vault::Error> {
    let path = std::env::temp_dir().join("json_vault_demo_basic.json");
    let _ = std::fs::remove_file(&path);
    let db: JsonStore = JsonStore::open(&path)?;

    // put / get / delete; every put is on disk when it returns
    db.put("apples", 3)?;
    db.put("bananas", 5)?;
    println!("apples  = {:?}", db.get("apples"));
    println!("bananas = {:?}", db.get("bananas"));

    // integer keys are stored under their string form
    db.put(42, "answer")?;
    println!("\"42\"    = {:?}", db.get("42"));

    // update in place
    db.update("apples", |n| *n = (n.as_i64().unwrap_or(0) + 1).into())?;
    println!("apples after update = {:?}", db.get("apples"));

    let oranges = db.get_or_insert("oranges", 0)?;
    println!("oranges (default 0) = {oranges}");

    // bulk insert, one save
    db.extend([("grapes", 12), ("lemons", 7)])?;

    println!("keys   = {:?}", db.keys());
    println!("len    = {}", db.len());

    if let Err(e) = db.delete("durian") {
        println!("delete durian: {e}");
    }

    println!("on disk:\n{}", std::fs::read_to_string(db.path())?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
