//! Run with: cargo run --bin cleanup

use gemchat::config::{self, Settings, StoreBackend};
use gemchat::modules::chat::crud::COLLECTION_NAME;
use std::io::ErrorKind;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;

    match &settings.store {
        StoreBackend::File { path } => {
            println!("Removing {}...", path.display());
            match std::fs::remove_file(path) {
                Ok(()) => println!("✓ Chat file removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => println!("✓ No chat file present"),
                Err(e) => return Err(e.into()),
            }
        }
        StoreBackend::Mongo { uri, database } => {
            println!("Connecting to MongoDB...");
            let db = config::database::connect(uri, database).await?;

            println!("Dropping {} collection...", COLLECTION_NAME);
            db.collection::<mongodb::bson::Document>(COLLECTION_NAME)
                .drop()
                .await?;
            println!("✓ Chats collection dropped");

            println!("\nCollections remaining:");
            for name in db.list_collection_names().await? {
                println!("  - {}", name);
            }
        }
    }

    println!("\n✓ Cleanup complete!");
    Ok(())
}
