use base34::{app::B34App, error::Result};

#[tokio::main]
async fn main() -> Result<()> {
    if let Some(app) = B34App::init().await? {
        app.run().await?;
    }

    Ok(())
}
