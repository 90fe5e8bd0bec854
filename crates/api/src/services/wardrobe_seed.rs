//! Default wardrobe seeding for a fresh install.
//!
//! Fills an empty closet with the built-in garments on startup. It is
//! idempotent: once the closet holds anything, it does nothing. Each garment
//! is fetched independently and a failed download only skips that item.

use domain::models::Garment;
use domain::services::DEFAULT_WARDROBE;
use persistence::repositories::ClosetRepository;
use persistence::CollectionStore;
use tracing::{error, info};

use super::image_fetch::ImageFetcher;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Seeds the default wardrobe if the closet is empty and returns what was added.
pub async fn seed_default_wardrobe(
    closet: &ClosetRepository,
    images: &ImageFetcher,
) -> Result<Vec<Garment>, SeedError> {
    if closet.count().await? > 0 {
        return Ok(Vec::new());
    }

    let mut seeded = Vec::new();
    for item in DEFAULT_WARDROBE {
        match images.fetch_data_url(item.url).await {
            Ok(image_data) => {
                let garment = item.into_garment(image_data);
                closet.save(&garment).await?;
                seeded.push(garment);
            }
            Err(e) => {
                error!(garment = %item.name, error = %e, "Failed to load default wardrobe item");
            }
        }
    }

    info!(count = seeded.len(), "Default wardrobe seeded");
    Ok(seeded)
}
