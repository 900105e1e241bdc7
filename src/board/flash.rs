//! Settings image in flash.
//!
//! The three persisted bytes are stored as one `sequential-storage` map item
//! inside the `nvs` partition. The library works on a RAM [`ByteImage`];
//! the main loop calls [`flush`] once it reports a pending commit.

use core::ops::Range;

use defmt::{debug, error, info};
use embedded_storage_async::nor_flash::NorFlash;
use mk5017::config::{STORAGE_BYTES, STORAGE_FLASH_SIZE, STORAGE_FLASH_START};
use mk5017::ByteImage;
use sequential_storage::cache::NoCache;

/// Map key of the settings item.
const KEY_SETTINGS: u8 = 0x01;

/// Scratch space for item headers + payload.
const ITEM_BUF: usize = 64;

const RANGE: Range<u32> = STORAGE_FLASH_START..STORAGE_FLASH_START + STORAGE_FLASH_SIZE;

/// Read the image. Missing or unreadable data yields zeroed bytes, which
/// decode to defaults.
pub async fn load(flash: &mut impl NorFlash) -> ByteImage {
    let mut buf = [0u8; ITEM_BUF];
    match sequential_storage::map::fetch_item::<u8, &[u8], _>(
        flash,
        RANGE,
        &mut NoCache::new(),
        &mut buf,
        &KEY_SETTINGS,
    )
    .await
    {
        Ok(Some(data)) => {
            info!("Flash: loaded {} settings bytes", data.len());
            ByteImage::from_bytes(data)
        }
        Ok(None) => {
            info!("Flash: no settings stored");
            ByteImage::new()
        }
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            ByteImage::new()
        }
    }
}

/// Write the image if it has committed changes.
pub async fn flush(flash: &mut impl NorFlash, image: &mut ByteImage) {
    if !image.needs_flush() {
        return;
    }
    let mut buf = [0u8; ITEM_BUF];
    let bytes: [u8; STORAGE_BYTES] = *image.bytes();
    let item: &[u8] = &bytes;

    match sequential_storage::map::store_item::<u8, &[u8], _>(
        flash,
        RANGE,
        &mut NoCache::new(),
        &mut buf,
        &KEY_SETTINGS,
        &item,
    )
    .await
    {
        Ok(()) => {
            debug!("Flash: settings written");
            image.mark_flushed();
        }
        Err(e) => {
            error!("Flash write error: {:?}", defmt::Debug2Format(&e));
        }
    }
}
